use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Prometheus exporter for HPE iLO management controllers.
#[derive(Parser, Debug)]
#[command(name = "ilo_exporter", version, about)]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(long = "config.file")]
    pub config_file: Option<PathBuf>,

    /// Address to listen on for HTTP requests
    #[arg(long = "web.listen-address")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path")]
    pub telemetry_path: Option<String>,

    /// Default username for controller access
    #[arg(long = "api.username")]
    pub username: Option<String>,

    /// Default password for controller access
    #[arg(long = "api.password")]
    pub password: Option<String>,

    /// Maximum number of concurrent requests to one controller
    #[arg(long = "api.max-concurrent-requests")]
    pub max_concurrent_requests: Option<usize>,

    /// Log every Redfish request and response body
    #[arg(long = "api.debug")]
    pub api_debug: bool,

    /// Serve metrics over TLS
    #[arg(long = "tls.enabled")]
    pub tls_enabled: bool,

    /// PEM certificate chain for TLS
    #[arg(long = "tls.cert-file")]
    pub tls_cert_file: Option<String>,

    /// PEM private key for TLS
    #[arg(long = "tls.key-file")]
    pub tls_key_file: Option<String>,

    /// Default log directive, overridden by RUST_LOG
    #[arg(long = "log.level", default_value = "ilo=info")]
    pub log_level: String,
}

impl Args {
    /// Loads the configuration file, if any, and layers the flags on top.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config_file {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Overrides `config` with every flag that was given.
    pub fn apply(&self, config: &mut Config) {
        if let Some(addr) = &self.listen_address {
            config.web.listen_address = addr.clone();
        }
        if let Some(path) = &self.telemetry_path {
            config.web.metrics_path = path.clone();
        }
        if let Some(username) = &self.username {
            config.api.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.api.password = password.clone();
        }
        if let Some(max) = self.max_concurrent_requests {
            config.api.max_concurrent_requests = max;
        }
        if self.api_debug {
            config.api.debug = true;
        }
        if self.tls_enabled {
            config.tls.enabled = true;
        }
        if let Some(cert) = &self.tls_cert_file {
            config.tls.cert_chain_path = cert.clone();
        }
        if let Some(key) = &self.tls_key_file {
            config.tls.key_path = key.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[web]\nlisten_address = \"127.0.0.1:1\"\n[api]\nusername = \"file-user\"\nmax_concurrent_requests = 8\n"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let args = Args::try_parse_from([
            "ilo_exporter",
            "--config.file",
            path.as_str(),
            "--api.username",
            "flag-user",
            "--web.telemetry-path",
            "/ilo",
        ])
        .unwrap();
        let config = args.load_config().unwrap();

        assert_eq!(config.web.listen_address, "127.0.0.1:1");
        assert_eq!(config.web.metrics_path, "/ilo");
        assert_eq!(config.api.username, "flag-user");
        assert_eq!(config.api.max_concurrent_requests, 8);
    }

    #[test]
    fn no_file_means_defaults() {
        let args = Args::try_parse_from(["ilo_exporter", "--api.max-concurrent-requests", "2", "--api.debug"])
            .unwrap();
        let config = args.load_config().unwrap();

        assert_eq!(config.web.listen_address, "0.0.0.0:9545");
        assert_eq!(config.api.max_concurrent_requests, 2);
        assert!(config.api.debug);
        assert_eq!(args.log_level, "ilo=info");
    }

    #[test]
    fn tls_flags() {
        let args = Args::try_parse_from([
            "ilo_exporter",
            "--tls.enabled",
            "--tls.cert-file",
            "cert.pem",
            "--tls.key-file",
            "key.pem",
        ])
        .unwrap();
        let config = args.load_config().unwrap();

        assert!(config.tls.enabled);
        assert_eq!(config.tls.cert_chain_path, "cert.pem");
        assert_eq!(config.validate(), Ok(()));
    }
}
