use ilo_client::{ClientOptions, Credentials, DEFAULT_MAX_CONCURRENT_REQUESTS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Exporter configuration, loaded once at startup and shared read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:9545".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Access to the management controllers.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Default credentials, overridable per scrape with `user`/`pass`.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Upper bound on requests in flight against one controller during one scrape.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Logs every Redfish request and its response body.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Accept self-signed controller certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            max_concurrent_requests: default_max_concurrent_requests(),
            debug: false,
            timeout_secs: default_timeout_secs(),
            insecure: default_insecure(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("debug", &self.debug)
            .field("timeout_secs", &self.timeout_secs)
            .field("insecure", &self.insecure)
            .finish()
    }
}

impl ApiConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::default()
            .with_max_concurrent_requests(self.max_concurrent_requests)
            .with_insecure(self.insecure)
            .with_debug(self.debug)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_insecure() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// PEM file holding the server certificate followed by its chain.
    #[serde(default)]
    pub cert_chain_path: String,
    /// PEM file holding the private key.
    #[serde(default)]
    pub key_path: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api.max_concurrent_requests must be at least 1")]
    ZeroConcurrency,

    #[error("web.metrics_path must start with '/', got {0:?}")]
    InvalidMetricsPath(String),

    #[error("web.metrics_path must not be '/', it is taken by the landing page")]
    MetricsPathIsRoot,

    #[error("tls.enabled requires both tls.cert_chain_path and tls.key_path")]
    MissingTlsMaterial,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.max_concurrent_requests == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if !self.web.metrics_path.starts_with('/') {
            return Err(ConfigError::InvalidMetricsPath(self.web.metrics_path.clone()));
        }
        if self.web.metrics_path == "/" {
            return Err(ConfigError::MetricsPathIsRoot);
        }
        if self.tls.enabled
            && (self.tls.cert_chain_path.is_empty() || self.tls.key_path.is_empty())
        {
            return Err(ConfigError::MissingTlsMaterial);
        }
        Ok(())
    }
}
