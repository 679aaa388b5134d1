use crate::error::{ClientError, Result};
use crate::limiter::{ConcurrencyLimiter, DEFAULT_MAX_CONCURRENT_REQUESTS};
use crate::{Client, Credentials, REDFISH_ROOT};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Maximum number of characters of a response body written to the debug log.
const MAX_DEBUG_BODY_CHARS: usize = 512;

/// Construction options for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub max_concurrent_requests: usize,
    /// Accept self-signed controller certificates.
    pub insecure: bool,
    /// Log every request URL and response body.
    pub debug: bool,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            insecure: false,
            debug: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientOptions {
    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        if max > 0 {
            self.max_concurrent_requests = max;
        }
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Redfish client for one controller host, bounded by a [`ConcurrencyLimiter`].
pub struct HttpClient {
    host: String,
    base_url: String,
    credentials: Credentials,
    client: reqwest::Client,
    limiter: ConcurrencyLimiter,
    debug: bool,
}

impl HttpClient {
    pub fn new(host: &str, credentials: Credentials, options: &ClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(options.insecure)
            .timeout(options.timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            host: host.to_string(),
            base_url: base_url(host),
            credentials,
            client,
            limiter: ConcurrencyLimiter::new(options.max_concurrent_requests),
            debug: options.debug,
        })
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, path: &str) -> Result<Bytes> {
        let url = self.url(path);
        if self.debug {
            tracing::info!(host = %self.host, url = %url, "--> redfish request");
        }

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ClientError::unavailable(path, &e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::unavailable(path, &e))?;

        if self.debug {
            tracing::info!(
                host = %self.host,
                url = %url,
                status = status.as_u16(),
                body = %truncate_body(&body, MAX_DEBUG_BODY_CHARS),
                "<-- redfish response"
            );
        }

        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl Client for HttpClient {
    fn host_name(&self) -> &str {
        &self.host
    }

    async fn request(&self, cancel: &CancellationToken, path: &str) -> Result<Bytes> {
        let _token = self.limiter.acquire(cancel, path).await?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled { path: path.to_string() }),
            result = self.send(path) => result,
        }
    }
}

/// Builds the Redfish service root for `host`. A host that already carries a
/// scheme is used verbatim.
pub fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        format!("{host}{REDFISH_ROOT}")
    } else {
        format!("https://{host}{REDFISH_ROOT}")
    }
}

/// Truncate a UTF-8 body to at most `max` bytes, snapping to the nearest
/// char boundary.
fn truncate_body(bytes: &[u8], max: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.len() > max => {
            let mut end = max;
            while end > 0 && !s.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &s[..end])
        }
        Ok(s) => s.to_string(),
        Err(_) => "<non-utf8 body>".to_string(),
    }
}
