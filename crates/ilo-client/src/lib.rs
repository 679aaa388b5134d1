//! Bounded-concurrency access to a management controller's Redfish API.
//!
//! Every request first takes a [`ConcurrencyToken`] from the client's
//! [`ConcurrencyLimiter`], so the number of requests in flight against one
//! controller never exceeds the configured bound no matter how many
//! collectors share the client.

pub mod error;
pub mod http;
pub mod limiter;

pub use error::{ClientError, ErrorKind, Result};
pub use http::{ClientOptions, HttpClient};
pub use limiter::{ConcurrencyLimiter, ConcurrencyToken, DEFAULT_MAX_CONCURRENT_REQUESTS};

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Path of the Redfish service root on every controller.
pub const REDFISH_ROOT: &str = "/redfish/v1/";

/// Authenticated, bounded access to one controller host.
#[async_trait]
pub trait Client: Send + Sync {
    /// Host this client talks to, used as the `host` label of every sample.
    fn host_name(&self) -> &str;

    /// Fetches the raw payload of the resource at `path`, relative to the
    /// Redfish service root.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::LimitWaitCancelled`] if `cancel` fires before a
    /// request slot is free, [`ClientError::Cancelled`] if it fires while the
    /// call is in flight, and [`ClientError::Unavailable`] or
    /// [`ClientError::HttpStatus`] when the controller cannot be reached or
    /// rejects the request.
    async fn request(&self, cancel: &CancellationToken, path: &str) -> Result<Bytes>;
}

/// Fetches `path` and decodes it into `T`.
///
/// # Errors
///
/// Everything [`Client::request`] returns, plus [`ClientError::Decode`] when
/// the payload does not match `T`.
pub async fn fetch<T: DeserializeOwned>(
    client: &dyn Client,
    cancel: &CancellationToken,
    path: &str,
) -> Result<T> {
    let payload = client.request(cancel, path).await?;
    serde_json::from_slice(&payload).map_err(|source| ClientError::Decode {
        path: path.to_string(),
        source,
    })
}

/// Username and password used for HTTP basic auth against the controller.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Replaces each field with its override when the override is non-empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use ilo_client::Credentials;
    ///
    /// let defaults = Credentials::new("monitor", "secret");
    /// let resolved = defaults.override_with(Some("admin"), None);
    /// assert_eq!(resolved.username, "admin");
    /// assert_eq!(resolved.password, "secret");
    /// ```
    pub fn override_with(&self, username: Option<&str>, password: Option<&str>) -> Self {
        let pick = |over: Option<&str>, default: &str| match over {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => default.to_string(),
        };
        Self {
            username: pick(username, &self.username),
            password: pick(password, &self.password),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Turns a Redfish `@odata.id` link into a path relative to the service root.
///
/// # Examples
///
/// ```
/// use ilo_client::relative_path;
///
/// assert_eq!(relative_path("/redfish/v1/Systems/1/Memory/proc1dimm1/"), "Systems/1/Memory/proc1dimm1");
/// assert_eq!(relative_path("Systems/1"), "Systems/1");
/// ```
pub fn relative_path(odata_id: &str) -> &str {
    let trimmed = odata_id.trim_start_matches('/');
    trimmed
        .strip_prefix(REDFISH_ROOT.trim_start_matches('/'))
        .unwrap_or(trimmed)
        .trim_end_matches('/')
}
