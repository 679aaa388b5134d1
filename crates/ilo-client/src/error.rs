/// Errors that can occur when talking to a management controller.
///
/// # Examples
///
/// ```rust
/// use ilo_client::error::{ClientError, ErrorKind};
///
/// let err = ClientError::HttpStatus { path: "Chassis/1".to_string(), status: 503 };
/// assert!(err.to_string().contains("503"));
/// assert_eq!(err.kind(), ErrorKind::Unavailable);
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure or timeout reaching the controller.
    #[error("controller unavailable for {path}: {message}")]
    Unavailable { path: String, message: String },

    /// The controller answered with a non-2xx status code.
    #[error("controller returned HTTP {status} for {path}")]
    HttpStatus { path: String, status: u16 },

    /// The payload does not match the expected resource schema.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The scrape was cancelled while the request was in flight.
    #[error("request for {path} cancelled")]
    Cancelled { path: String },

    /// The scrape was cancelled before a request slot became free.
    #[error("cancelled while waiting for a request slot for {path}")]
    LimitWaitCancelled { path: String },

    /// The HTTP client could not be built from the given options.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of a [`ClientError`], used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unavailable,
    Decode,
    Cancelled,
    LimitWaitCancelled,
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Unavailable => write!(f, "unavailable"),
            ErrorKind::Decode => write!(f, "decode"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::LimitWaitCancelled => write!(f, "limit_wait_cancelled"),
            ErrorKind::Config => write!(f, "config"),
        }
    }
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Unavailable { .. } | ClientError::HttpStatus { .. } => {
                ErrorKind::Unavailable
            }
            ClientError::Decode { .. } => ErrorKind::Decode,
            ClientError::Cancelled { .. } => ErrorKind::Cancelled,
            ClientError::LimitWaitCancelled { .. } => ErrorKind::LimitWaitCancelled,
            ClientError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    pub fn unavailable(path: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("timeout: {err}")
        } else {
            err.to_string()
        };
        ClientError::Unavailable {
            path: path.to_string(),
            message,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            ClientError::Cancelled { .. } | ClientError::LimitWaitCancelled { .. }
        )
    }
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, ClientError>;
