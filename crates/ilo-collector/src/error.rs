use ilo_client::{ClientError, ErrorKind};
use ilo_common::SampleError;

/// A failure local to one resource fetch inside a subsystem collector.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The payload decoded but lacks a field the collector needs.
    #[error("{path}: missing field {field}")]
    MissingField { path: String, field: &'static str },

    #[error(transparent)]
    Sample(#[from] SampleError),
}

impl CollectError {
    pub fn missing(path: &str, field: &'static str) -> Self {
        CollectError::MissingField {
            path: path.to_string(),
            field,
        }
    }

    /// Short classification for log fields.
    pub fn kind(&self) -> String {
        match self {
            CollectError::Client(e) => e.kind().to_string(),
            CollectError::MissingField { .. } => ErrorKind::Decode.to_string(),
            CollectError::Sample(_) => "sample".to_string(),
        }
    }
}

/// Failures that stop a scrape before any collection starts.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("no host defined")]
    NoHost,

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type Result<T> = std::result::Result<T, CollectError>;
