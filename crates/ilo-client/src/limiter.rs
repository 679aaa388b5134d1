use crate::error::{ClientError, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Default bound on concurrent in-flight requests per controller.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

/// Bounds the number of requests in flight against one controller.
///
/// Clones share the same pool of tokens.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max: usize,
}

/// Permission to have one request in flight. The slot is returned to the
/// limiter when the token is dropped.
#[derive(Debug)]
pub struct ConcurrencyToken {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// A bound of zero is raised to one.
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Number of tokens currently held.
    pub fn in_use(&self) -> usize {
        self.max - self.semaphore.available_permits()
    }

    /// Waits for a free slot or for `cancel` to fire, whichever comes first.
    ///
    /// `path` only labels the error.
    pub async fn acquire(&self, cancel: &CancellationToken, path: &str) -> Result<ConcurrencyToken> {
        let wait_cancelled = || ClientError::LimitWaitCancelled {
            path: path.to_string(),
        };

        if cancel.is_cancelled() {
            return Err(wait_cancelled());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(wait_cancelled()),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                // The semaphore is never closed, so this only fails if that changes.
                let permit = permit.map_err(|_| wait_cancelled())?;
                Ok(ConcurrencyToken { _permit: permit })
            }
        }
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }
}
