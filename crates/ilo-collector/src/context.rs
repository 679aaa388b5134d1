use crate::error::CollectError;
use ilo_client::{fetch, Client, ClientError};
use ilo_common::MetricSample;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Per-scrape coordination hub shared by every collector task of one scrape.
///
/// Holds the scrape's cancellation token, the one backend client, the sample
/// channel, the task tracker used for fan-in and the error tally. A context
/// belongs to exactly one scrape of one host and is never reused.
pub struct CollectionContext {
    host: String,
    cancel: CancellationToken,
    client: Arc<dyn Client>,
    tx: UnboundedSender<MetricSample>,
    tracker: TaskTracker,
    tasks: Mutex<Vec<AbortHandle>>,
    errors: AtomicU64,
}

impl CollectionContext {
    pub fn new(
        cancel: CancellationToken,
        client: Arc<dyn Client>,
        tx: UnboundedSender<MetricSample>,
    ) -> Arc<Self> {
        Arc::new(Self {
            host: client.host_name().to_string(),
            cancel,
            client,
            tx,
            tracker: TaskTracker::new(),
            tasks: Mutex::new(Vec::new()),
            errors: AtomicU64::new(0),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn client(&self) -> &Arc<dyn Client> {
        &self.client
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Fetches and decodes `path` through the shared client, observing the
    /// scrape's cancellation.
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        fetch(self.client.as_ref(), &self.cancel, path).await
    }

    /// Runs `task` as a tracked unit of work. The task stays registered until
    /// it returns or panics.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.tracker.spawn(task);
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(handle.abort_handle());
        }
        handle
    }

    /// Aborts every task of this scrape that is still running and returns
    /// how many there were.
    pub fn abort_outstanding(&self) -> usize {
        let Ok(mut tasks) = self.tasks.lock() else {
            return 0;
        };
        let mut aborted = 0;
        for task in tasks.drain(..) {
            if !task.is_finished() {
                task.abort();
                aborted += 1;
            }
        }
        aborted
    }

    /// Writes samples to the scrape's output channel.
    ///
    /// Samples labelled for another host are dropped.
    pub fn record_metrics(&self, samples: impl IntoIterator<Item = MetricSample>) {
        for sample in samples {
            if sample.host() != Some(self.host.as_str()) {
                tracing::warn!(
                    host = %self.host,
                    metric = %sample.name(),
                    sample_host = ?sample.host(),
                    "Dropping sample labelled for a different host"
                );
                continue;
            }
            if self.tx.send(sample).is_err() {
                tracing::debug!(host = %self.host, "Scrape already finalized, sample discarded");
                return;
            }
        }
    }

    /// Counts one failed resource fetch and logs it.
    pub fn handle_error(&self, subsystem: &str, path: &str, err: &CollectError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        tracing::error!(
            host = %self.host,
            subsystem,
            path,
            kind = %err.kind(),
            error = %err,
            "Collection failed"
        );
    }

    /// Number of failures recorded so far. Authoritative only once all
    /// tracked tasks have finished.
    pub fn err_count(&self) -> u64 {
        self.errors.load(Ordering::SeqCst)
    }
}
