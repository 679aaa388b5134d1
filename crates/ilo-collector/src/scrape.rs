use crate::context::CollectionContext;
use crate::error::ScrapeError;
use crate::{
    ChassisCollector, ManagerCollector, PowerCollector, SubsystemCollector, SystemCollector,
    ThermalCollector,
};
use ilo_client::{Client, ClientOptions, Credentials, HttpClient};
use ilo_common::types::{HOST_LABEL, PREFIX};
use ilo_common::{MetricDesc, MetricKind, MetricSample};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// How long a cancelled scrape waits for in-flight collectors to unwind
/// before it finalizes anyway.
pub const DEFAULT_UNWIND_GRACE: Duration = Duration::from_millis(250);

const SCRAPE_DURATION: MetricDesc = MetricDesc::gauge(
    "ilo_scrape_duration_second",
    "Duration of the whole scrape in seconds",
    &["host"],
);

/// A top-level collector and the resource path it starts from.
#[derive(Clone)]
pub struct Registration {
    pub collector: Arc<dyn SubsystemCollector>,
    pub path: String,
}

impl Registration {
    pub fn new(collector: impl SubsystemCollector + 'static, path: impl Into<String>) -> Self {
        Self {
            collector: Arc::new(collector),
            path: path.into(),
        }
    }
}

/// The collectors every scrape runs unless configured otherwise.
pub fn default_registrations() -> Vec<Registration> {
    vec![
        Registration::new(ChassisCollector, "Chassis/1"),
        Registration::new(PowerCollector, "Chassis/1"),
        Registration::new(ThermalCollector, "Chassis/1"),
        Registration::new(ManagerCollector, "Managers/1"),
        Registration::new(SystemCollector, "Systems/1"),
    ]
}

/// One inbound scrape: the target host, optional credential overrides and
/// the cancellation signal tied to the originating request.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub cancel: CancellationToken,
}

impl ScrapeRequest {
    pub fn new(host: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            host: host.into(),
            username: None,
            password: None,
            cancel,
        }
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }
}

/// Everything one scrape produced.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub host: String,
    pub samples: Vec<MetricSample>,
    /// Number of failed resource fetches. Reported to the caller, never
    /// exported as a sample.
    pub errors: u64,
    /// Whether the scrape ended because its cancellation signal fired.
    pub cancelled: bool,
    pub duration: Duration,
}

/// Runs the registered subsystem collectors concurrently against one host.
///
/// A `Scraper` holds no per-scrape state and is shared by all requests; every
/// call to [`Scraper::scrape`] builds its own [`CollectionContext`].
pub struct Scraper {
    collectors: Vec<Registration>,
    unwind_grace: Duration,
}

impl Default for Scraper {
    fn default() -> Self {
        Self::with_default_collectors()
    }
}

impl Scraper {
    pub fn new(collectors: Vec<Registration>) -> Self {
        Self {
            collectors,
            unwind_grace: DEFAULT_UNWIND_GRACE,
        }
    }

    pub fn with_default_collectors() -> Self {
        Self::new(default_registrations())
    }

    pub fn with_unwind_grace(mut self, grace: Duration) -> Self {
        self.unwind_grace = grace;
        self
    }

    /// Resolves credentials, builds the HTTP client for `request.host` and
    /// scrapes it.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::NoHost`] when the host is empty and
    /// [`ScrapeError::Client`] when the HTTP client cannot be built. Failures
    /// during collection are partial and only counted in the outcome.
    pub async fn run(
        &self,
        request: ScrapeRequest,
        options: &ClientOptions,
        defaults: &Credentials,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let host = request.host.trim();
        if host.is_empty() {
            return Err(ScrapeError::NoHost);
        }

        let credentials =
            defaults.override_with(request.username.as_deref(), request.password.as_deref());
        let client = HttpClient::new(host, credentials, options)?;
        Ok(self.scrape(Arc::new(client), request.cancel).await)
    }

    /// Scrapes the host behind `client` until every collector has finished or
    /// `cancel` fires.
    pub async fn scrape(&self, client: Arc<dyn Client>, cancel: CancellationToken) -> ScrapeOutcome {
        let started = Instant::now();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cc = CollectionContext::new(cancel.clone(), client, tx);
        let host = cc.host().to_string();

        for registration in &self.collectors {
            let ctx = Arc::clone(&cc);
            let collector = Arc::clone(&registration.collector);
            let path = registration.path.clone();
            cc.spawn(async move {
                let start = Instant::now();
                collector.collect(&path, &ctx).await;
                if ctx.cancel_token().is_cancelled() {
                    tracing::debug!(host = %ctx.host(), subsystem = collector.name(), "Subsystem unwound after cancellation");
                    return;
                }
                ctx.record_metrics([subsystem_duration(ctx.host(), collector.name(), start.elapsed())]);
            });
        }
        cc.tracker().close();

        let cancelled = tokio::select! {
            biased;
            _ = cc.tracker().wait() => false,
            _ = cancel.cancelled() => true,
        };

        if cancelled && timeout(self.unwind_grace, cc.tracker().wait()).await.is_err() {
            let aborted = cc.abort_outstanding();
            tracing::warn!(
                host = %host,
                aborted,
                grace_ms = self.unwind_grace.as_millis() as u64,
                "Collectors still running after cancellation, aborted"
            );
        }

        let duration = started.elapsed();
        match SCRAPE_DURATION.sample(duration.as_secs_f64(), &[&host]) {
            Ok(sample) => cc.record_metrics([sample]),
            Err(e) => tracing::error!(host = %host, error = %e, "Failed to build scrape duration sample"),
        }
        let errors = cc.err_count();

        // Stragglers past the grace period find the channel closed.
        rx.close();
        let mut samples = Vec::new();
        while let Some(sample) = rx.recv().await {
            samples.push(sample);
        }

        tracing::info!(
            host = %host,
            samples = samples.len(),
            errors,
            cancelled,
            elapsed_ms = duration.as_millis() as u64,
            "Scrape finished"
        );

        ScrapeOutcome {
            host,
            samples,
            errors,
            cancelled,
            duration,
        }
    }
}

fn subsystem_duration(host: &str, subsystem: &str, elapsed: Duration) -> MetricSample {
    MetricSample::new(
        format!("{PREFIX}{subsystem}_scrape_duration_second"),
        format!("Duration of the {subsystem} scrape in seconds"),
        MetricKind::Gauge,
        elapsed.as_secs_f64(),
        vec![(HOST_LABEL.to_string(), host.to_string())],
    )
}
