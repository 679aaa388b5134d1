//! Concurrent Redfish collection engine for one scrape of one host.
//!
//! Each [`SubsystemCollector`] walks one part of the controller's resource
//! tree and writes [`MetricSample`](ilo_common::MetricSample)s into the
//! scrape's [`CollectionContext`]. The [`Scraper`] runs all registered
//! collectors concurrently and finalizes the sample set once they finish or
//! the scrape is cancelled.

pub mod chassis;
pub mod context;
pub mod error;
pub mod manager;
pub mod power;
pub mod redfish;
pub mod scrape;
pub mod system;
pub mod thermal;


use async_trait::async_trait;
use std::sync::Arc;

pub use chassis::ChassisCollector;
pub use context::CollectionContext;
pub use error::{CollectError, ScrapeError};
pub use manager::ManagerCollector;
pub use power::PowerCollector;
pub use scrape::{
    default_registrations, Registration, ScrapeOutcome, ScrapeRequest, Scraper, DEFAULT_UNWIND_GRACE,
};
pub use system::SystemCollector;
pub use thermal::ThermalCollector;

/// A unit of collection for one Redfish subsystem.
///
/// Implementations never return errors: every local failure is recorded
/// through [`CollectionContext::handle_error`] and collection of the other
/// subsystems continues. Child work is spawned through
/// [`CollectionContext::spawn`] so the scrape waits for it.
#[async_trait]
pub trait SubsystemCollector: Send + Sync {
    /// Subsystem name used for logging and the per-subsystem duration
    /// metric (e.g. `"chassis"`).
    fn name(&self) -> &'static str;

    /// Collects everything reachable from `path`, a client-relative resource
    /// path such as `Chassis/1`.
    async fn collect(&self, path: &str, cc: &Arc<CollectionContext>);
}
