//! Redfish schema fragments shared by several subsystems.

use crate::context::CollectionContext;
use crate::error::CollectError;
use ilo_client::relative_path;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    pub health: Option<String>,
    pub state: Option<String>,
}

impl Status {
    pub fn healthy(&self) -> bool {
        self.health.as_deref() == Some("OK")
    }

    pub fn enabled(&self) -> bool {
        self.state.as_deref() == Some("Enabled")
    }

    /// Absent components (empty DIMM slots, missing PSUs) produce no samples.
    pub fn absent(&self) -> bool {
        self.state.as_deref() == Some("Absent")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Collection {
    #[serde(default)]
    pub members: Vec<Link>,
}

pub fn power_up(power_state: Option<&str>) -> bool {
    power_state == Some("On")
}

/// Fetches the collection at `path` and runs `per_member` for every member
/// as its own tracked task, returning once all of them have finished.
///
/// A failed collection fetch is recorded once; member failures are recorded
/// by `per_member` itself.
pub async fn collect_members<F, Fut>(
    subsystem: &'static str,
    path: &str,
    cc: &Arc<CollectionContext>,
    per_member: F,
) where
    F: Fn(Arc<CollectionContext>, String) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let collection: Collection = match cc.fetch(path).await {
        Ok(c) => c,
        Err(e) => {
            cc.handle_error(subsystem, path, &CollectError::from(e));
            return;
        }
    };

    let handles: Vec<_> = collection
        .members
        .iter()
        .map(|link| {
            let member = relative_path(&link.odata_id).to_string();
            cc.spawn(per_member(Arc::clone(cc), member))
        })
        .collect();

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(host = %cc.host(), subsystem, path, error = %e, "Member task panicked");
        }
    }
}
