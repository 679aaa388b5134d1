use crate::context::CollectionContext;
use crate::error::Result;
use crate::redfish::Status;
use crate::SubsystemCollector;
use async_trait::async_trait;
use ilo_common::types::bool_value;
use ilo_common::{MetricDesc, MetricSample};
use serde::Deserialize;
use std::sync::Arc;

const HEALTHY: MetricDesc = MetricDesc::gauge(
    "ilo_manager_healthy",
    "Health status of the management controller",
    &["host"],
);
const INFO: MetricDesc = MetricDesc::gauge(
    "ilo_manager_info",
    "Management controller model and firmware version",
    &["host", "model", "firmware"],
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Manager {
    model: Option<String>,
    firmware_version: Option<String>,
    #[serde(default)]
    status: Status,
}

/// Health and firmware of the management controller itself.
pub struct ManagerCollector;

#[async_trait]
impl SubsystemCollector for ManagerCollector {
    fn name(&self) -> &'static str {
        "manager"
    }

    async fn collect(&self, path: &str, cc: &Arc<CollectionContext>) {
        let result = async {
            let manager: Manager = cc.fetch(path).await?;
            samples(cc.host(), &manager)
        }
        .await;

        match result {
            Ok(samples) => cc.record_metrics(samples),
            Err(e) => cc.handle_error(self.name(), path, &e),
        }
    }
}

fn samples(host: &str, manager: &Manager) -> Result<Vec<MetricSample>> {
    Ok(vec![
        HEALTHY.sample(bool_value(manager.status.healthy()), &[host])?,
        INFO.sample(
            1.0,
            &[
                host,
                manager.model.as_deref().unwrap_or_default(),
                manager.firmware_version.as_deref().unwrap_or_default(),
            ],
        )?,
    ])
}
