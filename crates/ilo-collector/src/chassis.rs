use crate::context::CollectionContext;
use crate::error::Result;
use crate::redfish::{power_up, Status};
use crate::SubsystemCollector;
use async_trait::async_trait;
use ilo_common::types::bool_value;
use ilo_common::{MetricDesc, MetricSample};
use serde::Deserialize;
use std::sync::Arc;

const HEALTHY: MetricDesc = MetricDesc::gauge(
    "ilo_chassis_healthy",
    "Health status of the chassis",
    &["host"],
);
const POWER_UP: MetricDesc = MetricDesc::gauge(
    "ilo_chassis_power_up",
    "Power status of the chassis",
    &["host"],
);
const INFO: MetricDesc = MetricDesc::gauge(
    "ilo_chassis_info",
    "Chassis model and serial number",
    &["host", "model", "serial"],
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Chassis {
    model: Option<String>,
    serial_number: Option<String>,
    power_state: Option<String>,
    #[serde(default)]
    status: Status,
}

/// Chassis-level health and power state.
pub struct ChassisCollector;

#[async_trait]
impl SubsystemCollector for ChassisCollector {
    fn name(&self) -> &'static str {
        "chassis"
    }

    async fn collect(&self, path: &str, cc: &Arc<CollectionContext>) {
        let result = async {
            let chassis: Chassis = cc.fetch(path).await?;
            samples(cc.host(), &chassis)
        }
        .await;

        match result {
            Ok(samples) => cc.record_metrics(samples),
            Err(e) => cc.handle_error(self.name(), path, &e),
        }
    }
}

fn samples(host: &str, chassis: &Chassis) -> Result<Vec<MetricSample>> {
    Ok(vec![
        HEALTHY.sample(bool_value(chassis.status.healthy()), &[host])?,
        POWER_UP.sample(bool_value(power_up(chassis.power_state.as_deref())), &[host])?,
        INFO.sample(
            1.0,
            &[
                host,
                chassis.model.as_deref().unwrap_or_default(),
                chassis.serial_number.as_deref().unwrap_or_default(),
            ],
        )?,
    ])
}
