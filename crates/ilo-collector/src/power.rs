use crate::context::CollectionContext;
use crate::error::{CollectError, Result};
use crate::redfish::Status;
use crate::SubsystemCollector;
use async_trait::async_trait;
use ilo_common::types::bool_value;
use ilo_common::{MetricDesc, MetricSample};
use serde::Deserialize;
use std::sync::Arc;

const CURRENT: MetricDesc = MetricDesc::gauge(
    "ilo_power_current_watt",
    "Current power consumption in watts",
    &["host"],
);
const AVERAGE: MetricDesc = MetricDesc::gauge(
    "ilo_power_average_watt",
    "Average power consumption over the controller's sampling interval in watts",
    &["host"],
);
const MIN: MetricDesc = MetricDesc::gauge(
    "ilo_power_min_watt",
    "Minimum power consumption over the controller's sampling interval in watts",
    &["host"],
);
const MAX: MetricDesc = MetricDesc::gauge(
    "ilo_power_max_watt",
    "Maximum power consumption over the controller's sampling interval in watts",
    &["host"],
);
const CAPACITY: MetricDesc = MetricDesc::gauge(
    "ilo_power_capacity_watt",
    "Power capacity in watts",
    &["host"],
);
const SUPPLY_HEALTHY: MetricDesc = MetricDesc::gauge(
    "ilo_power_supply_healthy",
    "Health status of the power supply",
    &["host", "serial"],
);
const SUPPLY_ENABLED: MetricDesc = MetricDesc::gauge(
    "ilo_power_supply_enabled",
    "Status of the power supply",
    &["host", "serial"],
);
const SUPPLY_OUTPUT: MetricDesc = MetricDesc::gauge(
    "ilo_power_supply_output_watt",
    "Last reported output of the power supply in watts",
    &["host", "serial"],
);
const SUPPLY_CAPACITY: MetricDesc = MetricDesc::gauge(
    "ilo_power_supply_capacity_watt",
    "Capacity of the power supply in watts",
    &["host", "serial"],
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Power {
    #[serde(default)]
    power_control: Vec<PowerControl>,
    #[serde(default)]
    power_supplies: Vec<PowerSupply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PowerControl {
    power_consumed_watts: Option<f64>,
    power_capacity_watts: Option<f64>,
    power_metrics: Option<PowerMetrics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PowerMetrics {
    average_consumed_watts: Option<f64>,
    min_consumed_watts: Option<f64>,
    max_consumed_watts: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PowerSupply {
    member_id: Option<String>,
    serial_number: Option<String>,
    last_power_output_watts: Option<f64>,
    power_capacity_watts: Option<f64>,
    #[serde(default)]
    status: Status,
}

/// Power draw of the chassis and the state of every power supply.
pub struct PowerCollector;

#[async_trait]
impl SubsystemCollector for PowerCollector {
    fn name(&self) -> &'static str {
        "power"
    }

    async fn collect(&self, path: &str, cc: &Arc<CollectionContext>) {
        let resource = format!("{path}/Power");
        let result = async {
            let power: Power = cc.fetch(&resource).await?;
            samples(cc.host(), &resource, &power)
        }
        .await;

        match result {
            Ok(samples) => cc.record_metrics(samples),
            Err(e) => cc.handle_error(self.name(), &resource, &e),
        }
    }
}

fn samples(host: &str, resource: &str, power: &Power) -> Result<Vec<MetricSample>> {
    let control = power
        .power_control
        .first()
        .ok_or_else(|| CollectError::missing(resource, "PowerControl"))?;
    let consumed = control
        .power_consumed_watts
        .ok_or_else(|| CollectError::missing(resource, "PowerConsumedWatts"))?;

    let mut samples = vec![CURRENT.sample(consumed, &[host])?];
    if let Some(capacity) = control.power_capacity_watts {
        samples.push(CAPACITY.sample(capacity, &[host])?);
    }
    if let Some(metrics) = &control.power_metrics {
        for (desc, value) in [
            (&AVERAGE, metrics.average_consumed_watts),
            (&MIN, metrics.min_consumed_watts),
            (&MAX, metrics.max_consumed_watts),
        ] {
            if let Some(value) = value {
                samples.push(desc.sample(value, &[host])?);
            }
        }
    }

    for supply in power.power_supplies.iter().filter(|s| !s.status.absent()) {
        samples.extend(supply_samples(host, supply)?);
    }

    Ok(samples)
}

fn supply_samples(host: &str, supply: &PowerSupply) -> Result<Vec<MetricSample>> {
    let serial = supply
        .serial_number
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or(supply.member_id.as_deref())
        .unwrap_or_default()
        .trim();
    let labels = [host, serial];

    let mut samples = vec![
        SUPPLY_HEALTHY.sample(bool_value(supply.status.healthy()), &labels)?,
        SUPPLY_ENABLED.sample(bool_value(supply.status.enabled()), &labels)?,
    ];
    if let Some(output) = supply.last_power_output_watts {
        samples.push(SUPPLY_OUTPUT.sample(output, &labels)?);
    }
    if let Some(capacity) = supply.power_capacity_watts {
        samples.push(SUPPLY_CAPACITY.sample(capacity, &labels)?);
    }
    Ok(samples)
}
