use crate::context::CollectionContext;
use crate::error::Result;
use crate::redfish::Status;
use crate::SubsystemCollector;
use async_trait::async_trait;
use ilo_common::types::bool_value;
use ilo_common::{MetricDesc, MetricSample};
use serde::Deserialize;
use std::sync::Arc;

const FAN_HEALTHY: MetricDesc = MetricDesc::gauge(
    "ilo_thermal_fan_healthy",
    "Health status of the fan",
    &["host", "name"],
);
const FAN_ENABLED: MetricDesc = MetricDesc::gauge(
    "ilo_thermal_fan_enabled",
    "Status of the fan",
    &["host", "name"],
);
const FAN_CURRENT: MetricDesc = MetricDesc::gauge(
    "ilo_thermal_fan_current_percent",
    "Current fan speed in percent",
    &["host", "name"],
);
const TEMP_HEALTHY: MetricDesc = MetricDesc::gauge(
    "ilo_thermal_temperature_healthy",
    "Health status of the temperature sensor",
    &["host", "name"],
);
const TEMP_ENABLED: MetricDesc = MetricDesc::gauge(
    "ilo_thermal_temperature_enabled",
    "Status of the temperature sensor",
    &["host", "name"],
);
const TEMP_CURRENT: MetricDesc = MetricDesc::gauge(
    "ilo_thermal_temperature_current",
    "Current temperature in degrees celsius",
    &["host", "name"],
);
const TEMP_CRITICAL: MetricDesc = MetricDesc::gauge(
    "ilo_thermal_temperature_critical",
    "Critical temperature threshold in degrees celsius",
    &["host", "name"],
);
const TEMP_FATAL: MetricDesc = MetricDesc::gauge(
    "ilo_thermal_temperature_fatal",
    "Fatal temperature threshold in degrees celsius",
    &["host", "name"],
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Thermal {
    #[serde(default)]
    fans: Vec<Fan>,
    #[serde(default)]
    temperatures: Vec<Temperature>,
}

// iLO 4 reports `FanName`/`CurrentReading`, iLO 5 `Name`/`Reading`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Fan {
    #[serde(alias = "FanName", default)]
    name: String,
    #[serde(alias = "CurrentReading")]
    reading: Option<f64>,
    #[serde(default)]
    status: Status,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Temperature {
    #[serde(default)]
    name: String,
    reading_celsius: Option<f64>,
    upper_threshold_critical: Option<f64>,
    upper_threshold_fatal: Option<f64>,
    #[serde(default)]
    status: Status,
}

/// Fan speeds and temperature sensor readings.
pub struct ThermalCollector;

#[async_trait]
impl SubsystemCollector for ThermalCollector {
    fn name(&self) -> &'static str {
        "thermal"
    }

    async fn collect(&self, path: &str, cc: &Arc<CollectionContext>) {
        let resource = format!("{path}/Thermal");
        let result = async {
            let thermal: Thermal = cc.fetch(&resource).await?;
            samples(cc.host(), &thermal)
        }
        .await;

        match result {
            Ok(samples) => cc.record_metrics(samples),
            Err(e) => cc.handle_error(self.name(), &resource, &e),
        }
    }
}

fn samples(host: &str, thermal: &Thermal) -> Result<Vec<MetricSample>> {
    let mut samples = Vec::new();

    for fan in thermal.fans.iter().filter(|f| !f.status.absent()) {
        let labels = [host, fan.name.as_str()];
        samples.push(FAN_HEALTHY.sample(bool_value(fan.status.healthy()), &labels)?);
        samples.push(FAN_ENABLED.sample(bool_value(fan.status.enabled()), &labels)?);
        if let Some(reading) = fan.reading {
            samples.push(FAN_CURRENT.sample(reading, &labels)?);
        }
    }

    for temp in thermal.temperatures.iter().filter(|t| !t.status.absent()) {
        let labels = [host, temp.name.as_str()];
        samples.push(TEMP_HEALTHY.sample(bool_value(temp.status.healthy()), &labels)?);
        samples.push(TEMP_ENABLED.sample(bool_value(temp.status.enabled()), &labels)?);
        for (desc, value) in [
            (&TEMP_CURRENT, temp.reading_celsius),
            (&TEMP_CRITICAL, temp.upper_threshold_critical),
            (&TEMP_FATAL, temp.upper_threshold_fatal),
        ] {
            if let Some(value) = value {
                samples.push(desc.sample(value, &labels)?);
            }
        }
    }

    Ok(samples)
}
