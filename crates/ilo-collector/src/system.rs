use crate::context::CollectionContext;
use crate::error::Result;
use crate::redfish::{collect_members, power_up, Status};
use crate::SubsystemCollector;
use async_trait::async_trait;
use ilo_common::types::bool_value;
use ilo_common::{MetricDesc, MetricSample};
use serde::Deserialize;
use std::sync::Arc;

const NAME: &str = "system";

const HEALTHY: MetricDesc = MetricDesc::gauge(
    "ilo_system_healthy",
    "Health status of the system",
    &["host"],
);
const POWER_UP: MetricDesc = MetricDesc::gauge(
    "ilo_system_power_up",
    "Power status of the system",
    &["host"],
);
const MEMORY_TOTAL: MetricDesc = MetricDesc::gauge(
    "ilo_system_memory_total_gb",
    "Total system memory in GiB",
    &["host"],
);
const INFO: MetricDesc = MetricDesc::gauge(
    "ilo_system_info",
    "System model, serial number and BIOS version",
    &["host", "model", "serial", "bios"],
);
const DIMM_HEALTHY: MetricDesc = MetricDesc::gauge(
    "ilo_memory_dimm_healthy",
    "Health status of the memory module",
    &["host", "name"],
);
const DIMM_SIZE: MetricDesc = MetricDesc::gauge(
    "ilo_memory_dimm_size_mb",
    "Size of the memory module in MiB",
    &["host", "name"],
);
const CPU_HEALTHY: MetricDesc = MetricDesc::gauge(
    "ilo_processor_healthy",
    "Health status of the processor",
    &["host", "socket", "model"],
);
const CPU_CORES: MetricDesc = MetricDesc::gauge(
    "ilo_processor_core_count",
    "Number of processor cores",
    &["host", "socket", "model"],
);
const CPU_THREADS: MetricDesc = MetricDesc::gauge(
    "ilo_processor_thread_count",
    "Number of processor threads",
    &["host", "socket", "model"],
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct System {
    model: Option<String>,
    serial_number: Option<String>,
    bios_version: Option<String>,
    power_state: Option<String>,
    memory_summary: Option<MemorySummary>,
    #[serde(default)]
    status: Status,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MemorySummary {
    #[serde(rename = "TotalSystemMemoryGiB")]
    total_system_memory_gib: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Dimm {
    #[serde(default)]
    name: String,
    #[serde(rename = "CapacityMiB", alias = "SizeMB")]
    capacity_mib: Option<f64>,
    #[serde(default)]
    status: Status,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Processor {
    #[serde(default)]
    socket: String,
    #[serde(default)]
    model: String,
    total_cores: Option<f64>,
    total_threads: Option<f64>,
    #[serde(default)]
    status: Status,
}

/// System board summary plus every memory module and processor.
///
/// The memory and processor collections are enumerated concurrently with the
/// summary fetch, and each member is fetched as its own tracked task.
pub struct SystemCollector;

#[async_trait]
impl SubsystemCollector for SystemCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn collect(&self, path: &str, cc: &Arc<CollectionContext>) {
        let memory = {
            let ctx = Arc::clone(cc);
            let path = format!("{path}/Memory");
            cc.spawn(async move { collect_members(NAME, &path, &ctx, collect_dimm).await })
        };
        let processors = {
            let ctx = Arc::clone(cc);
            let path = format!("{path}/Processors");
            cc.spawn(async move { collect_members(NAME, &path, &ctx, collect_processor).await })
        };

        let result = async {
            let system: System = cc.fetch(path).await?;
            samples(cc.host(), &system)
        }
        .await;

        match result {
            Ok(samples) => cc.record_metrics(samples),
            Err(e) => cc.handle_error(NAME, path, &e),
        }

        for handle in [memory, processors] {
            if let Err(e) = handle.await {
                tracing::error!(host = %cc.host(), path, error = %e, "Enumeration task panicked");
            }
        }
    }
}

async fn collect_dimm(cc: Arc<CollectionContext>, path: String) {
    let result = async {
        let dimm: Dimm = cc.fetch(&path).await?;
        dimm_samples(cc.host(), &dimm)
    }
    .await;

    match result {
        Ok(samples) => cc.record_metrics(samples),
        Err(e) => cc.handle_error(NAME, &path, &e),
    }
}

async fn collect_processor(cc: Arc<CollectionContext>, path: String) {
    let result = async {
        let cpu: Processor = cc.fetch(&path).await?;
        processor_samples(cc.host(), &cpu)
    }
    .await;

    match result {
        Ok(samples) => cc.record_metrics(samples),
        Err(e) => cc.handle_error(NAME, &path, &e),
    }
}

fn samples(host: &str, system: &System) -> Result<Vec<MetricSample>> {
    let mut samples = vec![
        HEALTHY.sample(bool_value(system.status.healthy()), &[host])?,
        POWER_UP.sample(bool_value(power_up(system.power_state.as_deref())), &[host])?,
        INFO.sample(
            1.0,
            &[
                host,
                system.model.as_deref().unwrap_or_default(),
                system.serial_number.as_deref().unwrap_or_default(),
                system.bios_version.as_deref().unwrap_or_default(),
            ],
        )?,
    ];
    if let Some(total) = system
        .memory_summary
        .as_ref()
        .and_then(|m| m.total_system_memory_gib)
    {
        samples.push(MEMORY_TOTAL.sample(total, &[host])?);
    }
    Ok(samples)
}

fn dimm_samples(host: &str, dimm: &Dimm) -> Result<Vec<MetricSample>> {
    if dimm.status.absent() {
        return Ok(Vec::new());
    }

    let labels = [host, dimm.name.as_str()];
    let mut samples = vec![DIMM_HEALTHY.sample(bool_value(dimm.status.healthy()), &labels)?];
    if let Some(size) = dimm.capacity_mib {
        samples.push(DIMM_SIZE.sample(size, &labels)?);
    }
    Ok(samples)
}

fn processor_samples(host: &str, cpu: &Processor) -> Result<Vec<MetricSample>> {
    if cpu.status.absent() {
        return Ok(Vec::new());
    }

    let labels = [host, cpu.socket.as_str(), cpu.model.trim()];
    let mut samples = vec![CPU_HEALTHY.sample(bool_value(cpu.status.healthy()), &labels)?];
    if let Some(cores) = cpu.total_cores {
        samples.push(CPU_CORES.sample(cores, &labels)?);
    }
    if let Some(threads) = cpu.total_threads {
        samples.push(CPU_THREADS.sample(threads, &labels)?);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_system_summary() {
        let system: System = serde_json::from_str(
            r#"{
                "Model": "ProLiant DL380 Gen10",
                "SerialNumber": "CZ2D1F0ABC",
                "BiosVersion": "U30 v2.52",
                "PowerState": "On",
                "MemorySummary": {"TotalSystemMemoryGiB": 192},
                "Status": {"Health": "OK", "State": "Enabled"}
            }"#,
        )
        .unwrap();

        let samples = samples("ilo1", &system).unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].value(), 1.0);
        assert_eq!(samples[1].value(), 1.0);
        assert_eq!(samples[2].label("bios"), Some("U30 v2.52"));
        assert_eq!(samples[3].name(), "ilo_system_memory_total_gb");
        assert_eq!(samples[3].value(), 192.0);
    }

    #[test]
    fn maps_dimm_and_skips_absent() {
        let dimm: Dimm = serde_json::from_str(
            r#"{"Name": "proc1dimm1", "CapacityMiB": 32768, "Status": {"Health": "OK", "State": "Enabled"}}"#,
        )
        .unwrap();
        let samples = dimm_samples("ilo1", &dimm).unwrap();
        assert_eq!(samples[1].value(), 32768.0);
        assert_eq!(samples[1].label("name"), Some("proc1dimm1"));

        let legacy: Dimm = serde_json::from_str(r#"{"Name": "PROC 1 DIMM 1", "SizeMB": 8192}"#).unwrap();
        assert_eq!(legacy.capacity_mib, Some(8192.0));

        let empty: Dimm =
            serde_json::from_str(r#"{"Name": "proc1dimm2", "Status": {"State": "Absent"}}"#).unwrap();
        assert!(dimm_samples("ilo1", &empty).unwrap().is_empty());
    }

    #[test]
    fn maps_processor() {
        let cpu: Processor = serde_json::from_str(
            r#"{"Socket": "Proc 1", "Model": " Intel(R) Xeon(R) Gold 6130 CPU @ 2.10GHz ",
                "TotalCores": 16, "TotalThreads": 32, "Status": {"Health": "OK"}}"#,
        )
        .unwrap();
        let samples = processor_samples("ilo1", &cpu).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].label("model"), Some("Intel(R) Xeon(R) Gold 6130 CPU @ 2.10GHz"));
        assert_eq!(samples[1].value(), 16.0);
        assert_eq!(samples[2].value(), 32.0);
    }
}
