//! Host resource usage, read through sysinfo rather than a shell

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::debug;

use super::ToolTrait;

const METRICS: [&str; 3] = ["cpu", "memory", "disk"];

/// CPU, memory and root disk usage in percent
pub struct SystemMetricsTool;

impl SystemMetricsTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemMetricsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SystemMetricsArgs {
    #[serde(default)]
    metrics: Option<Vec<String>>,
}

fn percent(used: f64, total: f64) -> Value {
    if total <= 0.0 {
        return Value::Null;
    }
    json!((used * 10_000.0 / total).round() / 100.0)
}

fn cpu_usage() -> Value {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    // Usage is a delta between two refreshes
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();
    json!((sys.global_cpu_usage() as f64 * 100.0).round() / 100.0)
}

fn memory_usage() -> Value {
    let mut sys = System::new();
    sys.refresh_memory();
    percent(sys.used_memory() as f64, sys.total_memory() as f64)
}

/// Usage of the disk mounted at `/`, else the first disk listed
fn disk_usage() -> (Value, Value) {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first());
    match disk {
        Some(disk) => {
            let total = disk.total_space() as f64;
            let used = total - disk.available_space() as f64;
            (
                percent(used, total),
                json!(disk.mount_point().display().to_string()),
            )
        }
        None => (Value::Null, Value::Null),
    }
}

fn collect(metrics: &[String]) -> Map<String, Value> {
    let mut out = Map::new();
    for metric in metrics {
        match metric.as_str() {
            "cpu" => {
                out.insert("cpu_usage".into(), cpu_usage());
            }
            "memory" => {
                out.insert("memory_usage".into(), memory_usage());
            }
            "disk" => {
                let (usage, mount) = disk_usage();
                out.insert("disk_usage".into(), usage);
                out.insert("disk_mount".into(), mount);
            }
            _ => {}
        }
    }
    out
}

#[async_trait]
impl ToolTrait for SystemMetricsTool {
    fn name(&self) -> &str {
        "check_system_metrics"
    }

    fn description(&self) -> &str {
        "Report CPU, memory and root disk usage of this host in percent."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "metrics": {
                    "type": "array",
                    "items": { "type": "string", "enum": METRICS },
                    "description": "Metrics to collect (default: all)"
                }
            }
        })
    }

    async fn execute(
        &self,
        args: Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let args: SystemMetricsArgs = serde_json::from_value(args)?;
        let metrics = args
            .metrics
            .unwrap_or_else(|| METRICS.iter().map(|m| m.to_string()).collect());
        if let Some(unknown) = metrics.iter().find(|m| !METRICS.contains(&m.as_str())) {
            return Err(format!("◆ UNKNOWN METRIC: {}", unknown).into());
        }
        debug!("◆ COLLECTING METRICS: {}", metrics.join(", "));

        let out = tokio::task::spawn_blocking(move || collect(&metrics)).await?;
        Ok(serde_json::to_string_pretty(&Value::Object(out))?)
    }
}
