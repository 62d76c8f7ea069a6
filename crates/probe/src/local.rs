//! Local-process probe back-end for dev / docker-compose deployments.
//!
//! There is a single broker colocated with this process: CPU comes from
//! process stat, memory from `ps -o vsz`, storage from `df -h /`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sysinfo::{ProcessesToUpdate, System};
use tokio::process::Command;
use tracing::warn;

use switchyard_core::{Error, Result, Stat};

use crate::classify::classify_component;
use crate::family::{group_families, ProbedComponent, FAMILY_BROKER};
use crate::{ComponentProbe, SystemSnapshot};

/// Ports a single-node broker exposes: client connections and the UI.
const LOCAL_BROKER_PORTS: [u16; 2] = [6666, 9000];

const LOCAL_BROKER_NAME: &str = "broker-0";

pub struct LocalProbe;

impl LocalProbe {
    pub fn new() -> Self {
        Self
    }

    async fn cpu_stat(&self) -> Result<Stat> {
        let pid =
            sysinfo::get_current_pid().map_err(|e| Error::Internal(format!("current pid: {e}")))?;
        let mut system = System::new_all();
        // cpu_usage is a delta between two refreshes.
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        system.refresh_processes(ProcessesToUpdate::All);
        let process = system
            .process(pid)
            .ok_or_else(|| Error::Internal("own process missing from process table".into()))?;
        let cores = system.cpus().len().max(1);
        let used_pct = f64::from(process.cpu_usage()) / cores as f64;
        Ok(Stat::new(100.0, used_pct))
    }

    async fn memory_stat(&self) -> Result<Stat> {
        let pid = std::process::id().to_string();
        let output = Command::new("ps")
            .args(["-o", "vsz=", "-p", &pid])
            .output()
            .await?;
        let vsz_kb: f64 = String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .unwrap_or(0.0);

        let mut system = System::new();
        system.refresh_memory();
        Ok(Stat::new(
            system.total_memory() as f64,
            vsz_kb * 1024.0,
        ))
    }

    async fn storage_stat(&self) -> Result<Stat> {
        let output = Command::new("df").args(["-h", "/"]).output().await?;
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        match parse_df_human(&text) {
            Some((total, used)) => Ok(Stat::new(total, used)),
            None => {
                warn!("unparseable df -h output");
                Ok(Stat::zero())
            }
        }
    }
}

impl Default for LocalProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComponentProbe for LocalProbe {
    async fn system_components(&self) -> Result<SystemSnapshot> {
        let cpu = self.cpu_stat().await?;
        let memory = self.memory_stat().await?;
        let storage = self.storage_stat().await?;

        let probed = vec![ProbedComponent {
            component: classify_component(LOCAL_BROKER_NAME, cpu, memory, storage),
            family: FAMILY_BROKER,
            ports: LOCAL_BROKER_PORTS.to_vec(),
            host: System::host_name().unwrap_or_else(|| "localhost".to_string()),
        }];
        let desired = BTreeMap::from([(FAMILY_BROKER.to_string(), 1)]);

        Ok(SystemSnapshot {
            families: group_families(probed, &desired),
            metrics_enabled: true,
        })
    }

    async fn available_replicas(&self) -> Result<usize> {
        Ok(1)
    }
}

/// Parse the size/used columns of `df -h` for the root filesystem line,
/// returning bytes.
fn parse_df_human(output: &str) -> Option<(f64, f64)> {
    let line = output.lines().nth(1)?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return None;
    }
    Some((parse_human_size(fields[1])?, parse_human_size(fields[2])?))
}

/// `df -h` sizes carry a unit suffix ("46G", "980M", "1.5T").
fn parse_human_size(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    let (number, suffix) = field.split_at(field.len() - 1);
    let factor = match suffix {
        "K" => 1024.0,
        "M" => 1024.0 * 1024.0,
        "G" => 1024.0 * 1024.0 * 1024.0,
        "T" => 1024.0_f64.powi(4),
        _ => return field.parse().ok(),
    };
    number.parse::<f64>().ok().map(|v| v * factor)
}
