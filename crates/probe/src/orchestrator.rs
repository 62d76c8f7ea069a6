//! Orchestrator-backed probing: pod inventory + metrics API + exec.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use switchyard_core::{Result, Stat};

use crate::classify::classify_component;
use crate::family::{family_for, group_families, is_storage_bearing, ProbedComponent, FAMILY_BROKER};
use crate::{ComponentProbe, SystemSnapshot};

/// Mount point of the data volume inside storage-bearing containers.
pub const STORAGE_MOUNT: &str = "/data";

/// One running pod as the probe needs it.
#[derive(Debug, Clone)]
pub struct PodSnapshot {
    pub name: String,
    pub node: String,
    pub phase: String,
    pub containers: Vec<ContainerSpec>,
}

#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub ports: Vec<u16>,
    pub cpu_request_millis: i64,
    pub memory_limit_bytes: i64,
}

impl PodSnapshot {
    pub fn is_running(&self) -> bool {
        self.phase == "Running"
    }

    fn ports(&self) -> Vec<u16> {
        self.containers.iter().flat_map(|c| c.ports.clone()).collect()
    }

    fn cpu_request_millis(&self) -> i64 {
        self.containers.iter().map(|c| c.cpu_request_millis).sum()
    }

    fn memory_limit_bytes(&self) -> i64 {
        self.containers.iter().map(|c| c.memory_limit_bytes).sum()
    }
}

/// Measured usage for one pod, summed over containers.
#[derive(Debug, Clone)]
pub struct PodUsage {
    pub pod: String,
    pub cpu_used_millis: i64,
    pub memory_used_bytes: i64,
}

/// Desired-state record for a deployment or stateful set.
#[derive(Debug, Clone)]
pub struct WorkloadSpec {
    pub name: String,
    pub desired_replicas: usize,
}

/// The orchestrator surface the probe consumes. Implementations own their
/// credentials and their one-shot "metrics absent" warn latch.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn list_pods(&self) -> Result<Vec<PodSnapshot>>;

    /// Per-pod usage from the metrics API. Unavailability is expected on
    /// clusters without a metrics server; implementations log it once and
    /// return an error the probe treats as "no numbers".
    async fn pod_usage(&self) -> Result<Vec<PodUsage>>;

    async fn list_workloads(&self) -> Result<Vec<WorkloadSpec>>;

    /// Run a command inside a container, returning stdout.
    async fn exec(&self, pod: &str, container: &str, command: &[&str]) -> Result<String>;
}

/// Probe back-end over an [`Orchestrator`].
pub struct OrchestratorProbe {
    api: Arc<dyn Orchestrator>,
    /// Written once at init, read-only thereafter.
    metrics_enabled: bool,
}

impl OrchestratorProbe {
    /// Probe the metrics API once to decide whether numeric telemetry is
    /// available for the life of this process.
    pub async fn init(api: Arc<dyn Orchestrator>) -> Self {
        let metrics_enabled = match api.pod_usage().await {
            Ok(_) => true,
            Err(_) => {
                info!("metrics API unavailable, component telemetry will be flagged");
                false
            }
        };
        Self {
            api,
            metrics_enabled,
        }
    }

    async fn usage_by_pod(&self) -> HashMap<String, PodUsage> {
        if !self.metrics_enabled {
            return HashMap::new();
        }
        match self.api.pod_usage().await {
            Ok(usage) => usage.into_iter().map(|u| (u.pod.clone(), u)).collect(),
            // The implementation already warned (once); missing numbers are
            // classified as healthy-unknown.
            Err(_) => HashMap::new(),
        }
    }

    async fn storage_stat(&self, pod: &PodSnapshot) -> Stat {
        let container = match pod.containers.first() {
            Some(c) => c.name.clone(),
            None => return Stat::zero(),
        };
        match self
            .api
            .exec(&pod.name, &container, &["df", STORAGE_MOUNT])
            .await
        {
            Ok(stdout) => match parse_df_kblocks(&stdout, STORAGE_MOUNT) {
                Some((total_kb, used_kb)) => {
                    Stat::new((total_kb * 1024) as f64, (used_kb * 1024) as f64)
                }
                None => {
                    warn!(pod = %pod.name, "unparseable df output");
                    Stat::zero()
                }
            },
            Err(e) => {
                warn!(pod = %pod.name, error = %e, "storage probe failed");
                Stat::zero()
            }
        }
    }
}

#[async_trait]
impl ComponentProbe for OrchestratorProbe {
    async fn system_components(&self) -> Result<SystemSnapshot> {
        let pods = self.api.list_pods().await?;
        let usage = self.usage_by_pod().await;
        let workloads = self.api.list_workloads().await?;

        let mut desired: BTreeMap<String, usize> = BTreeMap::new();
        for workload in workloads {
            // Workload names match their pods' family ("broker" owns
            // "broker-0" etc.), so route through the same table.
            if let Some(family) = family_for(&format!("{}-0", workload.name))
                .or_else(|| family_for(&workload.name))
            {
                desired.insert(family.to_string(), workload.desired_replicas);
            }
        }

        let mut probed = Vec::new();
        for pod in pods.iter().filter(|p| p.is_running()) {
            let Some(family) = family_for(&pod.name) else {
                continue;
            };

            let (cpu, memory) = match usage.get(&pod.name) {
                Some(u) => (
                    Stat::new(pod.cpu_request_millis() as f64, u.cpu_used_millis as f64),
                    Stat::new(pod.memory_limit_bytes() as f64, u.memory_used_bytes as f64),
                ),
                None => (Stat::zero(), Stat::zero()),
            };
            let storage = if is_storage_bearing(family) {
                self.storage_stat(pod).await
            } else {
                Stat::zero()
            };

            probed.push(ProbedComponent {
                component: classify_component(&pod.name, cpu, memory, storage),
                family,
                ports: pod.ports(),
                host: pod.node.clone(),
            });
        }

        Ok(SystemSnapshot {
            families: group_families(probed, &desired),
            metrics_enabled: self.metrics_enabled,
        })
    }

    async fn available_replicas(&self) -> Result<usize> {
        let pods = self.api.list_pods().await?;
        Ok(pods
            .iter()
            .filter(|p| p.is_running() && family_for(&p.name) == Some(FAMILY_BROKER))
            .count())
    }
}

/// Extract (total, used) 1K-block counts for `mount` from `df` output.
pub fn parse_df_kblocks(output: &str, mount: &str) -> Option<(i64, i64)> {
    for line in output.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.last() == Some(&mount) && fields.len() >= 4 {
            let total = fields[1].parse().ok()?;
            let used = fields[2].parse().ok()?;
            return Some((total, used));
        }
    }
    None
}
