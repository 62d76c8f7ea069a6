pub mod classify;
pub mod family;
pub mod k8s;
pub mod local;
pub mod orchestrator;

use async_trait::async_trait;

use switchyard_core::{ComponentFamily, Result};

pub use k8s::K8sApi;
pub use local::LocalProbe;
pub use orchestrator::{Orchestrator, OrchestratorProbe};

/// Replica telemetry for the whole deployment, family-grouped.
#[derive(Debug, Clone)]
pub struct SystemSnapshot {
    pub families: Vec<ComponentFamily>,
    pub metrics_enabled: bool,
}

/// Per-replica CPU/memory/storage collection. Exactly one back-end is active
/// per process, selected at initialisation.
#[async_trait]
pub trait ComponentProbe: Send + Sync {
    /// Collect, classify, and family-group every running replica.
    async fn system_components(&self) -> Result<SystemSnapshot>;

    /// Number of broker replicas currently available.
    async fn available_replicas(&self) -> Result<usize>;
}
