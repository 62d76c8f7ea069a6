//! Main-overview composition: three concurrent sub-queries, one response.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use switchyard_core::{AlignedSeries, ComponentFamily, Error, Result};
use switchyard_probe::{ComponentProbe, SystemSnapshot};
use switchyard_stream::throughput::aggregate;

use crate::integrations::IntegrationsCache;
use crate::message_store::MessageStore;
use crate::metadata::{InventorySnapshot, MetadataStore, StationSummary};

/// Composite payload behind `getMainOverviewData`.
#[derive(Debug, Clone, Serialize)]
pub struct MainOverview {
    pub total_stations: i64,
    pub total_messages: u64,
    pub total_users: i64,
    pub total_schemas: i64,
    pub stations: Vec<StationSummary>,
    pub system_components: Vec<ComponentFamily>,
    pub metrics_enabled: bool,
    pub brokers_throughput: Vec<AlignedSeries>,
    pub k8s_env: bool,
}

/// Shared accumulator for the fan-out. All three tasks write here; the first
/// error wins and the composite is only assembled when no task failed.
#[derive(Default)]
struct Accumulator {
    inventory: Option<InventorySnapshot>,
    components: Option<SystemSnapshot>,
    throughput: Option<(Vec<AlignedSeries>, u64)>,
    first_error: Option<Error>,
}

impl Accumulator {
    fn record_error(&mut self, err: Error) {
        if self.first_error.is_none() {
            self.first_error = Some(err.downgrade_environmental());
        }
    }
}

/// Assembles the operator-dashboard payloads from its collaborators.
pub struct OverviewComposer {
    pub(crate) metadata: Arc<dyn MetadataStore>,
    pub(crate) probe: Arc<dyn ComponentProbe>,
    pub(crate) messages: Arc<dyn MessageStore>,
    pub(crate) integrations: Arc<IntegrationsCache>,
    /// Aligned throughput axis length (`W`).
    pub(crate) window: usize,
    pub(crate) k8s_env: bool,
}

impl OverviewComposer {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        probe: Arc<dyn ComponentProbe>,
        messages: Arc<dyn MessageStore>,
        integrations: Arc<IntegrationsCache>,
        window: usize,
        k8s_env: bool,
    ) -> Self {
        Self {
            metadata,
            probe,
            messages,
            integrations,
            window,
            k8s_env,
        }
    }

    /// Run the inventory, component, and throughput sub-queries concurrently
    /// and assemble the composite. Any sub-query failure fails the whole
    /// request; there is no partial payload.
    pub async fn main_overview(&self, tenant: &str) -> Result<MainOverview> {
        let acc = Arc::new(Mutex::new(Accumulator::default()));

        let inventory_task = {
            let acc = Arc::clone(&acc);
            let metadata = Arc::clone(&self.metadata);
            let tenant = tenant.to_string();
            tokio::spawn(async move {
                let result = metadata.inventory(&tenant).await;
                let mut guard = acc.lock().await;
                match result {
                    Ok(snapshot) => guard.inventory = Some(snapshot),
                    Err(e) => guard.record_error(e),
                }
            })
        };

        let components_task = {
            let acc = Arc::clone(&acc);
            let probe = Arc::clone(&self.probe);
            tokio::spawn(async move {
                let result = probe.system_components().await;
                let mut guard = acc.lock().await;
                match result {
                    Ok(snapshot) => guard.components = Some(snapshot),
                    Err(e) => guard.record_error(e),
                }
            })
        };

        let throughput_task = {
            let acc = Arc::clone(&acc);
            let messages = Arc::clone(&self.messages);
            let tenant = tenant.to_string();
            let window = self.window;
            tokio::spawn(async move {
                let result = async {
                    let samples = messages.throughput_samples().await?;
                    let total = messages.account_message_total().await?;
                    Ok::<_, Error>((aggregate(samples, &tenant, window), total))
                }
                .await;
                let mut guard = acc.lock().await;
                match result {
                    Ok(value) => guard.throughput = Some(value),
                    Err(e) => guard.record_error(e),
                }
            })
        };

        for handle in [inventory_task, components_task, throughput_task] {
            if handle.await.is_err() {
                acc.lock()
                    .await
                    .record_error(Error::Internal("overview task panicked".into()));
            }
        }

        let mut guard = acc.lock().await;
        if let Some(err) = guard.first_error.take() {
            return Err(err);
        }
        let (inventory, components, (brokers_throughput, total_messages)) = match (
            guard.inventory.take(),
            guard.components.take(),
            guard.throughput.take(),
        ) {
            (Some(i), Some(c), Some(t)) => (i, c, t),
            _ => return Err(Error::Internal("overview fan-out left gaps".into())),
        };

        Ok(MainOverview {
            total_stations: inventory.total_stations,
            total_messages,
            total_users: inventory.total_users,
            total_schemas: inventory.total_schemas,
            stations: inventory.stations,
            system_components: components.families,
            metrics_enabled: components.metrics_enabled,
            brokers_throughput,
            k8s_env: self.k8s_env,
        })
    }
}
