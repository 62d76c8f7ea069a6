//! Collaborator wiring: connect once at startup, hand read-only interfaces
//! to the core.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use switchyard_core::Config;
use switchyard_monitor::{
    BrokerMessageStore, IntegrationsCache, MetadataStore, OverviewComposer,
};
use switchyard_probe::{ComponentProbe, K8sApi, LocalProbe, OrchestratorProbe};
use switchyard_stream::{LogQuery, StreamReader};

use crate::auth::SessionVerifier;
use crate::db::{init_pg_pool, PgMetadataStore};
use crate::state::AppState;

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let nats = async_nats::connect(&config.broker.url)
        .await
        .with_context(|| format!("connecting to broker at {}", config.broker.url))?;
    let reader = StreamReader::new(nats);
    let logs = LogQuery::new(reader.clone());
    let messages = Arc::new(BrokerMessageStore::new(reader));

    let pool = init_pg_pool(&config.metadata_db).await?;
    let metadata: Arc<dyn MetadataStore> = Arc::new(PgMetadataStore::new(pool));

    let integrations = Arc::new(IntegrationsCache::new());
    integrations.load(
        metadata
            .active_integrations()
            .await
            .context("seeding integrations cache")?,
    );

    let use_orchestrator = config.environment.use_orchestrator();
    let probe: Arc<dyn ComponentProbe> = if use_orchestrator {
        let api = Arc::new(
            K8sApi::in_cluster(&config.environment.k8s_namespace)
                .context("initialising orchestrator client")?,
        );
        info!(namespace = %config.environment.k8s_namespace, "probing via orchestrator API");
        Arc::new(OrchestratorProbe::init(api).await)
    } else {
        info!("probing the local process");
        Arc::new(LocalProbe::new())
    };

    let composer = OverviewComposer::new(
        metadata,
        Arc::clone(&probe),
        messages,
        integrations,
        config.ws_updates_interval_sec as usize,
        use_orchestrator,
    );

    Ok(Arc::new(AppState {
        composer,
        logs,
        probe,
        auth: SessionVerifier::new(&config.server.jwt_secret),
    }))
}
