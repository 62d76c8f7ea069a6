use std::sync::Arc;

use switchyard_monitor::OverviewComposer;
use switchyard_probe::ComponentProbe;
use switchyard_stream::LogQuery;

use crate::auth::SessionVerifier;

pub struct AppState {
    pub composer: OverviewComposer,
    pub logs: LogQuery,
    pub probe: Arc<dyn ComponentProbe>,
    pub auth: SessionVerifier,
}
