mod api;
mod auth;
mod db;
mod router;
mod startup;
mod state;

use tracing::{info, warn};

use switchyard_core::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    switchyard_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    config.log_summary();
    if config.server.jwt_secret.is_empty() {
        warn!("JWT_SECRET is empty, no session will verify");
    }

    let state = startup::build_state(&config).await?;
    let app = router::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("monitoring API listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
