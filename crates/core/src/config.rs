use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Well-known internal streams ───────────────────────────────

/// Stream carrying per-broker 1-sample-per-second throughput records.
pub const THROUGHPUT_STREAM: &str = "switchyard-throughput";

/// Stream carrying system log records, one subject per (source, level).
pub const SYSLOG_STREAM: &str = "switchyard-syslogs";

/// First token of every syslog subject.
pub const SYSLOG_SUBJECT_PREFIX: &str = "syslogs";

/// Station names may contain '.', which is a subject delimiter.
pub fn station_stream_name(station: &str) -> String {
    station.replace('.', "#")
}

/// Dead-letter side-channel stream for a station.
pub fn dls_stream_name(station: &str) -> String {
    format!("switchyard-dls-{}", station_stream_name(station))
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub environment: EnvironmentConfig,
    pub broker: BrokerConfig,
    pub retention: RetentionConfig,
    pub metadata_db: MetadataDbConfig,
    /// Length of the aligned throughput time-axis (`W`), in seconds.
    pub ws_updates_interval_sec: u32,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            environment: EnvironmentConfig::from_env(),
            broker: BrokerConfig::from_env(),
            retention: RetentionConfig::from_env(),
            metadata_db: MetadataDbConfig::from_env(),
            ws_updates_interval_sec: env_u32("WS_UPDATES_INTERVAL_SEC", 15),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:      port={}", self.server.port);
        tracing::info!(
            "  environment: dev={}, local_cluster={}, docker={}, namespace={}",
            self.environment.dev_env,
            self.environment.local_cluster_env,
            self.environment.docker_env,
            self.environment.k8s_namespace
        );
        tracing::info!("  broker:      url={}", self.broker.url);
        tracing::info!(
            "  metadata_db: host={}, db={}, tls={}",
            self.metadata_db.host,
            self.metadata_db.name,
            self.metadata_db.tls_enabled
        );
        tracing::info!(
            "  retention:   logs={}d, poison={}h, tiered_storage={}s",
            self.retention.logs_retention_days,
            self.retention.poison_msgs_retention_hours,
            self.retention.tiered_storage_time_sec
        );
        tracing::info!("  window:      W={}s", self.ws_updates_interval_sec);
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// HS256 secret for session cookies.
    pub jwt_secret: String,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_u16("HTTP_PORT", 9000),
            cors_origin: env_or("CORS_ORIGIN", "*"),
            jwt_secret: env_or("JWT_SECRET", ""),
        }
    }
}

// ── Environment ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub dev_env: bool,
    pub local_cluster_env: bool,
    pub docker_env: bool,
    pub k8s_namespace: String,
}

impl EnvironmentConfig {
    fn from_env() -> Self {
        Self {
            dev_env: env_bool("DEV_ENV", false),
            local_cluster_env: env_bool("LOCAL_CLUSTER_ENV", false),
            docker_env: env_bool("DOCKER_ENV", false),
            k8s_namespace: env_or("K8S_NAMESPACE", "switchyard"),
        }
    }

    /// Whether replica telemetry should come from the orchestrator API.
    /// Local clusters and docker-compose deployments probe the local process.
    pub fn use_orchestrator(&self) -> bool {
        !self.dev_env && !self.local_cluster_env && !self.docker_env
    }
}

// ── Broker (message store) ────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// NATS URL of the broker's client port.
    pub url: String,
}

impl BrokerConfig {
    fn from_env() -> Self {
        Self {
            url: env_or("BROKER_URL", "nats://localhost:6666"),
        }
    }
}

// ── Retention ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub logs_retention_days: u32,
    pub poison_msgs_retention_hours: u32,
    pub tiered_storage_time_sec: u32,
}

impl RetentionConfig {
    fn from_env() -> Self {
        Self {
            logs_retention_days: env_u32("LOGS_RETENTION_DAYS", 30),
            poison_msgs_retention_hours: env_u32("POISON_MSGS_RETENTION_HOURS", 168),
            tiered_storage_time_sec: env_u32("TIERED_STORAGE_TIME_SEC", 8),
        }
    }
}

// ── Metadata store ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub name: String,
    pub tls_enabled: bool,
    pub tls_key: Option<String>,
    pub tls_crt: Option<String>,
    pub tls_ca: Option<String>,
    pub max_connections: u32,
}

impl MetadataDbConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("METADATA_DB_HOST", "localhost"),
            port: env_u16("METADATA_DB_PORT", 5432),
            user: env_or("METADATA_DB_USER", "switchyard"),
            pass: env_or("METADATA_DB_PASS", ""),
            name: env_or("METADATA_DB_NAME", "switchyard"),
            tls_enabled: env_bool("METADATA_DB_TLS_ENABLED", false),
            tls_key: env_opt("METADATA_DB_TLS_KEY"),
            tls_crt: env_opt("METADATA_DB_TLS_CRT"),
            tls_ca: env_opt("METADATA_DB_TLS_CA"),
            max_connections: env_u32("METADATA_DB_MAX_CONNECTIONS", 10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_stream_name_replaces_dots() {
        assert_eq!(station_stream_name("orders.eu"), "orders#eu");
        assert_eq!(station_stream_name("plain"), "plain");
    }

    #[test]
    fn test_dls_stream_name() {
        assert_eq!(dls_stream_name("orders.eu"), "switchyard-dls-orders#eu");
    }
}
