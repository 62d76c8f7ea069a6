//! The slice of the relational metadata store the monitoring core consumes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use switchyard_core::Result;

/// Station row as shown on the main overview.
#[derive(Debug, Clone, Serialize)]
pub struct StationSummary {
    pub name: String,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
    pub is_native: bool,
    pub retention_type: String,
    pub retention_value: i32,
    pub storage_type: String,
    pub replicas: i32,
}

/// Inventory slice of the main overview: stations plus aggregate counters.
#[derive(Debug, Clone, Serialize)]
pub struct InventorySnapshot {
    pub stations: Vec<StationSummary>,
    pub total_stations: i64,
    pub total_users: i64,
    pub total_schemas: i64,
}

/// Full station row as the station overview needs it.
#[derive(Debug, Clone, Serialize)]
pub struct StationRecord {
    pub id: i64,
    pub name: String,
    pub retention_type: String,
    pub retention_value: i32,
    pub storage_type: String,
    pub replicas: i32,
    pub is_native: bool,
    pub schema_name: Option<String>,
    pub schema_version: Option<i32>,
    pub tiered_storage_enabled: bool,
    pub dls_poison: bool,
    pub dls_schemaverse: bool,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProducerRecord {
    pub name: String,
    pub is_active: bool,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsumerRecord {
    pub name: String,
    pub cg_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogRecord {
    pub message: String,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagRecord {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaDetails {
    pub name: String,
    pub schema_type: String,
    pub version_number: i32,
    pub active_version: String,
}

/// Read-only metadata-store surface. The Postgres implementation lives with
/// the server wiring; tests use in-memory fakes.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Stations and aggregate counters for one tenant.
    async fn inventory(&self, tenant: &str) -> Result<InventorySnapshot>;

    async fn get_station(&self, tenant: &str, name: &str) -> Result<Option<StationRecord>>;

    async fn producers_by_station(&self, tenant: &str, station_id: i64)
        -> Result<Vec<ProducerRecord>>;

    async fn consumers_by_station(&self, tenant: &str, station_id: i64)
        -> Result<Vec<ConsumerRecord>>;

    async fn audit_logs(&self, tenant: &str, station_name: &str) -> Result<Vec<AuditLogRecord>>;

    async fn tags_by_station(&self, station_id: i64) -> Result<Vec<TagRecord>>;

    async fn schema_details(&self, tenant: &str, schema_name: &str)
        -> Result<Option<SchemaDetails>>;

    /// All `(tenant, integration)` pairs, for seeding the integrations cache.
    async fn active_integrations(&self) -> Result<Vec<(String, String)>>;
}
