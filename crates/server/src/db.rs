//! Postgres metadata store: pool init, migrations, and the read queries the
//! monitoring core consumes.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, Row};
use tracing::info;

use switchyard_core::config::MetadataDbConfig;
use switchyard_core::{Error, Result};
use switchyard_monitor::metadata::{
    AuditLogRecord, ConsumerRecord, InventorySnapshot, ProducerRecord, SchemaDetails,
    StationRecord, StationSummary, TagRecord,
};
use switchyard_monitor::MetadataStore;

/// Create the connection pool and run migrations.
pub async fn init_pg_pool(config: &MetadataDbConfig) -> anyhow::Result<PgPool> {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.name);
    if !config.pass.is_empty() {
        options = options.password(&config.pass);
    }
    if config.tls_enabled {
        options = options.ssl_mode(PgSslMode::VerifyCa);
        if let Some(ca) = &config.tls_ca {
            options = options.ssl_root_cert(ca);
        }
        if let (Some(crt), Some(key)) = (&config.tls_crt, &config.tls_key) {
            options = options.ssl_client_cert(crt).ssl_client_key(key);
        }
    } else {
        options = options.ssl_mode(PgSslMode::Prefer);
    }

    info!(host = %config.host, db = %config.name, "connecting to metadata store");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    info!("metadata store migrations applied");
    Ok(pool)
}

fn db_err(e: sqlx::Error) -> Error {
    Error::Metadata(e.to_string())
}

pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn inventory(&self, tenant: &str) -> Result<InventorySnapshot> {
        let rows = sqlx::query(
            "SELECT name, created_by_username, created_at, is_native, retention_type, \
             retention_value, storage_type, replicas \
             FROM stations WHERE tenant_name = $1 ORDER BY created_at DESC",
        )
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut stations = Vec::with_capacity(rows.len());
        for row in rows {
            stations.push(StationSummary {
                name: row.try_get("name").map_err(db_err)?,
                created_by_username: row.try_get("created_by_username").map_err(db_err)?,
                created_at: row.try_get("created_at").map_err(db_err)?,
                is_native: row.try_get("is_native").map_err(db_err)?,
                retention_type: row.try_get("retention_type").map_err(db_err)?,
                retention_value: row.try_get("retention_value").map_err(db_err)?,
                storage_type: row.try_get("storage_type").map_err(db_err)?,
                replicas: row.try_get("replicas").map_err(db_err)?,
            });
        }
        let total_stations = stations.len() as i64;

        let total_users: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE tenant_name = $1")
            .bind(tenant)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_get("n")
            .map_err(db_err)?;

        let total_schemas: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM schemas WHERE tenant_name = $1")
                .bind(tenant)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?
                .try_get("n")
                .map_err(db_err)?;

        Ok(InventorySnapshot {
            stations,
            total_stations,
            total_users,
            total_schemas,
        })
    }

    async fn get_station(&self, tenant: &str, name: &str) -> Result<Option<StationRecord>> {
        let row = sqlx::query(
            "SELECT id, name, retention_type, retention_value, storage_type, replicas, \
             is_native, schema_name, schema_version, tiered_storage_enabled, \
             dls_poison, dls_schemaverse, created_by_username, created_at \
             FROM stations WHERE tenant_name = $1 AND name = $2",
        )
        .bind(tenant)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StationRecord {
            id: row.try_get("id").map_err(db_err)?,
            name: row.try_get("name").map_err(db_err)?,
            retention_type: row.try_get("retention_type").map_err(db_err)?,
            retention_value: row.try_get("retention_value").map_err(db_err)?,
            storage_type: row.try_get("storage_type").map_err(db_err)?,
            replicas: row.try_get("replicas").map_err(db_err)?,
            is_native: row.try_get("is_native").map_err(db_err)?,
            schema_name: row.try_get("schema_name").map_err(db_err)?,
            schema_version: row.try_get("schema_version").map_err(db_err)?,
            tiered_storage_enabled: row.try_get("tiered_storage_enabled").map_err(db_err)?,
            dls_poison: row.try_get("dls_poison").map_err(db_err)?,
            dls_schemaverse: row.try_get("dls_schemaverse").map_err(db_err)?,
            created_by_username: row.try_get("created_by_username").map_err(db_err)?,
            created_at: row.try_get("created_at").map_err(db_err)?,
        }))
    }

    async fn producers_by_station(
        &self,
        tenant: &str,
        station_id: i64,
    ) -> Result<Vec<ProducerRecord>> {
        let rows = sqlx::query(
            "SELECT name, is_active, created_by_username, created_at \
             FROM producers WHERE tenant_name = $1 AND station_id = $2 \
             ORDER BY created_at DESC",
        )
        .bind(tenant)
        .bind(station_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(ProducerRecord {
                    name: row.try_get("name").map_err(db_err)?,
                    is_active: row.try_get("is_active").map_err(db_err)?,
                    created_by_username: row.try_get("created_by_username").map_err(db_err)?,
                    created_at: row.try_get("created_at").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn consumers_by_station(
        &self,
        tenant: &str,
        station_id: i64,
    ) -> Result<Vec<ConsumerRecord>> {
        let rows = sqlx::query(
            "SELECT name, cg_name, is_active, created_at \
             FROM consumers WHERE tenant_name = $1 AND station_id = $2 \
             ORDER BY created_at DESC",
        )
        .bind(tenant)
        .bind(station_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(ConsumerRecord {
                    name: row.try_get("name").map_err(db_err)?,
                    cg_name: row.try_get("cg_name").map_err(db_err)?,
                    is_active: row.try_get("is_active").map_err(db_err)?,
                    created_at: row.try_get("created_at").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn audit_logs(&self, tenant: &str, station_name: &str) -> Result<Vec<AuditLogRecord>> {
        let rows = sqlx::query(
            "SELECT message, created_by_username, created_at \
             FROM audit_logs WHERE tenant_name = $1 AND station_name = $2 \
             ORDER BY created_at DESC LIMIT 100",
        )
        .bind(tenant)
        .bind(station_name)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(AuditLogRecord {
                    message: row.try_get("message").map_err(db_err)?,
                    created_by_username: row.try_get("created_by_username").map_err(db_err)?,
                    created_at: row.try_get("created_at").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn tags_by_station(&self, station_id: i64) -> Result<Vec<TagRecord>> {
        let rows = sqlx::query(
            "SELECT t.name, t.color FROM tags t \
             JOIN station_tags st ON st.tag_id = t.id \
             WHERE st.station_id = $1 ORDER BY t.name",
        )
        .bind(station_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(TagRecord {
                    name: row.try_get("name").map_err(db_err)?,
                    color: row.try_get("color").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn schema_details(
        &self,
        tenant: &str,
        schema_name: &str,
    ) -> Result<Option<SchemaDetails>> {
        let row = sqlx::query(
            "SELECT s.name, s.schema_type, v.version_number, v.schema_content \
             FROM schemas s \
             JOIN schema_versions v ON v.schema_id = s.id AND v.active \
             WHERE s.tenant_name = $1 AND s.name = $2",
        )
        .bind(tenant)
        .bind(schema_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(SchemaDetails {
            name: row.try_get("name").map_err(db_err)?,
            schema_type: row.try_get("schema_type").map_err(db_err)?,
            version_number: row.try_get("version_number").map_err(db_err)?,
            active_version: row.try_get("schema_content").map_err(db_err)?,
        }))
    }

    async fn active_integrations(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT tenant_name, name FROM integrations")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                Ok((
                    row.try_get("tenant_name").map_err(db_err)?,
                    row.try_get("name").map_err(db_err)?,
                ))
            })
            .collect()
    }
}
