//! Integration tests for the overview composers using in-memory collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use switchyard_core::{Error, Result, Stat, Status, SysComponent, ThroughputSample};
use switchyard_monitor::metadata::{
    AuditLogRecord, ConsumerRecord, InventorySnapshot, ProducerRecord, SchemaDetails,
    StationRecord, StationSummary, TagRecord,
};
use switchyard_monitor::{
    IntegrationsCache, MessageStore, MessageSummary, MetadataStore, OverviewComposer,
};
use switchyard_probe::classify::classify_component;
use switchyard_probe::family::{group_families, ProbedComponent, FAMILY_BROKER};
use switchyard_probe::{ComponentProbe, SystemSnapshot};
use switchyard_stream::reader::StreamTotals;

// ── Fakes ───────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeMetadata {
    fail_inventory: bool,
    station: Option<StationRecord>,
}

fn station(name: &str, is_native: bool, schema: Option<&str>) -> StationRecord {
    StationRecord {
        id: 7,
        name: name.to_string(),
        retention_type: "message_age_sec".to_string(),
        retention_value: 604_800,
        storage_type: "file".to_string(),
        replicas: 1,
        is_native,
        schema_name: schema.map(str::to_string),
        schema_version: schema.map(|_| 1),
        tiered_storage_enabled: true,
        dls_poison: true,
        dls_schemaverse: false,
        created_by_username: "root".to_string(),
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
}

#[async_trait]
impl MetadataStore for FakeMetadata {
    async fn inventory(&self, _tenant: &str) -> Result<InventorySnapshot> {
        if self.fail_inventory {
            return Err(Error::Metadata("X".into()));
        }
        Ok(InventorySnapshot {
            stations: vec![StationSummary {
                name: "orders".to_string(),
                created_by_username: "root".to_string(),
                created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                is_native: true,
                retention_type: "message_age_sec".to_string(),
                retention_value: 604_800,
                storage_type: "file".to_string(),
                replicas: 1,
            }],
            total_stations: 1,
            total_users: 2,
            total_schemas: 0,
        })
    }

    async fn get_station(&self, _tenant: &str, name: &str) -> Result<Option<StationRecord>> {
        Ok(self.station.clone().filter(|s| s.name == name))
    }

    async fn producers_by_station(
        &self,
        _tenant: &str,
        _station_id: i64,
    ) -> Result<Vec<ProducerRecord>> {
        Ok(vec![ProducerRecord {
            name: "live-producer".to_string(),
            is_active: true,
            created_by_username: "root".to_string(),
            created_at: Utc::now(),
        }])
    }

    async fn consumers_by_station(
        &self,
        _tenant: &str,
        _station_id: i64,
    ) -> Result<Vec<ConsumerRecord>> {
        Ok(vec![
            ConsumerRecord {
                name: "c1".to_string(),
                cg_name: "cg-live".to_string(),
                is_active: true,
                created_at: Utc::now(),
            },
            ConsumerRecord {
                name: "c2".to_string(),
                cg_name: "cg-live".to_string(),
                is_active: false,
                created_at: Utc::now(),
            },
        ])
    }

    async fn audit_logs(&self, _tenant: &str, _station_name: &str) -> Result<Vec<AuditLogRecord>> {
        Ok(vec![AuditLogRecord {
            message: "station created".to_string(),
            created_by_username: "root".to_string(),
            created_at: Utc::now(),
        }])
    }

    async fn tags_by_station(&self, _station_id: i64) -> Result<Vec<TagRecord>> {
        Ok(vec![TagRecord {
            name: "critical".to_string(),
            color: "red".to_string(),
        }])
    }

    async fn schema_details(
        &self,
        _tenant: &str,
        schema_name: &str,
    ) -> Result<Option<SchemaDetails>> {
        Ok(Some(SchemaDetails {
            name: schema_name.to_string(),
            schema_type: "json".to_string(),
            version_number: 1,
            active_version: "{}".to_string(),
        }))
    }

    async fn active_integrations(&self) -> Result<Vec<(String, String)>> {
        Ok(vec![("acme".to_string(), "s3".to_string())])
    }
}

struct FakeProbe {
    fail: Option<String>,
}

#[async_trait]
impl ComponentProbe for FakeProbe {
    async fn system_components(&self) -> Result<SystemSnapshot> {
        if let Some(msg) = &self.fail {
            return Err(Error::Orchestrator(msg.clone()));
        }
        let stat = |p: i32| Stat {
            total: 100.0,
            current: p as f64,
            percentage: p,
        };
        let probed = vec![ProbedComponent {
            component: classify_component("broker-0", stat(10), stat(10), stat(10)),
            family: FAMILY_BROKER,
            ports: vec![6666],
            host: "node-a".to_string(),
        }];
        Ok(SystemSnapshot {
            families: group_families(probed, &BTreeMap::new()),
            metrics_enabled: true,
        })
    }

    async fn available_replicas(&self) -> Result<usize> {
        Ok(1)
    }
}

struct FakeMessages {
    dls_absent: bool,
    station_absent: bool,
}

#[async_trait]
impl MessageStore for FakeMessages {
    async fn throughput_samples(&self) -> Result<Vec<ThroughputSample>> {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Ok(vec![
            ThroughputSample {
                name: "b1".to_string(),
                read_bytes_by_tenant: [("acme".to_string(), 10)].into(),
                write_bytes_by_tenant: [("acme".to_string(), 1)].into(),
                timestamp: at,
            },
            ThroughputSample {
                name: "b2".to_string(),
                read_bytes_by_tenant: [("acme".to_string(), 5)].into(),
                write_bytes_by_tenant: [("acme".to_string(), 2)].into(),
                timestamp: at,
            },
        ])
    }

    async fn account_message_total(&self) -> Result<u64> {
        Ok(123)
    }

    async fn station_totals(&self, station: &str) -> Result<StreamTotals> {
        if self.station_absent {
            return Err(Error::StreamAbsent(station.to_string()));
        }
        Ok(StreamTotals {
            messages: 4,
            bytes: 400,
            first_seq: 1,
            last_seq: 4,
        })
    }

    async fn last_messages(&self, _station: &str, count: u64) -> Result<Vec<MessageSummary>> {
        Ok((1..=4u64.min(count))
            .map(|seq| MessageSummary {
                seq,
                size: 100,
                time: Utc::now(),
            })
            .collect())
    }

    async fn dls_total(&self, station: &str) -> Result<u64> {
        if self.dls_absent {
            return Err(Error::StreamAbsent(station.to_string()));
        }
        Ok(2)
    }

    async fn placement(&self, _station: &str) -> Result<(String, Vec<String>)> {
        Ok((
            "broker-0".to_string(),
            vec!["broker-1".to_string(), "broker-2".to_string()],
        ))
    }
}

fn composer(
    metadata: FakeMetadata,
    probe: FakeProbe,
    messages: FakeMessages,
) -> OverviewComposer {
    let integrations = IntegrationsCache::new();
    integrations.load(vec![("acme".to_string(), "s3".to_string())]);
    OverviewComposer::new(
        Arc::new(metadata),
        Arc::new(probe),
        Arc::new(messages),
        Arc::new(integrations),
        3,
        true,
    )
}

fn default_messages() -> FakeMessages {
    FakeMessages {
        dls_absent: false,
        station_absent: false,
    }
}

// ── Main overview ───────────────────────────────────────────────────

#[tokio::test]
async fn main_overview_assembles_all_three_slices() {
    let composer = composer(FakeMetadata::default(), FakeProbe { fail: None }, default_messages());
    let overview = composer.main_overview("acme").await.unwrap();

    assert_eq!(overview.total_stations, 1);
    assert_eq!(overview.total_messages, 123);
    assert_eq!(overview.stations.len(), 1);
    assert!(overview.metrics_enabled);
    assert!(overview.k8s_env);

    // Throughput: total row first, of length W, summing both brokers.
    assert_eq!(overview.brokers_throughput.len(), 3);
    let total = &overview.brokers_throughput[0];
    assert_eq!(total.name, "total");
    assert_eq!(total.read.len(), 3);
    assert_eq!(total.read[0].bytes, 15);
    assert_eq!(total.write[0].bytes, 3);

    let broker = overview
        .system_components
        .iter()
        .find(|f| f.name == "broker")
        .unwrap();
    assert_eq!(broker.status, Status::Healthy);
}

#[tokio::test]
async fn main_overview_surfaces_first_error_without_partial_payload() {
    let composer = composer(
        FakeMetadata {
            fail_inventory: true,
            station: None,
        },
        FakeProbe { fail: None },
        default_messages(),
    );
    let err = composer.main_overview("acme").await.unwrap_err();
    assert_eq!(err.to_string(), "metadata store error: X");
}

#[tokio::test]
async fn main_overview_downgrades_docker_daemon_errors() {
    let composer = composer(
        FakeMetadata::default(),
        FakeProbe {
            fail: Some(
                "Cannot connect to the Docker daemon at unix:///var/run/docker.sock".to_string(),
            ),
        },
        default_messages(),
    );
    let err = composer.main_overview("acme").await.unwrap_err();
    assert!(err.is_showable());
    assert!(matches!(err, Error::EnvUnavailable(_)));
}

#[tokio::test]
async fn main_overview_is_tenant_scoped() {
    let composer = composer(FakeMetadata::default(), FakeProbe { fail: None }, default_messages());
    let overview = composer.main_overview("acme").await.unwrap();
    assert_eq!(overview.brokers_throughput[0].read[0].bytes, 15);

    // A different tenant must see zeros, not acme's bytes.
    let other = composer.main_overview("globex").await.unwrap();
    assert_eq!(other.brokers_throughput[0].read[0].bytes, 0);
}

// ── Station overview ────────────────────────────────────────────────

#[tokio::test]
async fn station_overview_native_uses_live_identities() {
    let composer = composer(
        FakeMetadata {
            fail_inventory: false,
            station: Some(station("orders", true, Some("orders-schema"))),
        },
        FakeProbe { fail: None },
        default_messages(),
    );
    let overview = composer.station_overview("acme", "orders").await.unwrap();

    assert_eq!(overview.producers[0].name, "live-producer");
    assert_eq!(overview.consumer_groups.len(), 1);
    assert_eq!(overview.consumer_groups[0].name, "cg-live");
    assert_eq!(overview.consumer_groups[0].consumers.len(), 2);
    assert_eq!(overview.total_messages, 4);
    assert_eq!(overview.avg_msg_size, 100);
    assert_eq!(overview.messages.len(), 4);
    assert_eq!(overview.dead_letter.total_messages, 2);
    assert_eq!(overview.leader, "broker-0");
    assert_eq!(overview.followers.len(), 2);
    assert_eq!(overview.schema.as_ref().unwrap().name, "orders-schema");
    assert!(overview.tiered_storage_enabled);
    assert_eq!(overview.tags[0].name, "critical");
    assert_eq!(overview.audit_logs.len(), 1);
}

#[tokio::test]
async fn station_overview_non_native_gets_preview_fixtures() {
    let composer = composer(
        FakeMetadata {
            fail_inventory: false,
            station: Some(station("raw", false, None)),
        },
        FakeProbe { fail: None },
        default_messages(),
    );
    let overview = composer.station_overview("acme", "raw").await.unwrap();

    assert!(overview.producers.iter().all(|p| p.name.starts_with("demo-")));
    assert_eq!(overview.consumer_groups[0].name, "demo-cg");
    assert!(overview.schema.is_none());
}

#[tokio::test]
async fn station_overview_unknown_station_is_showable() {
    let composer = composer(
        FakeMetadata::default(),
        FakeProbe { fail: None },
        default_messages(),
    );
    let err = composer.station_overview("acme", "nope").await.unwrap_err();
    assert!(matches!(err, Error::StationMissing(_)));
    assert!(err.is_showable());
}

#[tokio::test]
async fn station_overview_vanished_stream_reads_as_missing_station() {
    let composer = composer(
        FakeMetadata {
            fail_inventory: false,
            station: Some(station("orders", true, None)),
        },
        FakeProbe { fail: None },
        FakeMessages {
            dls_absent: false,
            station_absent: true,
        },
    );
    let err = composer.station_overview("acme", "orders").await.unwrap_err();
    assert!(matches!(err, Error::StationMissing(_)));
}

#[tokio::test]
async fn station_overview_absent_dls_stream_is_empty_summary() {
    let composer = composer(
        FakeMetadata {
            fail_inventory: false,
            station: Some(station("orders", true, None)),
        },
        FakeProbe { fail: None },
        FakeMessages {
            dls_absent: true,
            station_absent: false,
        },
    );
    let overview = composer.station_overview("acme", "orders").await.unwrap();
    assert_eq!(overview.dead_letter.total_messages, 0);
}

#[tokio::test]
async fn station_overview_tiered_storage_needs_integration() {
    // Station flag set, but the tenant has no s3 integration connected.
    let integrations = IntegrationsCache::new();
    let composer = OverviewComposer::new(
        Arc::new(FakeMetadata {
            fail_inventory: false,
            station: Some(station("orders", true, None)),
        }),
        Arc::new(FakeProbe { fail: None }),
        Arc::new(default_messages()),
        Arc::new(integrations),
        3,
        false,
    );
    let overview = composer.station_overview("acme", "orders").await.unwrap();
    assert!(!overview.tiered_storage_enabled);
}
