//! Per-station overview: a sequential chain of scoped sub-queries.

use std::collections::BTreeMap;

use serde::Serialize;

use switchyard_core::{Error, Result};

use crate::integrations::TIERED_STORAGE_INTEGRATION;
use crate::message_store::MessageSummary;
use crate::metadata::{
    AuditLogRecord, ConsumerRecord, ProducerRecord, SchemaDetails, StationRecord, TagRecord,
};
use crate::overview::OverviewComposer;
use crate::preview;

/// How many stored messages the overview digests.
const OVERVIEW_MESSAGE_COUNT: u64 = 1000;

/// One consumer group with its member consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumerGroupView {
    pub name: String,
    pub is_active: bool,
    pub consumers: Vec<ConsumerRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DlsSummary {
    pub total_messages: u64,
}

/// Composite payload behind `getStationOverviewData`.
#[derive(Debug, Clone, Serialize)]
pub struct StationOverviewResponse {
    pub station: StationRecord,
    pub producers: Vec<ProducerRecord>,
    pub consumer_groups: Vec<ConsumerGroupView>,
    pub audit_logs: Vec<AuditLogRecord>,
    pub total_messages: u64,
    pub avg_msg_size: u64,
    pub messages: Vec<MessageSummary>,
    pub dead_letter: DlsSummary,
    pub tags: Vec<TagRecord>,
    pub leader: String,
    pub followers: Vec<String>,
    pub schema: Option<SchemaDetails>,
    pub tiered_storage_enabled: bool,
}

impl OverviewComposer {
    /// Assemble the station overview. Each step depends only on the station
    /// identity and tenant, so the chain is sequential.
    pub async fn station_overview(
        &self,
        tenant: &str,
        station_name: &str,
    ) -> Result<StationOverviewResponse> {
        let station = self
            .metadata
            .get_station(tenant, station_name)
            .await?
            .ok_or_else(|| Error::StationMissing(station_name.to_string()))?;

        let (producers, consumer_groups) = if station.is_native {
            let producers = self
                .metadata
                .producers_by_station(tenant, station.id)
                .await?;
            let consumers = self
                .metadata
                .consumers_by_station(tenant, station.id)
                .await?;
            (producers, group_consumers(consumers))
        } else {
            (preview::preview_producers(), preview::preview_consumer_groups())
        };

        let audit_logs = self.metadata.audit_logs(tenant, station_name).await?;

        let totals = self
            .messages
            .station_totals(station_name)
            .await
            .map_err(|e| missing_station(e, station_name))?;
        let avg_msg_size = if totals.messages > 0 {
            totals.bytes / totals.messages
        } else {
            0
        };
        let messages = self
            .messages
            .last_messages(station_name, OVERVIEW_MESSAGE_COUNT)
            .await
            .map_err(|e| missing_station(e, station_name))?;

        // The dead-letter stream is created lazily; its absence means no
        // poison messages yet.
        let dead_letter = match self.messages.dls_total(station_name).await {
            Ok(total_messages) => DlsSummary { total_messages },
            Err(Error::StreamAbsent(_)) => DlsSummary { total_messages: 0 },
            Err(e) => return Err(e),
        };

        let tags = self.metadata.tags_by_station(station.id).await?;

        let (leader, followers) = self
            .messages
            .placement(station_name)
            .await
            .map_err(|e| missing_station(e, station_name))?;

        let schema = match &station.schema_name {
            Some(name) => self.metadata.schema_details(tenant, name).await?,
            None => None,
        };

        let tiered_storage_enabled = station.tiered_storage_enabled
            && self
                .integrations
                .has(tenant, TIERED_STORAGE_INTEGRATION);

        Ok(StationOverviewResponse {
            station,
            producers,
            consumer_groups,
            audit_logs,
            total_messages: totals.messages,
            avg_msg_size,
            messages,
            dead_letter,
            tags,
            leader,
            followers,
            schema,
            tiered_storage_enabled,
        })
    }
}

/// A vanished station stream means the station itself is gone.
fn missing_station(err: Error, station_name: &str) -> Error {
    match err {
        Error::StreamAbsent(_) => Error::StationMissing(station_name.to_string()),
        other => other,
    }
}

/// Group flat consumer rows into their named groups; a group is active when
/// any member is.
fn group_consumers(consumers: Vec<ConsumerRecord>) -> Vec<ConsumerGroupView> {
    let mut groups: BTreeMap<String, Vec<ConsumerRecord>> = BTreeMap::new();
    for consumer in consumers {
        groups
            .entry(consumer.cg_name.clone())
            .or_default()
            .push(consumer);
    }
    groups
        .into_iter()
        .map(|(name, consumers)| ConsumerGroupView {
            is_active: consumers.iter().any(|c| c.is_active),
            name,
            consumers,
        })
        .collect()
}
