//! The message-store surface the composers consume, implemented over the
//! stream layer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use switchyard_core::config::{dls_stream_name, station_stream_name, THROUGHPUT_STREAM};
use switchyard_core::{Result, ThroughputSample};
use switchyard_stream::reader::{ReadMode, StreamReader, StreamTotals};

/// Bound on the throughput-window read; the stream holds ~W seconds.
const THROUGHPUT_FETCH_TIMEOUT: Duration = Duration::from_millis(300);

/// Bound on the last-N message read for the station overview.
const MESSAGES_FETCH_TIMEOUT: Duration = Duration::from_millis(500);

/// Stored-message digest shown on the station overview.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub seq: u64,
    pub size: usize,
    pub time: DateTime<Utc>,
}

/// Read-only message-store queries needed by the overview composers.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Every retained throughput sample, decoded.
    async fn throughput_samples(&self) -> Result<Vec<ThroughputSample>>;

    /// Total retained messages across user streams.
    async fn account_message_total(&self) -> Result<u64>;

    async fn station_totals(&self, station: &str) -> Result<StreamTotals>;

    /// Newest `count` stored messages of a station, ascending by sequence.
    async fn last_messages(&self, station: &str, count: u64) -> Result<Vec<MessageSummary>>;

    /// Retained message count on the station's dead-letter stream.
    async fn dls_total(&self, station: &str) -> Result<u64>;

    /// Leader and followers of the station's placement group.
    async fn placement(&self, station: &str) -> Result<(String, Vec<String>)>;
}

/// [`MessageStore`] over JetStream via [`StreamReader`].
#[derive(Clone)]
pub struct BrokerMessageStore {
    reader: StreamReader,
}

impl BrokerMessageStore {
    pub fn new(reader: StreamReader) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl MessageStore for BrokerMessageStore {
    async fn throughput_samples(&self) -> Result<Vec<ThroughputSample>> {
        let records = self
            .reader
            .read_recent(
                THROUGHPUT_STREAM,
                u64::MAX,
                THROUGHPUT_FETCH_TIMEOUT,
                ReadMode::All,
                None,
            )
            .await?;
        let mut samples = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::from_slice::<ThroughputSample>(&record.payload) {
                Ok(sample) => samples.push(sample),
                Err(e) => warn!(seq = record.seq, error = %e, "undecodable throughput sample"),
            }
        }
        Ok(samples)
    }

    async fn account_message_total(&self) -> Result<u64> {
        self.reader.account_message_total().await
    }

    async fn station_totals(&self, station: &str) -> Result<StreamTotals> {
        self.reader
            .stream_totals(&station_stream_name(station))
            .await
    }

    async fn last_messages(&self, station: &str, count: u64) -> Result<Vec<MessageSummary>> {
        let records = self
            .reader
            .read_recent(
                &station_stream_name(station),
                count,
                MESSAGES_FETCH_TIMEOUT,
                ReadMode::TailLastN,
                None,
            )
            .await?;
        Ok(records
            .into_iter()
            .map(|r| MessageSummary {
                seq: r.seq,
                size: r.payload.len(),
                time: r.time,
            })
            .collect())
    }

    async fn dls_total(&self, station: &str) -> Result<u64> {
        let totals = self.reader.stream_totals(&dls_stream_name(station)).await?;
        Ok(totals.messages)
    }

    async fn placement(&self, station: &str) -> Result<(String, Vec<String>)> {
        self.reader
            .stream_placement(&station_stream_name(station))
            .await
    }
}
