//! Ephemeral "read the last N messages within T ms" primitive.
//!
//! Each read creates a short-lived pull consumer on the target stream, drains
//! up to N deliveries under a wall-clock deadline, and tears the consumer down
//! on every exit path. Hitting the deadline is not an error: callers get
//! whatever arrived.

use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::consumer::{pull, AckPolicy, DeliverPolicy};
use async_nats::jetstream::context::GetStreamErrorKind;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::{error, warn};
use uuid::Uuid;

use switchyard_core::{Error, Result};

/// Grace before deleting a drained consumer, so late inflight acks land
/// without error.
const CONSUMER_DELETE_GRACE: Duration = Duration::from_millis(500);

/// Start-sequence selection for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Everything currently retained, oldest first.
    All,
    /// The newest `want_n` messages.
    TailLastN,
    /// `want_n` messages ending at a known sequence (pagination).
    FromSeqBack { last_known_seq: u64 },
}

/// Raw record handed back to callers; payload bytes are untouched.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub seq: u64,
    pub subject: String,
    pub payload: Bytes,
    pub time: DateTime<Utc>,
}

/// Counters snapshot of a stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamTotals {
    pub messages: u64,
    pub bytes: u64,
    pub first_seq: u64,
    pub last_seq: u64,
}

/// Resolved read window: how many messages, starting where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPlan {
    pub want: u64,
    pub start_seq: u64,
}

/// Resolve the start sequence and message count for a read.
///
/// `want_n` is always capped by the stream's current message count, and the
/// start sequence is clamped to 1 where the subtraction would wrap.
pub fn plan_read(mode: ReadMode, want_n: u64, totals: &StreamTotals) -> ReadPlan {
    let want = want_n.min(totals.messages);
    match mode {
        ReadMode::All => ReadPlan {
            want: totals.messages,
            start_seq: totals.first_seq.max(1),
        },
        ReadMode::TailLastN => ReadPlan {
            want,
            start_seq: (totals.last_seq.saturating_sub(want) + 1).max(1),
        },
        ReadMode::FromSeqBack { last_known_seq } => {
            if want >= last_known_seq {
                ReadPlan {
                    want: last_known_seq,
                    start_seq: 1,
                }
            } else {
                ReadPlan {
                    want,
                    start_seq: (last_known_seq.saturating_sub(want) + 1).max(1),
                }
            }
        }
    }
}

/// JetStream-backed reader. Cheap to clone; sessions are per-call.
#[derive(Clone)]
pub struct StreamReader {
    context: jetstream::Context,
}

impl StreamReader {
    pub fn new(client: async_nats::Client) -> Self {
        Self {
            context: jetstream::new(client),
        }
    }

    /// Message/byte/sequence counters of a stream.
    pub async fn stream_totals(&self, stream: &str) -> Result<StreamTotals> {
        let mut handle = self.get_stream(stream).await?;
        let info = handle
            .info()
            .await
            .map_err(|e| Error::Stream(format!("stream info for {stream}: {e}")))?;
        Ok(StreamTotals {
            messages: info.state.messages,
            bytes: info.state.bytes,
            first_seq: info.state.first_sequence,
            last_seq: info.state.last_sequence,
        })
    }

    /// Sum of retained messages across all non-internal streams.
    pub async fn account_message_total(&self) -> Result<u64> {
        let mut names = self.context.streams();
        let mut total: u64 = 0;
        while let Some(info) = names.next().await {
            let info = info.map_err(|e| Error::Stream(format!("list streams: {e}")))?;
            if !info.config.name.starts_with("switchyard-") {
                total += info.state.messages;
            }
        }
        Ok(total)
    }

    /// Leader and follower node names of a stream's placement group.
    pub async fn stream_placement(&self, stream: &str) -> Result<(String, Vec<String>)> {
        let mut handle = self.get_stream(stream).await?;
        let info = handle
            .info()
            .await
            .map_err(|e| Error::Stream(format!("stream info for {stream}: {e}")))?;
        match &info.cluster {
            Some(cluster) => {
                let mut followers: Vec<String> =
                    cluster.replicas.iter().map(|r| r.name.clone()).collect();
                followers.sort();
                Ok((cluster.leader.clone().unwrap_or_default(), followers))
            }
            None => Ok((String::new(), Vec::new())),
        }
    }

    /// Read up to `want_n` recent messages from `stream` within `timeout`.
    ///
    /// A one-shot durable consumer is created with an explicit ack policy and
    /// a session-unique name, drained, and scheduled for deletion after a
    /// short grace on every path past creation.
    pub async fn read_recent(
        &self,
        stream: &str,
        want_n: u64,
        timeout: Duration,
        mode: ReadMode,
        filter: Option<String>,
    ) -> Result<Vec<RawRecord>> {
        let totals = self.stream_totals(stream).await?;
        let plan = plan_read(mode, want_n, &totals);
        if plan.want == 0 {
            return Ok(Vec::new());
        }

        let handle = self.get_stream(stream).await?;
        let consumer_name = format!("monitor-{}", Uuid::new_v4());
        let consumer = handle
            .create_consumer(pull::Config {
                durable_name: Some(consumer_name.clone()),
                deliver_policy: DeliverPolicy::ByStartSequence {
                    start_sequence: plan.start_seq,
                },
                ack_policy: AckPolicy::Explicit,
                filter_subject: filter.unwrap_or_default(),
                num_replicas: 1,
                ..Default::default()
            })
            .await
            .map_err(|e| Error::Stream(format!("create consumer on {stream}: {e}")))?;

        // From here on the consumer exists; deletion is scheduled no matter
        // how the drain ends.
        let result = self.drain(&consumer, plan.want, timeout).await;
        self.schedule_consumer_delete(stream, consumer_name);
        result
    }

    async fn drain(
        &self,
        consumer: &jetstream::consumer::Consumer<pull::Config>,
        want: u64,
        timeout: Duration,
    ) -> Result<Vec<RawRecord>> {
        let mut batch = consumer
            .fetch()
            .max_messages(want as usize)
            .expires(timeout)
            .messages()
            .await
            .map_err(|e| Error::Stream(format!("batch request: {e}")))?;

        let mut records = Vec::with_capacity(want as usize);
        // The fetch expiry is the single timer bounding this read; the outer
        // timeout only guards against a wedged transport.
        let drain_all = async {
            while let Some(delivery) = batch.next().await {
                let message = match delivery {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(error = %e, "stream delivery failed mid-batch");
                        break;
                    }
                };
                let (seq, time) = match message.info() {
                    Ok(info) => {
                        let nanos = info.published.unix_timestamp_nanos();
                        (
                            info.stream_sequence,
                            DateTime::from_timestamp_nanos(nanos as i64),
                        )
                    }
                    Err(e) => {
                        error!(error = %e, "malformed delivery metadata, skipping record");
                        continue;
                    }
                };
                if let Err(e) = message.ack().await {
                    warn!(seq, error = %e, "ack failed");
                }
                records.push(RawRecord {
                    seq,
                    subject: message.subject.to_string(),
                    payload: message.payload.clone(),
                    time,
                });
                if records.len() as u64 >= want {
                    break;
                }
            }
        };
        if tokio::time::timeout(timeout + Duration::from_secs(1), drain_all)
            .await
            .is_err()
        {
            warn!(want, "drain exceeded its deadline, returning partial batch");
        }
        Ok(records)
    }

    /// Fire-and-forget consumer removal after [`CONSUMER_DELETE_GRACE`].
    /// Failure to delete is logged, never surfaced.
    fn schedule_consumer_delete(&self, stream: &str, consumer_name: String) {
        let context = self.context.clone();
        let stream = stream.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(CONSUMER_DELETE_GRACE).await;
            let outcome = match context.get_stream(&stream).await {
                Ok(handle) => handle
                    .delete_consumer(&consumer_name)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(e) = outcome {
                warn!(stream = %stream, consumer = %consumer_name, error = %e,
                    "failed to delete ephemeral consumer");
            }
        });
    }

    async fn get_stream(&self, stream: &str) -> Result<jetstream::stream::Stream> {
        self.context.get_stream(stream).await.map_err(|err| {
            if stream_not_found(&err) {
                Error::StreamAbsent(stream.to_string())
            } else {
                Error::Stream(format!("get stream {stream}: {err}"))
            }
        })
    }
}

fn stream_not_found(err: &async_nats::jetstream::context::GetStreamError) -> bool {
    match err.kind() {
        GetStreamErrorKind::JetStream(js_err) => {
            js_err.error_code() == async_nats::jetstream::ErrorCode::STREAM_NOT_FOUND
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(messages: u64, first: u64, last: u64) -> StreamTotals {
        StreamTotals {
            messages,
            bytes: 0,
            first_seq: first,
            last_seq: last,
        }
    }

    #[test]
    fn test_plan_all_reads_everything_from_first_seq() {
        let plan = plan_read(ReadMode::All, 10, &totals(250, 7, 256));
        assert_eq!(plan.want, 250);
        assert_eq!(plan.start_seq, 7);
    }

    #[test]
    fn test_plan_tail_last_n() {
        let plan = plan_read(ReadMode::TailLastN, 50, &totals(250, 1, 250));
        assert_eq!(plan.want, 50);
        assert_eq!(plan.start_seq, 201);
    }

    #[test]
    fn test_plan_tail_clamps_to_one_when_want_exceeds_last_seq() {
        let plan = plan_read(ReadMode::TailLastN, 1000, &totals(3, 1, 3));
        assert_eq!(plan.want, 3);
        assert_eq!(plan.start_seq, 1);
    }

    #[test]
    fn test_plan_want_capped_by_message_count() {
        let plan = plan_read(ReadMode::TailLastN, 1000, &totals(42, 1, 42));
        assert_eq!(plan.want, 42);
    }

    #[test]
    fn test_plan_from_seq_back() {
        let plan = plan_read(
            ReadMode::FromSeqBack { last_known_seq: 200 },
            50,
            &totals(500, 1, 500),
        );
        assert_eq!(plan.want, 50);
        assert_eq!(plan.start_seq, 151);
    }

    #[test]
    fn test_plan_from_seq_back_reduces_want_near_stream_head() {
        let plan = plan_read(
            ReadMode::FromSeqBack { last_known_seq: 30 },
            50,
            &totals(500, 1, 500),
        );
        assert_eq!(plan.want, 30);
        assert_eq!(plan.start_seq, 1);
    }

    #[test]
    fn test_plan_tail_exact_boundary() {
        // last_seq == want: the window starts at sequence 1.
        let plan = plan_read(ReadMode::TailLastN, 250, &totals(250, 1, 250));
        assert_eq!(plan.start_seq, 1);
        assert_eq!(plan.want, 250);
    }
}
