//! Synthetic preview records for non-native stations.
//!
//! Stations written to by plain protocol clients carry no producer/consumer
//! identities, so the dashboard shows a fixed demo set instead of live data.

use chrono::{TimeZone, Utc};

use crate::metadata::{ConsumerRecord, ProducerRecord};
use crate::station::ConsumerGroupView;

/// Fixed demo producers, returned verbatim.
pub fn preview_producers() -> Vec<ProducerRecord> {
    let created_at = Utc.timestamp_opt(0, 0).unwrap();
    ["demo-producer-1", "demo-producer-2"]
        .into_iter()
        .map(|name| ProducerRecord {
            name: name.to_string(),
            is_active: true,
            created_by_username: "preview".to_string(),
            created_at,
        })
        .collect()
}

/// Fixed demo consumer groups, returned verbatim.
pub fn preview_consumer_groups() -> Vec<ConsumerGroupView> {
    let created_at = Utc.timestamp_opt(0, 0).unwrap();
    vec![ConsumerGroupView {
        name: "demo-cg".to_string(),
        is_active: true,
        consumers: vec![ConsumerRecord {
            name: "demo-consumer-1".to_string(),
            cg_name: "demo-cg".to_string(),
            is_active: true,
            created_at,
        }],
    }]
}
