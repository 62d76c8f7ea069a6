//! Domain model shared across the monitoring core.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Component health ──────────────────────────────────────────

/// Four-level component status, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Risky,
    Dangerous,
    Unhealthy,
}

/// One resource dimension of a component (CPU, memory or storage).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub total: f64,
    pub current: f64,
    /// Integer percentage in 0..=100 used for classification.
    pub percentage: i32,
}

impl Stat {
    /// Build a stat from raw totals. Floats are floored to two decimals;
    /// a positive value that would floor to 0 is reported as 0.01 so active
    /// but tiny usage never displays as zero.
    pub fn new(total: f64, current: f64) -> Self {
        let percentage = if total > 0.0 {
            (((current / total) * 100.0).round() as i32).clamp(0, 100)
        } else {
            0
        };
        Self {
            total: round_stat(total),
            current: round_stat(current),
            percentage,
        }
    }

    /// A zeroed stat, used for synthetic placeholders and absent telemetry.
    pub fn zero() -> Self {
        Self {
            total: 0.0,
            current: 0.0,
            percentage: 0,
        }
    }
}

/// Floor to two decimals; round tiny positives up to 0.01.
pub fn round_stat(value: f64) -> f64 {
    let floored = (value * 100.0).floor() / 100.0;
    if floored == 0.0 && value > 0.0 {
        0.01
    } else {
        floored
    }
}

/// Telemetry record for one broker replica or sidecar instance.
#[derive(Debug, Clone, Serialize)]
pub struct SysComponent {
    pub name: String,
    pub cpu: Stat,
    pub memory: Stat,
    pub storage: Stat,
    pub healthy: bool,
    pub status: Status,
}

impl SysComponent {
    /// Placeholder for a desired replica that is not running.
    pub fn unhealthy_placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cpu: Stat::zero(),
            memory: Stat::zero(),
            storage: Stat::zero(),
            healthy: false,
            status: Status::Unhealthy,
        }
    }
}

/// Components partitioned by status; each component appears in exactly one
/// bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComponentBuckets {
    pub healthy: Vec<SysComponent>,
    pub risky: Vec<SysComponent>,
    pub dangerous: Vec<SysComponent>,
    pub unhealthy: Vec<SysComponent>,
}

impl ComponentBuckets {
    pub fn len(&self) -> usize {
        self.healthy.len() + self.risky.len() + self.dangerous.len() + self.unhealthy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest-severity non-empty bucket.
    pub fn rollup_status(&self) -> Status {
        if !self.unhealthy.is_empty() {
            Status::Unhealthy
        } else if !self.dangerous.is_empty() {
            Status::Dangerous
        } else if !self.risky.is_empty() {
            Status::Risky
        } else {
            Status::Healthy
        }
    }
}

/// A set of interchangeable replicas of one component type.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentFamily {
    pub name: String,
    pub components: ComponentBuckets,
    pub status: Status,
    /// Distinct ports exposed by members, ascending.
    pub ports: Vec<u16>,
    pub desired_replicas: usize,
    pub actual_replicas: usize,
    /// Node names hosting members, ascending.
    pub hosts: Vec<String>,
}

// ── Throughput ────────────────────────────────────────────────

/// One per-broker throughput sample, produced every second into the
/// throughput stream. Byte counters are keyed by tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub name: String,
    #[serde(default)]
    pub read_bytes_by_tenant: HashMap<String, i64>,
    #[serde(default)]
    pub write_bytes_by_tenant: HashMap<String, i64>,
    pub timestamp: DateTime<Utc>,
}

/// One point on the aligned time-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputPoint {
    pub timestamp: DateTime<Utc>,
    pub bytes: i64,
}

impl ThroughputPoint {
    pub fn zero() -> Self {
        Self {
            timestamp: DateTime::UNIX_EPOCH,
            bytes: 0,
        }
    }
}

/// Per-broker (or synthetic total) read/write series on a shared time-axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub name: String,
    pub read: Vec<ThroughputPoint>,
    pub write: Vec<ThroughputPoint>,
}

impl AlignedSeries {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            read: Vec::new(),
            write: Vec::new(),
        }
    }
}

/// Name of the synthetic summed row, always first in aggregation output.
pub const TOTAL_SERIES: &str = "total";

// ── System logs ───────────────────────────────────────────────

/// One record from the syslog stream, shaped for the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    pub seq: u64,
    #[serde(rename = "type")]
    pub log_type: String,
    pub source: String,
    pub payload_text: String,
    pub time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_severity_order() {
        assert!(Status::Healthy < Status::Risky);
        assert!(Status::Risky < Status::Dangerous);
        assert!(Status::Dangerous < Status::Unhealthy);
    }

    #[test]
    fn test_round_stat_floors_to_two_decimals() {
        assert_eq!(round_stat(12.3456), 12.34);
        assert_eq!(round_stat(0.0), 0.0);
    }

    #[test]
    fn test_round_stat_tiny_positive_rounds_up() {
        assert_eq!(round_stat(0.005), 0.01);
        assert_eq!(round_stat(0.0001), 0.01);
    }

    #[test]
    fn test_stat_percentage() {
        let stat = Stat::new(200.0, 50.0);
        assert_eq!(stat.percentage, 25);

        let zero_total = Stat::new(0.0, 50.0);
        assert_eq!(zero_total.percentage, 0);
    }

    #[test]
    fn test_rollup_status_prefers_worst_bucket() {
        let mut buckets = ComponentBuckets::default();
        assert_eq!(buckets.rollup_status(), Status::Healthy);

        buckets.risky.push(SysComponent::unhealthy_placeholder("a"));
        assert_eq!(buckets.rollup_status(), Status::Risky);

        buckets
            .unhealthy
            .push(SysComponent::unhealthy_placeholder("b"));
        assert_eq!(buckets.rollup_status(), Status::Unhealthy);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Status::Dangerous).unwrap(),
            "\"dangerous\""
        );
    }
}
