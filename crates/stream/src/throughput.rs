//! Per-broker throughput aggregation onto a fixed-length time-axis.

use std::collections::BTreeMap;

use switchyard_core::{AlignedSeries, ThroughputPoint, ThroughputSample, TOTAL_SERIES};

/// Group samples by broker, align read/write onto the shared time-axis, and
/// synthesise the `total` row of length exactly `w`.
///
/// Aggregation is tenant-scoped: only byte counters under `tenant` are read;
/// brokers with no entry for the tenant contribute zeros. The `total` row is
/// always first; per-broker rows follow sorted by name.
pub fn aggregate(mut samples: Vec<ThroughputSample>, tenant: &str, w: usize) -> Vec<AlignedSeries> {
    samples.sort_by_key(|s| s.timestamp);

    let mut per_broker: BTreeMap<String, AlignedSeries> = BTreeMap::new();
    for sample in samples {
        let series = per_broker
            .entry(sample.name.clone())
            .or_insert_with(|| AlignedSeries::empty(&sample.name));
        series.read.push(ThroughputPoint {
            timestamp: sample.timestamp,
            bytes: sample
                .read_bytes_by_tenant
                .get(tenant)
                .copied()
                .unwrap_or(0),
        });
        series.write.push(ThroughputPoint {
            timestamp: sample.timestamp,
            bytes: sample
                .write_bytes_by_tenant
                .get(tenant)
                .copied()
                .unwrap_or(0),
        });
    }

    let mut total = AlignedSeries {
        name: TOTAL_SERIES.to_string(),
        read: vec![ThroughputPoint::zero(); w],
        write: vec![ThroughputPoint::zero(); w],
    };
    for series in per_broker.values() {
        // All brokers emit on the same cadence, so index i refers to the same
        // wall-clock slot in every series.
        for (i, point) in series.read.iter().take(w).enumerate() {
            total.read[i].timestamp = point.timestamp;
            total.read[i].bytes += point.bytes;
        }
        for (i, point) in series.write.iter().take(w).enumerate() {
            total.write[i].timestamp = point.timestamp;
            total.write[i].bytes += point.bytes;
        }
    }

    let mut out = Vec::with_capacity(per_broker.len() + 1);
    out.push(total);
    out.extend(per_broker.into_values());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;

    fn ts(sec: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + sec, 0).unwrap()
    }

    fn sample(name: &str, read: i64, write: i64, tenant: &str, at: DateTime<Utc>) -> ThroughputSample {
        ThroughputSample {
            name: name.to_string(),
            read_bytes_by_tenant: HashMap::from([(tenant.to_string(), read)]),
            write_bytes_by_tenant: HashMap::from([(tenant.to_string(), write)]),
            timestamp: at,
        }
    }

    #[test]
    fn test_total_sums_brokers_at_each_index() {
        let t = ts(0);
        let samples = vec![
            sample("b1", 10, 1, "t1", t),
            sample("b2", 5, 2, "t1", t),
        ];
        let out = aggregate(samples, "t1", 3);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].name, "total");
        assert_eq!(out[0].read.len(), 3);
        assert_eq!(out[0].read[0].bytes, 15);
        assert_eq!(out[0].read[0].timestamp, t);
        assert_eq!(out[0].read[1].bytes, 0);
        assert_eq!(out[0].read[2].bytes, 0);
        assert_eq!(out[0].write[0].bytes, 3);
        assert_eq!(out[0].write.len(), 3);
    }

    #[test]
    fn test_per_broker_rows_sorted_by_name() {
        let t = ts(0);
        let samples = vec![
            sample("zulu", 1, 1, "t1", t),
            sample("alpha", 1, 1, "t1", t),
        ];
        let out = aggregate(samples, "t1", 2);
        assert_eq!(out[1].name, "alpha");
        assert_eq!(out[2].name, "zulu");
    }

    #[test]
    fn test_unknown_tenant_yields_zero_series() {
        let samples = vec![sample("b1", 10, 20, "t1", ts(0))];
        let out = aggregate(samples, "other-tenant", 2);
        assert_eq!(out[0].read[0].bytes, 0);
        assert_eq!(out[0].write[0].bytes, 0);
        assert_eq!(out[1].read[0].bytes, 0);
    }

    #[test]
    fn test_empty_samples_returns_zero_total_of_length_w() {
        let out = aggregate(Vec::new(), "t1", 4);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "total");
        assert_eq!(out[0].read.len(), 4);
        assert!(out[0].read.iter().all(|p| p.bytes == 0));
    }

    #[test]
    fn test_samples_sorted_by_timestamp_before_grouping() {
        let samples = vec![
            sample("b1", 2, 0, "t1", ts(1)),
            sample("b1", 1, 0, "t1", ts(0)),
        ];
        let out = aggregate(samples, "t1", 2);
        assert_eq!(out[1].read[0].bytes, 1);
        assert_eq!(out[1].read[1].bytes, 2);
        assert_eq!(out[0].read[0].bytes, 1);
        assert_eq!(out[0].read[1].bytes, 2);
    }

    #[test]
    fn test_order_invariance_after_shuffle() {
        let samples = vec![
            sample("b2", 5, 2, "t1", ts(0)),
            sample("b1", 10, 1, "t1", ts(0)),
            sample("b1", 11, 1, "t1", ts(1)),
            sample("b2", 6, 2, "t1", ts(1)),
        ];
        let mut reversed = samples.clone();
        reversed.reverse();

        let a = aggregate(samples, "t1", 4);
        let b = aggregate(reversed, "t1", 4);

        assert_eq!(a.len(), b.len());
        for (left, right) in a.iter().zip(b.iter()) {
            assert_eq!(left.name, right.name);
            assert_eq!(left.read, right.read);
            assert_eq!(left.write, right.write);
        }
    }

    #[test]
    fn test_timestamps_align_across_rows() {
        let samples = vec![
            sample("b1", 1, 1, "t1", ts(0)),
            sample("b2", 1, 1, "t1", ts(0)),
            sample("b1", 1, 1, "t1", ts(1)),
            sample("b2", 1, 1, "t1", ts(1)),
        ];
        let out = aggregate(samples, "t1", 4);
        for i in 0..2 {
            let t = out[1].read[i].timestamp;
            for row in &out {
                if i < row.read.len() {
                    assert_eq!(row.read[i].timestamp, t);
                }
            }
        }
    }
}
