//! Threshold classification and status bucketing.

use switchyard_core::{ComponentBuckets, Stat, Status, SysComponent};

/// Map resource percentages to a status. Thresholds are checked high-to-low;
/// the worst dimension decides.
pub fn classify(cpu_pct: i32, mem_pct: i32, storage_pct: i32) -> Status {
    let worst = cpu_pct.max(mem_pct).max(storage_pct);
    if worst > 99 {
        Status::Unhealthy
    } else if worst > 94 {
        Status::Dangerous
    } else if worst > 84 {
        Status::Risky
    } else {
        Status::Healthy
    }
}

/// Build a classified component record from its stats.
pub fn classify_component(name: &str, cpu: Stat, memory: Stat, storage: Stat) -> SysComponent {
    let status = classify(cpu.percentage, memory.percentage, storage.percentage);
    SysComponent {
        name: name.to_string(),
        cpu,
        memory,
        storage,
        healthy: status == Status::Healthy,
        status,
    }
}

/// Partition components into status buckets, padding the shortfall against
/// the desired replica count with synthetic unhealthy placeholders named after
/// the family.
pub fn bucket(components: Vec<SysComponent>, desired: usize, family_name: &str) -> ComponentBuckets {
    let mut buckets = ComponentBuckets::default();
    for component in components {
        match component.status {
            Status::Healthy => buckets.healthy.push(component),
            Status::Risky => buckets.risky.push(component),
            Status::Dangerous => buckets.dangerous.push(component),
            Status::Unhealthy => buckets.unhealthy.push(component),
        }
    }
    while buckets.len() < desired {
        buckets
            .unhealthy
            .push(SysComponent::unhealthy_placeholder(family_name));
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, cpu: i32, mem: i32, storage: i32) -> SysComponent {
        let stat = |p: i32| Stat {
            total: 100.0,
            current: p as f64,
            percentage: p,
        };
        classify_component(name, stat(cpu), stat(mem), stat(storage))
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(classify(85, 10, 10), Status::Risky);
        assert_eq!(classify(95, 10, 10), Status::Dangerous);
        assert_eq!(classify(100, 10, 10), Status::Unhealthy);
        assert_eq!(classify(84, 94, 99), Status::Dangerous);
        assert_eq!(classify(0, 0, 0), Status::Healthy);
    }

    #[test]
    fn test_boundary_values_stay_in_lower_band() {
        assert_eq!(classify(84, 0, 0), Status::Healthy);
        assert_eq!(classify(94, 0, 0), Status::Risky);
        assert_eq!(classify(99, 0, 0), Status::Dangerous);
    }

    #[test]
    fn test_thresholds_monotone() {
        // Scaling any dimension down never classifies worse.
        let severity = |s: Status| s as u8;
        for cpu in [0, 85, 95, 100] {
            for lower in [0, 50] {
                let base = classify(cpu, 50, 50);
                let scaled = classify(cpu.min(lower), 50, 50);
                assert!(severity(scaled) <= severity(base));
            }
        }
    }

    #[test]
    fn test_component_healthy_flag_tracks_status() {
        assert!(component("a", 10, 10, 10).healthy);
        assert!(!component("b", 90, 10, 10).healthy);
    }

    #[test]
    fn test_bucket_partition_is_exhaustive_and_disjoint() {
        let comps = vec![
            component("a", 10, 10, 10),
            component("b", 90, 10, 10),
            component("c", 96, 10, 10),
            component("d", 100, 10, 10),
        ];
        let buckets = bucket(comps, 0, "broker");
        assert_eq!(buckets.healthy.len(), 1);
        assert_eq!(buckets.risky.len(), 1);
        assert_eq!(buckets.dangerous.len(), 1);
        assert_eq!(buckets.unhealthy.len(), 1);
        assert_eq!(buckets.len(), 4);
    }

    #[test]
    fn test_padding_appends_synthetic_unhealthy() {
        let comps = vec![component("a", 10, 10, 10), component("b", 10, 10, 10)];
        let buckets = bucket(comps, 3, "broker");
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.unhealthy.len(), 1);
        let placeholder = &buckets.unhealthy[0];
        assert_eq!(placeholder.name, "broker");
        assert_eq!(placeholder.cpu, Stat::zero());
        assert_eq!(placeholder.status, Status::Unhealthy);
        assert_eq!(buckets.rollup_status(), Status::Unhealthy);
    }

    #[test]
    fn test_no_padding_when_desired_met() {
        let comps = vec![component("a", 10, 10, 10)];
        let buckets = bucket(comps, 1, "broker");
        assert_eq!(buckets.unhealthy.len(), 0);
        assert_eq!(buckets.rollup_status(), Status::Healthy);
    }
}
