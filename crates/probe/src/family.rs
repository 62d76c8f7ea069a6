//! Component-name → family routing and family assembly.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use switchyard_core::{ComponentFamily, SysComponent};

use crate::classify::bucket;

pub const FAMILY_BROKER: &str = "broker";
pub const FAMILY_METADATA: &str = "metadata";
pub const FAMILY_REST_GATEWAY: &str = "rest-gateway";
pub const FAMILY_METADATA_COORDINATOR: &str = "metadata-coordinator";

fn broker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^broker-\d+$").unwrap())
}

fn metadata_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^metadata-\d+$").unwrap())
}

/// Route a component name to its family. Unmatched names (jobs, one-off pods)
/// carry no replica telemetry and are skipped by the probe.
pub fn family_for(name: &str) -> Option<&'static str> {
    if broker_re().is_match(name) {
        Some(FAMILY_BROKER)
    } else if metadata_re().is_match(name) {
        Some(FAMILY_METADATA)
    } else if name.contains(FAMILY_METADATA_COORDINATOR) {
        Some(FAMILY_METADATA_COORDINATOR)
    } else if name.contains(FAMILY_REST_GATEWAY) {
        Some(FAMILY_REST_GATEWAY)
    } else {
        None
    }
}

/// Families holding persistent volumes; only these get a storage stat.
pub fn is_storage_bearing(family: &str) -> bool {
    matches!(family, FAMILY_BROKER | FAMILY_METADATA)
}

/// One classified replica plus its placement metadata, before grouping.
#[derive(Debug, Clone)]
pub struct ProbedComponent {
    pub component: SysComponent,
    pub family: &'static str,
    pub ports: Vec<u16>,
    pub host: String,
}

/// Group probed replicas into families: bucket + pad against the desired
/// replica count, roll up status, union ports, and collect hosts.
pub fn group_families(
    probed: Vec<ProbedComponent>,
    desired: &BTreeMap<String, usize>,
) -> Vec<ComponentFamily> {
    let mut grouped: BTreeMap<&'static str, Vec<ProbedComponent>> = BTreeMap::new();
    for item in probed {
        grouped.entry(item.family).or_default().push(item);
    }

    let mut families = Vec::with_capacity(grouped.len());
    for (family_name, members) in grouped {
        let desired_replicas = desired
            .get(family_name)
            .copied()
            .unwrap_or(members.len());

        let mut ports: Vec<u16> = members.iter().flat_map(|m| m.ports.clone()).collect();
        ports.sort_unstable();
        ports.dedup();

        let mut hosts: Vec<String> = members.iter().map(|m| m.host.clone()).collect();
        hosts.sort();
        hosts.dedup();

        let components: Vec<SysComponent> =
            members.into_iter().map(|m| m.component).collect();
        let buckets = bucket(components, desired_replicas, family_name);
        let actual_replicas = buckets.len();
        let status = buckets.rollup_status();

        families.push(ComponentFamily {
            name: family_name.to_string(),
            components: buckets,
            status,
            ports,
            desired_replicas,
            actual_replicas,
            hosts,
        });
    }
    families
}
