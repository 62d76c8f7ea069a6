//! Process-wide tenant-keyed cache of active integrations.
//!
//! Built once at startup from the metadata store; the monitoring core only
//! reads it.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Tiered-storage integration key checked by the station overview.
pub const TIERED_STORAGE_INTEGRATION: &str = "s3";

#[derive(Debug, Default)]
pub struct IntegrationsCache {
    by_tenant: RwLock<HashMap<String, HashSet<String>>>,
}

impl IntegrationsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache contents with `(tenant, integration)` pairs.
    pub fn load(&self, entries: Vec<(String, String)>) {
        let mut map: HashMap<String, HashSet<String>> = HashMap::new();
        for (tenant, name) in entries {
            map.entry(tenant).or_default().insert(name);
        }
        *self.by_tenant.write().expect("integrations cache poisoned") = map;
    }

    /// Whether `tenant` has `integration` connected.
    pub fn has(&self, tenant: &str, integration: &str) -> bool {
        self.by_tenant
            .read()
            .expect("integrations cache poisoned")
            .get(tenant)
            .is_some_and(|set| set.contains(integration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_is_tenant_scoped() {
        let cache = IntegrationsCache::new();
        cache.load(vec![
            ("acme".to_string(), "s3".to_string()),
            ("acme".to_string(), "slack".to_string()),
            ("globex".to_string(), "slack".to_string()),
        ]);
        assert!(cache.has("acme", "s3"));
        assert!(!cache.has("globex", "s3"));
        assert!(!cache.has("unknown", "s3"));
    }

    #[test]
    fn test_load_replaces_previous_contents() {
        let cache = IntegrationsCache::new();
        cache.load(vec![("acme".to_string(), "s3".to_string())]);
        cache.load(vec![("acme".to_string(), "slack".to_string())]);
        assert!(!cache.has("acme", "s3"));
        assert!(cache.has("acme", "slack"));
    }
}
