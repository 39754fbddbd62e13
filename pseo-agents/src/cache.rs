//! Process-lifetime research cache shared by the research agents

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

/// A cached research result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// Unbounded concurrent map from research key to result
#[derive(Debug, Default)]
pub struct ResearchCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, data: Value) {
        debug!("Caching research under '{}'", key);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                timestamp: Utc::now(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Agents that keep a local research cache
pub trait CachedResearch {
    fn cache(&self) -> &ResearchCache;

    fn cache_put(&self, key: &str, data: Value) {
        self.cache().put(key, data);
    }

    fn cache_get(&self, key: &str) -> Option<Value> {
        self.cache().get(key)
    }
}
