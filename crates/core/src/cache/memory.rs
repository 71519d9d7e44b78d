use crate::cache::SentimentCache;
use anyhow::Result;
use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-process fallback used when no Redis is configured. Entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemorySentimentCache {
    entries: DashMap<String, Entry>,
}

impl MemorySentimentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl SentimentCache for MemorySentimentCache {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_value_until_expiry() {
        let cache = MemorySentimentCache::new();
        cache
            .set("SamsungElec", &json!({"a": 1}), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("SamsungElec").await.unwrap(), Some(json!({"a": 1})));
        assert_eq!(cache.get("Other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent_and_are_evicted() {
        let cache = MemorySentimentCache::new();
        cache
            .set("SamsungElec", &json!({"a": 1}), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(cache.get("SamsungElec").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn set_replaces_prior_value() {
        let cache = MemorySentimentCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("k", &json!({"v": 1}), ttl).await.unwrap();
        cache.set("k", &json!({"v": 2}), ttl).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(json!({"v": 2})));
        assert_eq!(cache.len(), 1);
    }
}
