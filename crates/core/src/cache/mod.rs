use anyhow::Result;
use serde_json::Value;
use std::time::Duration;

pub mod memory;
pub mod redis_store;

pub use memory::MemorySentimentCache;
pub use redis_store::RedisSentimentCache;

/// Lifetime of a cached sentiment entry.
pub const SENTIMENT_TTL: Duration = Duration::from_secs(60 * 60);

/// Key/value store with per-key expiry. Values are raw JSON so callers can tell a missing entry
/// from one with the wrong shape.
#[async_trait::async_trait]
pub trait SentimentCache: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replaces whatever is stored under `key`.
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()>;
}
