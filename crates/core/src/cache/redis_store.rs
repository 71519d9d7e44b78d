use crate::cache::SentimentCache;
use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use std::time::Duration;

/// Redis-backed cache keyed by stock name. Values are JSON strings written with `SET .. EX`.
#[derive(Clone)]
pub struct RedisSentimentCache {
    conn: ConnectionManager,
}

impl RedisSentimentCache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid REDIS_URL")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("redis connect failed")?;
        Ok(Self { conn })
    }
}

/// A non-JSON payload is still "present"; it comes back as a string so the caller rejects its
/// shape instead of treating it as a miss.
fn decode_cached_value(raw: String) -> Value {
    match serde_json::from_str::<Value>(&raw) {
        Ok(v) => v,
        Err(_) => Value::String(raw),
    }
}

#[async_trait::async_trait]
impl SentimentCache for RedisSentimentCache {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(key)
            .await
            .with_context(|| format!("redis GET {key} failed"))?;

        Ok(raw.map(decode_cached_value))
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let body = serde_json::to_string(value).context("serialize cache value failed")?;
        conn.set_ex::<_, _, ()>(key, body, ttl.as_secs().max(1))
            .await
            .with_context(|| format!("redis SET {key} failed"))?;
        Ok(())
    }
}
