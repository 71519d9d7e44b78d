//! Call-counting stand-ins for the view collaborators.

use crate::cache::SentimentCache;
use crate::domain::company::Company;
use crate::domain::sentiment::SentimentResponse;
use crate::kis::BrokerageClient;
use crate::sentiment::{SentimentClient, SentimentFetchError};
use crate::storage::companies::CompanyLookup;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct FakeCompanies {
    by_name: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl FakeCompanies {
    pub fn with(name: &str, code: &str) -> Self {
        let mut by_name = HashMap::new();
        by_name.insert(name.to_string(), code.to_string());
        Self {
            by_name,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CompanyLookup for FakeCompanies {
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Company>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_name.get(name).map(|code| Company {
            name: name.to_string(),
            code: code.clone(),
        }))
    }
}

pub enum SentimentBehavior {
    Body(Value),
    TransportError,
}

pub struct FakeSentiment {
    behavior: SentimentBehavior,
    pub codes: Mutex<Vec<String>>,
}

impl FakeSentiment {
    pub fn new(behavior: SentimentBehavior) -> Self {
        Self {
            behavior,
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.codes.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl SentimentClient for FakeSentiment {
    async fn fetch_sentiment(&self, code: &str) -> Result<SentimentResponse, SentimentFetchError> {
        self.codes.lock().unwrap().push(code.to_string());
        match &self.behavior {
            SentimentBehavior::Body(v) => Ok(serde_json::from_value(v.clone())?),
            SentimentBehavior::TransportError => Err(SentimentFetchError::Transport(
                anyhow::anyhow!("connection refused"),
            )),
        }
    }
}

pub fn samsung_sentiment_body() -> Value {
    json!({
        "total_sentiment": "positive",
        "total_score": 0.82,
        "sentiment_count": {
            "positive": {"news": 10, "comments": 3, "investing": 1},
            "neutral": {"news": 4, "comments": 2, "investing": 0},
            "negative": {"news": 1, "comments": 0, "investing": 2}
        },
        "keywords": {
            "positive": ["HBM", "실적"],
            "negative": ["소송"],
            "neutral": [],
            "news": ["3분기 실적 발표"],
            "total": ["HBM", "실적"]
        }
    })
}

/// Records every call as `index:<code>:<division>` or `price:<code>`.
pub struct FakeBrokerage {
    pub calls: Mutex<Vec<String>>,
    index_bodies: HashMap<String, String>,
    price_body: String,
    delays: HashMap<String, Duration>,
}

impl FakeBrokerage {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            index_bodies: HashMap::new(),
            price_body: json!({
                "rt_cd": "0",
                "output": {"stck_prpr": "71500", "prdy_vrss": "-500", "prdy_ctrt": "-0.69"}
            })
            .to_string(),
            delays: HashMap::new(),
        }
    }

    pub fn with_index(mut self, code: &str, body: String, delay: Duration) -> Self {
        self.index_bodies.insert(code.to_string(), body);
        self.delays.insert(code.to_string(), delay);
        self
    }

    pub fn with_price_body(mut self, body: &str) -> Self {
        self.price_body = body.to_string();
        self
    }

    pub fn price_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("price:"))
            .count()
    }

    pub fn index_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("index:"))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl BrokerageClient for FakeBrokerage {
    async fn fetch_index(&self, code: &str, division: &str) -> anyhow::Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("index:{code}:{division}"));
        if let Some(delay) = self.delays.get(code) {
            tokio::time::sleep(*delay).await;
        }
        self.index_bodies
            .get(code)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("KIS FHKUP03500100 HTTP 500: no data for {code}"))
    }

    async fn fetch_equity_price(&self, code: &str) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(format!("price:{code}"));
        Ok(self.price_body.clone())
    }
}

/// Cache whose every operation fails, for best-effort paths.
pub struct BrokenCache {
    pub sets: AtomicUsize,
}

impl BrokenCache {
    pub fn new() -> Self {
        Self {
            sets: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl SentimentCache for BrokenCache {
    fn backend_name(&self) -> &'static str {
        "broken"
    }

    async fn get(&self, _key: &str) -> anyhow::Result<Option<Value>> {
        anyhow::bail!("redis GET failed: connection reset")
    }

    async fn set(&self, _key: &str, _value: &Value, _ttl: Duration) -> anyhow::Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("redis SET failed: connection reset")
    }
}

/// Cache whose operations never complete.
pub struct HangingCache {
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
}

impl HangingCache {
    pub fn new() -> Self {
        Self {
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl SentimentCache for HangingCache {
    fn backend_name(&self) -> &'static str {
        "hanging"
    }

    async fn get(&self, _key: &str) -> anyhow::Result<Option<Value>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &Value, _ttl: Duration) -> anyhow::Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Wraps a real cache and records the TTL of each write.
pub struct RecordingCache<C> {
    pub inner: C,
    pub writes: Mutex<Vec<(String, Duration)>>,
}

impl<C> RecordingCache<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> Vec<(String, Duration)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl<C: SentimentCache> SentimentCache for RecordingCache<C> {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> anyhow::Result<()> {
        self.writes.lock().unwrap().push((key.to_string(), ttl));
        self.inner.set(key, value, ttl).await
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
