pub mod cache;
pub mod domain;
pub mod kis;
pub mod sentiment;
pub mod service;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub redis_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub kis_appkey: Option<String>,
        pub kis_appsecret: Option<String>,
        pub kis_base_url: Option<String>,
        pub sentiment_base_url: Option<String>,
        pub http_timeout: Duration,
        pub request_timeout: Duration,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                redis_url: non_empty_var("REDIS_URL"),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                kis_appkey: std::env::var("KIS_APPKEY").ok(),
                kis_appsecret: std::env::var("KIS_APPSECRET").ok(),
                kis_base_url: non_empty_var("KIS_BASE_URL"),
                sentiment_base_url: non_empty_var("SENTIMENT_BASE_URL"),
                http_timeout: secs_var("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
                request_timeout: secs_var("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_kis_appkey(&self) -> anyhow::Result<&str> {
            self.kis_appkey.as_deref().context("KIS_APPKEY is required")
        }

        pub fn require_kis_appsecret(&self) -> anyhow::Result<&str> {
            self.kis_appsecret
                .as_deref()
                .context("KIS_APPSECRET is required")
        }

        pub fn require_sentiment_base_url(&self) -> anyhow::Result<&str> {
            self.sentiment_base_url
                .as_deref()
                .context("SENTIMENT_BASE_URL is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    fn secs_var(key: &str, default: u64) -> anyhow::Result<Duration> {
        let Some(raw) = non_empty_var(key) else {
            return Ok(Duration::from_secs(default));
        };
        let secs = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds (got {raw:?})"))?;
        anyhow::ensure!(secs > 0, "{key} must be > 0");
        Ok(Duration::from_secs(secs))
    }
}
