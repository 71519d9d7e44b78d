use crate::config::Settings;
use crate::domain::sentiment::SentimentResponse;
use anyhow::Context;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SentimentFetchError {
    /// Connection failure, timeout, or a non-2xx status.
    #[error("sentiment request failed: {0:#}")]
    Transport(anyhow::Error),

    /// The service answered but the body does not match the expected schema.
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait SentimentClient: Send + Sync {
    async fn fetch_sentiment(&self, code: &str) -> Result<SentimentResponse, SentimentFetchError>;
}

/// Client for the sentiment-analysis microservice (`GET {base}/{code}`, no auth).
#[derive(Debug, Clone)]
pub struct HttpSentimentClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSentimentClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_sentiment_base_url()?.to_string();
        Self::new(base_url, settings.http_timeout)
    }

    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build sentiment http client")?;
        Ok(Self { http, base_url })
    }

    fn url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), code.trim())
    }

    async fn fetch_body(&self, code: &str) -> anyhow::Result<String> {
        let res = self
            .http
            .get(self.url(code))
            .send()
            .await
            .context("sentiment service request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read sentiment response")?;
        if !status.is_success() {
            anyhow::bail!("sentiment service HTTP {status}: {text}");
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl SentimentClient for HttpSentimentClient {
    async fn fetch_sentiment(&self, code: &str) -> Result<SentimentResponse, SentimentFetchError> {
        let body = self
            .fetch_body(code)
            .await
            .map_err(SentimentFetchError::Transport)?;
        Ok(serde_json::from_str::<SentimentResponse>(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fakes::{samsung_sentiment_body, serve};
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};

    async fn client_for(router: Router) -> HttpSentimentClient {
        let base = serve(router).await;
        HttpSentimentClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn url_joins_base_and_code() {
        let c = HttpSentimentClient::new("http://sentiment.local:5000/".to_string(), Duration::from_secs(1))
            .unwrap();
        assert_eq!(c.url("005930"), "http://sentiment.local:5000/005930");
    }

    #[test]
    fn parse_error_keeps_serde_message() {
        let err = serde_json::from_str::<SentimentResponse>("{\"total_score\": \"high\"}")
            .map_err(SentimentFetchError::from)
            .unwrap_err();
        assert!(matches!(err, SentimentFetchError::Parse(_)));
        assert!(err.to_string().contains("invalid type"));
    }

    #[tokio::test]
    async fn server_error_is_transport() {
        let client = client_for(Router::new().route(
            "/:code",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model offline") }),
        ))
        .await;

        let err = client.fetch_sentiment("005930").await.unwrap_err();
        assert!(matches!(err, SentimentFetchError::Transport(_)), "{err:?}");
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("model offline"));
    }

    #[tokio::test]
    async fn malformed_body_is_parse() {
        let client = client_for(Router::new().route(
            "/:code",
            get(|| async { "{\"total_score\": \"high\"" }),
        ))
        .await;

        let err = client.fetch_sentiment("005930").await.unwrap_err();
        assert!(matches!(err, SentimentFetchError::Parse(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_service_is_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client =
            HttpSentimentClient::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();

        let err = client.fetch_sentiment("005930").await.unwrap_err();
        assert!(matches!(err, SentimentFetchError::Transport(_)), "{err:?}");
    }

    #[tokio::test]
    async fn valid_body_is_decoded_for_requested_code() {
        let client = client_for(Router::new().route(
            "/:code",
            get(|Path(code): Path<String>| async move {
                if code == "005930" {
                    Ok(Json(samsung_sentiment_body()))
                } else {
                    Err(StatusCode::NOT_FOUND)
                }
            }),
        ))
        .await;

        let res = client.fetch_sentiment("005930").await.unwrap();
        assert_eq!(res.total_sentiment, "positive");
        assert_eq!(res.sentiment_count.positive.news, 10);
        assert_eq!(res.keywords.negative, vec!["소송".to_string()]);
    }
}
