use crate::cache::{SentimentCache, SENTIMENT_TTL};
use crate::domain::company::Company;
use crate::domain::market::EquitySnapshot;
use crate::domain::view::{EquityView, SentimentOrigin, SentimentView};
use crate::kis::BrokerageClient;
use crate::sentiment::{SentimentClient, SentimentFetchError};
use crate::service::error::EquityError;
use crate::storage::companies::CompanyLookup;
use crate::time::kst;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a single cache read or write. The cache is best-effort, so a stalled store must
/// not hold up the price fetch.
pub const CACHE_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Builds the equities view: sentiment comes from the cache when possible (one hour TTL), the
/// price is always fetched live.
pub struct EquityOrchestrator {
    companies: Arc<dyn CompanyLookup>,
    sentiment: Arc<dyn SentimentClient>,
    brokerage: Arc<dyn BrokerageClient>,
    cache: Arc<dyn SentimentCache>,
    cache_timeout: Duration,
}

impl EquityOrchestrator {
    pub fn new(
        companies: Arc<dyn CompanyLookup>,
        sentiment: Arc<dyn SentimentClient>,
        brokerage: Arc<dyn BrokerageClient>,
        cache: Arc<dyn SentimentCache>,
    ) -> Self {
        Self {
            companies,
            sentiment,
            brokerage,
            cache,
            cache_timeout: CACHE_OP_TIMEOUT,
        }
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    pub async fn get_equity_view(&self, stock_name: &str) -> Result<EquityView, EquityError> {
        if let Some(sentiment) = self.cached_sentiment(stock_name).await? {
            tracing::debug!(stock_name, "sentiment cache hit");
            // The price is never cached, so the code has to be resolved again.
            let company = self.resolve_company(stock_name).await?;
            let equity = self.fetch_equity(&company).await?;
            return Ok(EquityView {
                sentiment,
                sentiment_origin: SentimentOrigin::Cache,
                equity,
            });
        }

        let company = self.resolve_company(stock_name).await?;
        let response = self
            .sentiment
            .fetch_sentiment(&company.code)
            .await
            .map_err(|err| match err {
                SentimentFetchError::Parse(e) => {
                    tracing::warn!(stock_name, code = %company.code, error = %e, "sentiment payload rejected");
                    EquityError::SentimentParse(e.to_string())
                }
                SentimentFetchError::Transport(e) => {
                    tracing::error!(stock_name, code = %company.code, error = %e, "sentiment fetch failed");
                    EquityError::RequestProcessing(e)
                }
            })?;

        let job_date = kst::job_date_time(chrono::Utc::now());
        let sentiment = SentimentView::from_response(stock_name, job_date, response);
        self.store_sentiment(stock_name, &sentiment).await;

        let equity = self.fetch_equity(&company).await?;
        Ok(EquityView {
            sentiment,
            sentiment_origin: SentimentOrigin::Fresh,
            equity,
        })
    }

    /// `Ok(None)` on a miss. An unreachable or stalled cache also counts as a miss.
    async fn cached_sentiment(&self, stock_name: &str) -> Result<Option<SentimentView>, EquityError> {
        let read = tokio::time::timeout(self.cache_timeout, self.cache.get(stock_name)).await;
        let raw = match read {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => return Ok(None),
            Err(_) => {
                tracing::warn!(
                    stock_name,
                    backend = self.cache.backend_name(),
                    timeout_ms = self.cache_timeout.as_millis() as u64,
                    "sentiment cache read timed out; treating as miss"
                );
                return Ok(None);
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    stock_name,
                    backend = self.cache.backend_name(),
                    error = %err,
                    "sentiment cache read failed; treating as miss"
                );
                return Ok(None);
            }
        };

        serde_json::from_value::<SentimentView>(raw)
            .map(Some)
            .map_err(|err| {
                tracing::error!(stock_name, error = %err, "cached sentiment has unexpected shape");
                EquityError::UnexpectedCacheShape(err.to_string())
            })
    }

    /// Best-effort: a failed write is logged and otherwise ignored.
    async fn store_sentiment(&self, stock_name: &str, sentiment: &SentimentView) {
        let value = match serde_json::to_value(sentiment) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(stock_name, error = %err, "failed to serialize sentiment for cache");
                return;
            }
        };
        let write = self.cache.set(stock_name, &value, SENTIMENT_TTL);
        match tokio::time::timeout(self.cache_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(
                stock_name,
                backend = self.cache.backend_name(),
                error = %err,
                "sentiment cache write failed"
            ),
            Err(_) => tracing::warn!(
                stock_name,
                backend = self.cache.backend_name(),
                timeout_ms = self.cache_timeout.as_millis() as u64,
                "sentiment cache write timed out"
            ),
        }
    }

    async fn resolve_company(&self, stock_name: &str) -> Result<Company, EquityError> {
        match self.companies.find_by_name(stock_name).await {
            Ok(Some(company)) => Ok(company),
            Ok(None) => Err(EquityError::CompanyNotFound(stock_name.to_string())),
            Err(err) => {
                tracing::error!(stock_name, error = %err, "company lookup failed");
                Err(EquityError::RequestProcessing(err))
            }
        }
    }

    async fn fetch_equity(&self, company: &Company) -> Result<EquitySnapshot, EquityError> {
        let body = self
            .brokerage
            .fetch_equity_price(&company.code)
            .await
            .map_err(|err| {
                tracing::error!(code = %company.code, error = %err, "equity price fetch failed");
                EquityError::RequestProcessing(err)
            })?;
        EquitySnapshot::from_payload(&body).map_err(|err| {
            tracing::error!(code = %company.code, error = %err, "equity price payload rejected");
            EquityError::RequestProcessing(err)
        })
    }
}
