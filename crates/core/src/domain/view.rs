use crate::domain::market::{EquitySnapshot, IndexSnapshot};
use crate::domain::sentiment::{Keywords, SentimentDetail, SentimentResponse};
use serde::{Deserialize, Deserializer, Serialize};

/// Sentiment half of the equities view. This is also the exact value stored in the cache, so the
/// field names double as the cache entry's keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentView {
    pub stock_name: String,
    pub job_date: String,
    pub sentiment_total_sentiment: String,
    pub sentiment_total_score: f64,
    pub sentiment_negative: SentimentDetail,
    pub sentiment_neutral: SentimentDetail,
    pub sentiment_positive: SentimentDetail,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Keywords,
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

impl SentimentView {
    pub fn from_response(stock_name: &str, job_date: String, resp: SentimentResponse) -> Self {
        Self {
            stock_name: stock_name.to_string(),
            job_date,
            sentiment_total_sentiment: resp.total_sentiment,
            sentiment_total_score: resp.total_score,
            sentiment_negative: resp.sentiment_count.negative,
            sentiment_neutral: resp.sentiment_count.neutral,
            sentiment_positive: resp.sentiment_count.positive,
            keywords: resp.keywords,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentOrigin {
    Cache,
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityView {
    #[serde(flatten)]
    pub sentiment: SentimentView,
    pub sentiment_origin: SentimentOrigin,
    pub equity: EquitySnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicesView {
    pub indices_kor: Vec<IndexSnapshot>,
    pub job_date: String,
}
