/// Failures surfaced to the caller of a view. Cache-write failures never appear here.
#[derive(Debug, thiserror::Error)]
pub enum EquityError {
    #[error("No company found with the name: {0}")]
    CompanyNotFound(String),

    #[error("Unexpected data type in cache: {0}")]
    UnexpectedCacheShape(String),

    #[error("Error parsing sentiment data: {0}")]
    SentimentParse(String),

    #[error("Error occurred while processing request: {0:#}")]
    RequestProcessing(anyhow::Error),
}

impl EquityError {
    pub fn kind(&self) -> &'static str {
        match self {
            EquityError::CompanyNotFound(_) => "company_not_found",
            EquityError::UnexpectedCacheShape(_) => "unexpected_cache_shape",
            EquityError::SentimentParse(_) => "sentiment_parse_error",
            EquityError::RequestProcessing(_) => "request_processing_error",
        }
    }
}
