use crate::domain::market::IndexSnapshot;
use crate::domain::view::IndicesView;
use crate::kis::BrokerageClient;
use crate::service::error::EquityError;
use crate::time::kst;
use std::sync::Arc;

/// KOSPI, KOSPI200 and KOSDAQ, in display order.
pub const MAJOR_INDICES: &[(&str, &str)] = &[("0001", "U"), ("2001", "U"), ("1001", "U")];

pub struct IndexAggregator {
    brokerage: Arc<dyn BrokerageClient>,
    indices: Vec<(String, String)>,
}

impl IndexAggregator {
    pub fn new(brokerage: Arc<dyn BrokerageClient>) -> Self {
        Self::with_indices(brokerage, MAJOR_INDICES)
    }

    pub fn with_indices(brokerage: Arc<dyn BrokerageClient>, indices: &[(&str, &str)]) -> Self {
        Self {
            brokerage,
            indices: indices
                .iter()
                .map(|(code, division)| (code.to_string(), division.to_string()))
                .collect(),
        }
    }

    /// One call per index, strictly one after another; the first failure aborts the whole view.
    pub async fn get_major_indices(&self) -> Result<Vec<IndexSnapshot>, EquityError> {
        let mut out = Vec::with_capacity(self.indices.len());
        for (code, division) in &self.indices {
            let body = self
                .brokerage
                .fetch_index(code, division)
                .await
                .map_err(|err| {
                    tracing::error!(code = %code, division = %division, error = %err, "index fetch failed");
                    EquityError::RequestProcessing(err)
                })?;
            let snapshot = IndexSnapshot::from_payload(code, division, &body).map_err(|err| {
                tracing::error!(code = %code, error = %err, "index payload rejected");
                EquityError::RequestProcessing(err)
            })?;
            out.push(snapshot);
        }
        Ok(out)
    }

    pub async fn get_indices_view(&self) -> Result<IndicesView, EquityError> {
        let indices_kor = self.get_major_indices().await?;
        Ok(IndicesView {
            indices_kor,
            job_date: kst::job_date_time(chrono::Utc::now()),
        })
    }
}
