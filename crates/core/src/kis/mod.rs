pub mod client;
pub mod master;
pub mod token;

use anyhow::Result;

pub use client::KisClient;
pub use token::KisTokenManager;

pub const PROD_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";

/// Brokerage REST calls used by the views. Both return the raw response body.
#[async_trait::async_trait]
pub trait BrokerageClient: Send + Sync {
    /// Daily chart snapshot for one index. `division` is the KIS `fid_cond_mrkt_div_code`.
    async fn fetch_index(&self, code: &str, division: &str) -> Result<String>;

    /// Current-price snapshot for one KRX stock code.
    async fn fetch_equity_price(&self, code: &str) -> Result<String>;
}
