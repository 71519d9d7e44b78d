use serde::{Deserialize, Serialize};

/// A listed company as stored in `krx_listed_companies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    /// Six-digit KRX short code, e.g. `005930`.
    pub code: String,
}
