use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current-price `output` block of `inquire-price`. The field set belongs to KIS, so it is
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquitySnapshot(pub Value);

impl EquitySnapshot {
    pub fn from_payload(body: &str) -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        struct Body {
            output: Value,
        }

        let parsed = serde_json::from_str::<Body>(body)
            .context("failed to parse KIS inquire-price response")?;
        anyhow::ensure!(
            parsed.output.is_object(),
            "KIS inquire-price output is not an object"
        );
        Ok(Self(parsed.output))
    }

    /// `stck_prpr` (current price) when present.
    pub fn current_price(&self) -> Option<&str> {
        self.0.get("stck_prpr").and_then(Value::as_str)
    }
}

/// One major index as returned by the index chart endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub code: String,
    pub division: String,
    pub payload: Value,
}

impl IndexSnapshot {
    pub fn from_payload(code: &str, division: &str, body: &str) -> anyhow::Result<Self> {
        let payload = serde_json::from_str::<Value>(body)
            .with_context(|| format!("index {code} response is not valid JSON"))?;
        anyhow::ensure!(
            payload.is_object(),
            "index {code} response is not a JSON object"
        );
        Ok(Self {
            code: code.to_string(),
            division: division.to_string(),
            payload,
        })
    }
}
