use crate::config::Settings;
use crate::kis::token::KisTokenManager;
use crate::kis::{BrokerageClient, PROD_BASE_URL};
use crate::time::kst;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

const INQUIRE_PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-price";
const INQUIRE_PRICE_TR_ID: &str = "FHKST01010100";

const DOMESTIC_INDEX_CHART_PATH: &str =
    "/uapi/domestic-stock/v1/quotations/inquire-daily-indexchartprice";
const DOMESTIC_INDEX_CHART_TR_ID: &str = "FHKUP03500100";

const OVERSEAS_INDEX_CHART_PATH: &str = "/uapi/overseas-price/v1/quotations/inquire-daily-chartprice";
const OVERSEAS_INDEX_CHART_TR_ID: &str = "FHKST03030100";

/// Division flag for domestic index groups (KOSPI, KOSDAQ, KOSPI200, ...).
pub const INDEX_GROUP_DIVISION: &str = "U";

/// Path and transaction id for one KIS call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub path: &'static str,
    pub tr_id: &'static str,
}

pub fn index_endpoint(division: &str) -> Endpoint {
    if division == INDEX_GROUP_DIVISION {
        Endpoint {
            path: DOMESTIC_INDEX_CHART_PATH,
            tr_id: DOMESTIC_INDEX_CHART_TR_ID,
        }
    } else {
        Endpoint {
            path: OVERSEAS_INDEX_CHART_PATH,
            tr_id: OVERSEAS_INDEX_CHART_TR_ID,
        }
    }
}

pub fn equity_price_endpoint() -> Endpoint {
    Endpoint {
        path: INQUIRE_PRICE_PATH,
        tr_id: INQUIRE_PRICE_TR_ID,
    }
}

fn index_query(code: &str, division: &str, date: &str) -> Vec<(&'static str, String)> {
    vec![
        ("fid_cond_mrkt_div_code", division.to_string()),
        ("fid_input_iscd", code.to_string()),
        ("fid_input_date_1", date.to_string()),
        ("fid_input_date_2", date.to_string()),
        ("fid_period_div_code", "D".to_string()),
    ]
}

fn equity_price_query(code: &str) -> Vec<(&'static str, String)> {
    vec![
        ("fid_cond_mrkt_div_code", "J".to_string()),
        ("fid_input_iscd", code.to_string()),
    ]
}

fn kis_headers(token: &str, appkey: &str, appsecret: &str, tr_id: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );
    headers.insert("appkey", HeaderValue::from_str(appkey)?);
    headers.insert("appsecret", HeaderValue::from_str(appsecret)?);
    headers.insert("tr_id", HeaderValue::from_str(tr_id)?);
    Ok(headers)
}

/// KIS reports business failures with HTTP 200 and `rt_cd != "0"`.
fn ensure_kis_success(text: &str) -> Result<()> {
    let Ok(v) = serde_json::from_str::<Value>(text) else {
        // Parsing is the caller's job; only reject bodies that positively signal failure.
        return Ok(());
    };
    match v.get("rt_cd").and_then(Value::as_str) {
        Some(rt_cd) if rt_cd != "0" => {
            let msg = v.get("msg1").and_then(Value::as_str).unwrap_or("");
            let msg_cd = v.get("msg_cd").and_then(Value::as_str).unwrap_or("");
            anyhow::bail!("KIS error rt_cd={rt_cd} msg_cd={msg_cd}: {}", msg.trim())
        }
        _ => Ok(()),
    }
}

#[derive(Debug)]
pub struct KisClient {
    http: reqwest::Client,
    base_url: String,
    tokens: KisTokenManager,
}

impl KisClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let appkey = settings.require_kis_appkey()?.to_string();
        let appsecret = settings.require_kis_appsecret()?.to_string();
        let base_url = settings
            .kis_base_url
            .clone()
            .unwrap_or_else(|| PROD_BASE_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .context("failed to build KIS http client")?;

        let tokens = KisTokenManager::new(http.clone(), base_url.clone(), appkey, appsecret);
        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    pub fn with_db_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.tokens = self.tokens.with_db_pool(pool);
        self
    }

    async fn get(&self, endpoint: Endpoint, query: &[(&'static str, String)]) -> Result<String> {
        let token = self.tokens.access_token().await?;
        let headers = kis_headers(
            &token,
            self.tokens.appkey(),
            self.tokens.appsecret(),
            endpoint.tr_id,
        )?;
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), endpoint.path);

        let res = self
            .http
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await
            .with_context(|| format!("KIS {} request failed", endpoint.tr_id))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read KIS {} response", endpoint.tr_id))?;
        if !status.is_success() {
            anyhow::bail!("KIS {} HTTP {status}: {text}", endpoint.tr_id);
        }
        ensure_kis_success(&text).with_context(|| format!("KIS {} rejected", endpoint.tr_id))?;

        Ok(text)
    }
}

#[async_trait::async_trait]
impl BrokerageClient for KisClient {
    async fn fetch_index(&self, code: &str, division: &str) -> Result<String> {
        let endpoint = index_endpoint(division);
        let today = kst::input_date(chrono::Utc::now());
        tracing::debug!(code, division, tr_id = endpoint.tr_id, "KIS index fetch");
        self.get(endpoint, &index_query(code, division, &today)).await
    }

    async fn fetch_equity_price(&self, code: &str) -> Result<String> {
        tracing::debug!(code, "KIS inquire-price");
        self.get(equity_price_endpoint(), &equity_price_query(code))
            .await
    }
}
