use crate::time::kst::parse_kst_wall_time;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issues and caches KIS OAuth access tokens.
///
/// Tokens are cached for the life of the process and, when a pool is attached, in
/// `kis_access_tokens` so restarts reuse the current token instead of issuing a new one (KIS
/// rate-limits issuance).
#[derive(Debug)]
pub struct KisTokenManager {
    http: reqwest::Client,
    base_url: String,
    appkey: String,
    appsecret: String,
    cache: tokio::sync::Mutex<Option<CachedToken>>,
    db_pool: Option<sqlx::PgPool>,
    env_key: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: KisToken,
    fetched_at: DateTime<Utc>,
}

impl KisTokenManager {
    pub fn new(http: reqwest::Client, base_url: String, appkey: String, appsecret: String) -> Self {
        Self {
            http,
            base_url,
            appkey,
            appsecret,
            cache: tokio::sync::Mutex::new(None),
            db_pool: None,
            env_key: "prod".to_string(),
        }
    }

    pub fn with_db_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.cache.lock().await;
        if let Some(cached) = guard.as_ref() {
            if !cached.token.is_expired_or_stale(cached.fetched_at, Utc::now()) {
                return Ok(cached.token.access_token.clone());
            }
        }

        if let Some(pool) = self.db_pool.as_ref() {
            match load_token_from_db(pool, &self.env_key).await {
                Ok(Some((tok, issued_at))) if !tok.is_expired_or_stale(issued_at, Utc::now()) => {
                    let access_token = tok.access_token.clone();
                    *guard = Some(CachedToken {
                        token: tok,
                        fetched_at: issued_at,
                    });
                    return Ok(access_token);
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "failed to load KIS access token from DB"),
            }
        }

        let fetched_at = Utc::now();
        let token = self.issue_token().await?;
        tracing::info!(expires = %token.access_token_token_expired, "issued new KIS access token");

        if let Some(pool) = self.db_pool.as_ref() {
            if let Err(err) = save_token_to_db(pool, &self.env_key, &token, fetched_at).await {
                tracing::warn!(error = %err, "failed to persist KIS access token to DB");
            }
        }

        let access_token = token.access_token.clone();
        *guard = Some(CachedToken { token, fetched_at });
        Ok(access_token)
    }

    pub fn appkey(&self) -> &str {
        &self.appkey
    }

    pub fn appsecret(&self) -> &str {
        &self.appsecret
    }

    async fn issue_token(&self) -> Result<KisToken> {
        let url = format!("{}/oauth2/tokenP", self.base_url.trim_end_matches('/'));
        let req = KisTokenRequest {
            grant_type: "client_credentials",
            appkey: &self.appkey,
            appsecret: &self.appsecret,
        };

        let res = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await
            .context("KIS token request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read KIS token response")?;
        if !status.is_success() {
            anyhow::bail!("KIS token HTTP {status}: {text}");
        }

        serde_json::from_str::<KisToken>(&text).context("failed to parse KIS token response")
    }
}

#[derive(Debug, Serialize)]
struct KisTokenRequest<'a> {
    grant_type: &'a str,
    appkey: &'a str,
    appsecret: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KisToken {
    pub access_token: String,
    #[serde(default)]
    pub access_token_token_expired: String,
    #[serde(default)]
    pub expires_in: u64,
}

impl KisToken {
    fn is_expired_or_stale(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let margin = chrono::Duration::minutes(2);

        if let Some(exp) = parse_kst_wall_time(&self.access_token_token_expired) {
            return now + margin >= exp;
        }

        if self.expires_in > 0 {
            let exp = fetched_at + chrono::Duration::seconds(self.expires_in as i64);
            return now + margin >= exp;
        }

        true
    }
}

async fn load_token_from_db(
    pool: &sqlx::PgPool,
    env: &str,
) -> Result<Option<(KisToken, DateTime<Utc>)>> {
    let row = sqlx::query_as::<_, (String, Option<String>, Option<i64>, DateTime<Utc>)>(
        "SELECT access_token, access_token_token_expired, expires_in, issued_at \
         FROM kis_access_tokens \
         WHERE env = $1",
    )
    .persistent(false)
    .bind(env)
    .fetch_optional(pool)
    .await
    .context("select kis_access_tokens failed")?;

    let Some((access_token, token_expired, expires_in, issued_at)) = row else {
        return Ok(None);
    };

    Ok(Some((
        KisToken {
            access_token,
            access_token_token_expired: token_expired.unwrap_or_default(),
            expires_in: expires_in.unwrap_or(0).max(0) as u64,
        },
        issued_at,
    )))
}

async fn save_token_to_db(
    pool: &sqlx::PgPool,
    env: &str,
    tok: &KisToken,
    issued_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO kis_access_tokens (env, access_token, access_token_token_expired, expires_in, issued_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, now()) \
         ON CONFLICT (env) DO UPDATE SET \
           access_token = EXCLUDED.access_token, \
           access_token_token_expired = EXCLUDED.access_token_token_expired, \
           expires_in = EXCLUDED.expires_in, \
           issued_at = EXCLUDED.issued_at, \
           updated_at = now()",
    )
    .persistent(false)
    .bind(env)
    .bind(&tok.access_token)
    .bind(&tok.access_token_token_expired)
    .bind(tok.expires_in as i64)
    .bind(issued_at)
    .execute(pool)
    .await
    .context("upsert kis_access_tokens failed")?;
    Ok(())
}
