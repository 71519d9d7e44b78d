use anyhow::Context;
use clap::Parser;
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentistock_core::domain::company::Company;
use sentistock_core::kis::master::{fetch_master_companies, parse_markets};

#[derive(Debug, Parser)]
#[command(name = "sentistock_worker")]
struct Args {
    /// Comma-separated markets to sync (KOSPI, KOSDAQ, KONEX). Falls back to KIS_MARKETS, then
    /// KOSPI,KOSDAQ.
    #[arg(long)]
    markets: Option<String>,

    /// Download and parse the master files without writing to the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = sentistock_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&settings, &args).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "company sync failed");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: &sentistock_core::config::Settings, args: &Args) -> anyhow::Result<()> {
    let markets_arg = args
        .markets
        .clone()
        .or_else(|| std::env::var("KIS_MARKETS").ok());
    let markets = parse_markets(markets_arg.as_deref());

    let http = reqwest::Client::builder()
        .timeout(settings.http_timeout)
        .build()
        .context("failed to build master download client")?;

    let mut fetched = Vec::new();
    for market in &markets {
        let companies = fetch_master_companies(&http, *market)
            .await
            .with_context(|| format!("fetch {market:?} master failed"))?;
        tracing::info!(?market, companies = companies.len(), "parsed stock master");
        fetched.extend(companies);
    }

    let companies = dedupe_by_code(fetched);
    anyhow::ensure!(!companies.is_empty(), "stock master files yielded no companies");

    if args.dry_run {
        tracing::info!(
            ?markets,
            companies = companies.len(),
            dry_run = true,
            "company sync (dry-run)"
        );
        return Ok(());
    }

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    sentistock_core::storage::migrate(&pool).await?;

    let affected = sentistock_core::storage::companies::upsert_companies(&pool, &companies).await?;
    tracing::info!(
        ?markets,
        companies = companies.len(),
        affected,
        "krx_listed_companies synced"
    );
    Ok(())
}

/// Later markets win when a code appears twice; one upsert statement cannot touch a row twice.
fn dedupe_by_code(companies: Vec<Company>) -> Vec<Company> {
    let mut by_code = BTreeMap::new();
    for company in companies {
        by_code.insert(company.code.clone(), company);
    }
    by_code.into_values().collect()
}

fn init_sentry(settings: &sentistock_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_last_name_per_code() {
        let companies = vec![
            Company {
                name: "OldName".to_string(),
                code: "005930".to_string(),
            },
            Company {
                name: "SK하이닉스".to_string(),
                code: "000660".to_string(),
            },
            Company {
                name: "삼성전자".to_string(),
                code: "005930".to_string(),
            },
        ];

        let out = dedupe_by_code(companies);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].code, "000660");
        assert_eq!(out[1].name, "삼성전자");
    }

    #[test]
    fn parses_cli_flags() {
        let args =
            Args::try_parse_from(["sentistock_worker", "--markets", "KONEX", "--dry-run"]).unwrap();
        assert_eq!(args.markets.as_deref(), Some("KONEX"));
        assert!(args.dry_run);
    }
}
