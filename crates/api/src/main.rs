use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentistock_core::cache::{MemorySentimentCache, RedisSentimentCache, SentimentCache};
use sentistock_core::config::Settings;
use sentistock_core::kis::{BrokerageClient, KisClient};
use sentistock_core::sentiment::HttpSentimentClient;
use sentistock_core::service::{EquityOrchestrator, IndexAggregator};
use sentistock_core::storage::companies::PgCompanyLookup;

mod app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool = connect_db(&settings).await;

    let mut kis = KisClient::from_settings(&settings)?;
    if let Some(pool) = pool.clone() {
        kis = kis.with_db_pool(pool);
    }
    let brokerage: Arc<dyn BrokerageClient> = Arc::new(kis);

    let equities = match pool {
        Some(pool) => {
            let sentiment = Arc::new(HttpSentimentClient::from_settings(&settings)?);
            let cache = connect_cache(&settings).await;
            Some(Arc::new(EquityOrchestrator::new(
                Arc::new(PgCompanyLookup::new(pool)),
                sentiment,
                brokerage.clone(),
                cache,
            )))
        }
        None => None,
    };

    let state = app::AppState {
        indices: Arc::new(IndexAggregator::new(brokerage)),
        equities,
    };
    let router = app::router(state, settings.request_timeout);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn connect_db(settings: &Settings) -> Option<sqlx::PgPool> {
    let db_url = match settings.require_database_url() {
        Ok(url) => url,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; /equities disabled");
            return None;
        }
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "db connect failed; /equities disabled");
            return None;
        }
    };

    match sentistock_core::storage::migrate(&pool).await {
        Ok(()) => Some(pool),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "db migrations failed; /equities disabled");
            None
        }
    }
}

async fn connect_cache(settings: &Settings) -> Arc<dyn SentimentCache> {
    let Some(url) = settings.redis_url.as_deref() else {
        tracing::warn!("REDIS_URL not set; using in-process sentiment cache");
        return Arc::new(MemorySentimentCache::new());
    };

    match RedisSentimentCache::connect(url).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "redis unavailable; using in-process sentiment cache");
            Arc::new(MemorySentimentCache::new())
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
