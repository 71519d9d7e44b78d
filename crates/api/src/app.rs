use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use sentistock_core::domain::view::{EquityView, IndicesView};
use sentistock_core::service::{EquityOrchestrator, IndexAggregator, EquityError};

const LANDING_PAGE: &str = r#"<!doctype html>
<html lang="ko">
<head><meta charset="utf-8"><title>sentistock</title></head>
<body>
<h1>sentistock</h1>
<ul>
<li><a href="/indices">주요 지수</a></li>
<li><form action="/equities" method="get"><input name="stockName" placeholder="종목명"><button>조회</button></form></li>
</ul>
</body>
</html>
"#;

#[derive(Clone)]
pub struct AppState {
    pub indices: Arc<IndexAggregator>,
    /// `None` when the company table is unreachable.
    pub equities: Option<Arc<EquityOrchestrator>>,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/indices", get(get_indices))
        .route("/equities", get(get_equity))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

async fn index() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    View(EquityError),
    BadRequest(String),
    Unavailable(&'static str),
}

impl From<EquityError> for ApiError {
    fn from(err: EquityError) -> Self {
        ApiError::View(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::View(err) => {
                let status = match &err {
                    EquityError::CompanyNotFound(_) => StatusCode::NOT_FOUND,
                    EquityError::UnexpectedCacheShape(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    EquityError::SentimentParse(_) | EquityError::RequestProcessing(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                };
                if let EquityError::RequestProcessing(inner) = &err {
                    sentry_anyhow::capture_anyhow(inner);
                }
                (status, err.kind(), err.to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ApiError::Unavailable(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                format!("{what} is unavailable"),
            ),
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

async fn get_indices(State(state): State<AppState>) -> Result<Json<IndicesView>, ApiError> {
    Ok(Json(state.indices.get_indices_view().await?))
}

#[derive(Debug, Deserialize)]
struct EquityQuery {
    #[serde(rename = "stockName", default)]
    stock_name: String,
}

async fn get_equity(
    State(state): State<AppState>,
    Query(q): Query<EquityQuery>,
) -> Result<Json<EquityView>, ApiError> {
    let Some(equities) = &state.equities else {
        return Err(ApiError::Unavailable("company lookup"));
    };

    let stock_name = q.stock_name.trim();
    if stock_name.is_empty() {
        return Err(ApiError::BadRequest(
            "stockName is required and must be non-empty".to_string(),
        ));
    }

    let view = equities.get_equity_view(stock_name).await?;
    tracing::info!(
        stock_name,
        origin = ?view.sentiment_origin,
        "equity view served"
    );
    Ok(Json(view))
}
