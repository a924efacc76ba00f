// HTTP surface.
// Axum router exposing the proxy endpoint and the stats facade.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{error, instrument, warn};

use crate::error::PulseError;
use crate::proxy::{EndpointFetcher, validate_endpoint};
use crate::stats::{StatsFacade, StatsRecord};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<dyn EndpointFetcher>,
    pub facade: StatsFacade,
}

impl AppState {
    pub fn new(proxy: Arc<dyn EndpointFetcher>, facade: StatsFacade) -> Self {
        Self { proxy, facade }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/proxy", get(proxy))
        .route("/stats", get(stats))
        .route("/stats/refresh", post(refresh_stats))
        .route("/stats/retry", post(retry_stats))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error body returned by every route: `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(PulseError);

impl From<PulseError> for ApiError {
    fn from(err: PulseError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ProxyParams {
    endpoint: Option<String>,
    cache: Option<String>,
}

/// Any non-empty value other than `false` or `0` turns caching on.
fn cache_enabled(raw: Option<&str>) -> bool {
    match raw {
        Some(value) => !(value.is_empty() || value == "false" || value == "0"),
        None => false,
    }
}

#[instrument(skip(state))]
async fn proxy(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
) -> Result<Json<Value>, ApiError> {
    let endpoint = params.endpoint.unwrap_or_default();
    validate_endpoint(&endpoint)?;

    let data = state
        .proxy
        .fetch(&endpoint, cache_enabled(params.cache.as_deref()))
        .await?;
    Ok(Json(data))
}

#[instrument(skip(state))]
async fn stats(State(state): State<AppState>) -> Result<Json<StatsRecord>, ApiError> {
    let record = state.facade.load().await?;
    Ok(Json(StatsRecord::clone(&record)))
}

#[instrument(skip(state))]
async fn refresh_stats(State(state): State<AppState>) -> Result<Json<StatsRecord>, ApiError> {
    let record = state.facade.force_refresh().await?;
    Ok(Json(StatsRecord::clone(&record)))
}

#[instrument(skip(state))]
async fn retry_stats(State(state): State<AppState>) -> Result<Json<StatsRecord>, ApiError> {
    let record = state.facade.retry().await?;
    Ok(Json(StatsRecord::clone(&record)))
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let phase = state.facade.phase();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "phase": format!("{:?}", phase),
            "busy": phase.is_busy(),
        })),
    )
}
