//! Herdbook HTTP REST API
//!
//! Axum-based HTTP server exposing AMU analytics and insights for the
//! livestock a farm owner manages.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to an
//! inner function returning `(StatusCode, serde_json::Value)`. The inner
//! functions are directly testable without axum dispatch.
//!
//! Caller identity comes from the fronting authentication layer in the
//! `x-user-id` header. Requests without a valid id are rejected with 401.
//!
//! Endpoints:
//! - GET  /health                        — health check with store status
//! - GET  /version                       — server version info
//! - GET  /amu-insights/chart-data       — monthly AMU usage chart
//! - POST /amu-insights/generate         — narrative AMU insights

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use herd_core::{CallerRole, CompletionBackend, FarmStore, HerdConfig};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::subsystems::analytics::{chart_for_livestock, require_owner, AnalyticsError};
use crate::subsystems::insights::insights_for_livestock;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<dyn FarmStore>,
    pub insights: Arc<dyn CompletionBackend>,
    pub config: HerdConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/amu-insights/chart-data", get(chart_data_handler))
        .route("/amu-insights/generate", post(generate_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let store_name = state.store.name().to_string();

    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(store = %store_name, "Herdbook HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ChartQuery {
    pub livestock_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerateRequest {
    /// Accepted as a JSON number or a numeric string.
    pub livestock_id: Option<serde_json::Value>,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }

    pub fn into_body(self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error,
            "status": self.status,
        })
    }
}

fn error_reply(status: StatusCode, msg: impl Into<String>) -> (StatusCode, serde_json::Value) {
    (status, ErrorResponse::new(msg).into_body())
}

// ============================================================================
// Caller extraction
// ============================================================================

/// Authenticated user id taken from the `x-user-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub i64);

impl CallerId {
    pub fn from_header(value: Option<&str>) -> Option<Self> {
        value?.trim().parse::<i64>().ok().map(CallerId)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok());

        CallerId::from_header(header).ok_or_else(|| {
            let (status, body) = error_reply(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            );
            (status, Json(body))
        })
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — queries the store and returns (status_code, json_body).
pub async fn health_inner(store: &dyn FarmStore) -> (StatusCode, serde_json::Value) {
    match store.health_check().await {
        Ok(database) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "database": database,
                "store": store.name(),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "herd/1",
    })
}

/// Inner chart data — owner check, id validation, then the analytics pipeline
/// over the window ending at `now`.
pub async fn chart_data_inner(
    store: &dyn FarmStore,
    config: &HerdConfig,
    caller: CallerId,
    query: ChartQuery,
    now: DateTime<Utc>,
) -> (StatusCode, serde_json::Value) {
    let role = match resolve_owner(store, caller).await {
        Ok(role) => role,
        Err(reply) => return reply,
    };

    let Some(livestock_id) = query.livestock_id.as_deref().and_then(parse_livestock_id) else {
        return error_reply(StatusCode::BAD_REQUEST, "livestock_id is required");
    };

    match chart_for_livestock(
        store,
        &role,
        livestock_id,
        now,
        config.analytics.window_days,
    )
    .await
    {
        Ok(payload) => match serde_json::to_value(&payload) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
        Err(e) => analytics_error_reply(e),
    }
}

/// Inner generate — same access rules as chart data; once access is granted
/// the provider outcome is always a 200 with text.
pub async fn generate_inner(
    store: &dyn FarmStore,
    backend: &dyn CompletionBackend,
    caller: CallerId,
    req: GenerateRequest,
) -> (StatusCode, serde_json::Value) {
    let role = match resolve_owner(store, caller).await {
        Ok(role) => role,
        Err(reply) => return reply,
    };

    let livestock_id = match req.livestock_id {
        Some(serde_json::Value::Number(n)) => n.as_i64().filter(|id| *id > 0),
        Some(serde_json::Value::String(s)) => parse_livestock_id(&s),
        _ => None,
    };
    let Some(livestock_id) = livestock_id else {
        return error_reply(StatusCode::BAD_REQUEST, "livestock_id is required.");
    };

    match insights_for_livestock(store, backend, &role, livestock_id).await {
        Ok(insights) => (StatusCode::OK, serde_json::json!({ "insights": insights })),
        Err(e) => analytics_error_reply(e),
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn chart_data_handler(
    State(state): State<Arc<HttpState>>,
    caller: CallerId,
    Query(query): Query<ChartQuery>,
) -> impl IntoResponse {
    let (status, body) =
        chart_data_inner(state.store.as_ref(), &state.config, caller, query, Utc::now()).await;
    (status, Json(body))
}

/// A body that is absent or not JSON is treated as carrying no id, so it
/// gets the same JSON 400 as a missing `livestock_id`.
pub async fn generate_handler(
    State(state): State<Arc<HttpState>>,
    caller: CallerId,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable generate request body");
            GenerateRequest::default()
        }
    };

    let (status, body) =
        generate_inner(state.store.as_ref(), state.insights.as_ref(), caller, req).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve the caller's role and require farm ownership.
async fn resolve_owner(
    store: &dyn FarmStore,
    caller: CallerId,
) -> std::result::Result<CallerRole, (StatusCode, serde_json::Value)> {
    let role = store
        .resolve_caller(caller.0)
        .await
        .map_err(|e| analytics_error_reply(e.into()))?;

    require_owner(&role).map_err(analytics_error_reply)?;
    Ok(role)
}

/// Positive integer id, or `None` for empty or non-numeric input.
pub fn parse_livestock_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

/// Map an analytics failure onto its HTTP status.
pub fn analytics_error_reply(e: AnalyticsError) -> (StatusCode, serde_json::Value) {
    match e {
        AnalyticsError::Forbidden => error_reply(StatusCode::FORBIDDEN, e.to_string()),
        AnalyticsError::LivestockNotFound => error_reply(StatusCode::NOT_FOUND, e.to_string()),
        AnalyticsError::Store(ref inner) => {
            tracing::error!(error = %inner, "Record store failure");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
