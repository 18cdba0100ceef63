//! HTTP surface for practice streaks.
//!
//! Routes:
//! - `GET /health`
//! - `GET /metrics` (Prometheus text)
//! - `GET /users/{id}/streak?tzOffset=&now=`
//! - `GET /goals/next?current=`
//! - `POST /notifications/due`
//! - `POST /notifications/preferences/validate`
//!
//! Everything except `/health` goes through the fixed-window rate limiter.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::debug_handler;
use axum::extract::{ConnectInfo, Path, Query, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;

use yoga_streak::notifications::{
    MAX_TIMEZONE_OFFSET_MINUTES, NotificationPreference, select_due_notifications,
    validate_preference_input,
};
use yoga_streak::rate_limit::RateLimiter;
use yoga_streak::validation::ObjectValidation;
use yoga_streak::{ActivityStreakSummary, NextGoal, StreakService, build_next_goal_from_activity_streak};

pub mod error;

pub use error::{ApiError, ApiResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ANONYMOUS_CLIENT: &str = "anonymous";

pub struct AppState {
    pub streaks: StreakService,
    pub limiter: Arc<RateLimiter>,
    pub metrics: PrometheusHandle,
    pub notify_tolerance_minutes: u32,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/metrics", get(metrics_endpoint))
        .route("/users/{id}/streak", get(get_streak))
        .route("/goals/next", get(get_next_goal))
        .route("/notifications/due", post(due_notifications))
        .route(
            "/notifications/preferences/validate",
            post(validate_preferences),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.render();
    ([("content-type", "text/plain; version=0.0.4")], body)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakQuery {
    pub tz_offset: Option<i32>,
    pub now: Option<String>,
}

#[debug_handler]
async fn get_streak(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<StreakQuery>,
) -> ApiResult<Json<ActivityStreakSummary>> {
    let offset = parse_offset(query.tz_offset)?;
    let now = parse_now(query.now.as_deref())?;
    if user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user id is empty".into()));
    }

    metrics::counter!("streak_requests_total").increment(1);
    let summary = state.streaks.summary_for(&user_id, offset, now).await;
    tracing::info!(
        %user_id,
        tz_offset = offset,
        current = summary.status.current_streak,
        at_risk = summary.status.is_at_risk,
        "streak summary served"
    );
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct GoalQuery {
    pub current: u32,
}

async fn get_next_goal(Query(query): Query<GoalQuery>) -> Json<NextGoal> {
    Json(build_next_goal_from_activity_streak(query.current))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueRequest {
    pub preferences: Vec<NotificationPreference>,
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DueResponse {
    pub due: Vec<String>,
}

#[debug_handler]
async fn due_notifications(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DueRequest>,
) -> Json<DueResponse> {
    let now = req.now.unwrap_or_else(Utc::now);
    let due = select_due_notifications(&req.preferences, now, state.notify_tolerance_minutes);
    Json(DueResponse { due })
}

#[derive(Debug, Serialize)]
struct ValidationResponse {
    valid: bool,
    #[serde(flatten)]
    result: ObjectValidation,
}

async fn validate_preferences(Json(input): Json<serde_json::Value>) -> ApiResult<impl IntoResponse> {
    let result = validate_preference_input(&input);
    if !result.is_valid() {
        return Err(ApiError::Validation(result));
    }
    Ok(Json(ValidationResponse {
        valid: true,
        result,
    }))
}

fn parse_offset(raw: Option<i32>) -> ApiResult<i32> {
    let offset = raw.unwrap_or(0);
    if offset.abs() > MAX_TIMEZONE_OFFSET_MINUTES {
        return Err(ApiError::BadRequest(format!(
            "tzOffset must be between -{MAX_TIMEZONE_OFFSET_MINUTES} and {MAX_TIMEZONE_OFFSET_MINUTES}"
        )));
    }
    Ok(offset)
}

fn parse_now(raw: Option<&str>) -> ApiResult<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ApiError::BadRequest(format!("invalid now: {s}"))),
    }
}

/// Identify the caller: first `x-forwarded-for` hop, then the peer address.
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

async fn rate_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);
    let decision = state.limiter.check(&key);

    if !decision.allowed {
        metrics::counter!("rate_limited_total").increment(1);
        tracing::warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
        let retry_secs = decision.retry_after.as_secs()
            + u64::from(decision.retry_after.subsec_nanos() > 0);
        let mut resp = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({ "error": "too many requests" })),
        )
            .into_response();
        resp.headers_mut()
            .insert("retry-after", HeaderValue::from(retry_secs));
        return resp;
    }

    let mut resp = next.run(request).await;
    resp.headers_mut()
        .insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    resp
}
