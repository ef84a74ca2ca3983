//! Axum router and all HTTP handlers for wgr-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Every ledger call runs on the blocking pool.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::error;
use wgr_engine::{CancelRequest, GameSubmission, SettleRequest};
use wgr_runtime::{DeficitOrder, LedgerRuntime, RuntimeError, RuntimeResult};

use crate::{
    api_types::{DeficitQuery, ErrorResponse, HealthResponse, RollingQuery, SportsResponse},
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/sports", get(sports))
        .route("/v1/games", post(submit_game))
        .route("/v1/games/settle", post(settle_game))
        .route("/v1/games/cancel", post(cancel_game))
        .route("/v1/pending", get(list_pending).delete(clear_pending))
        .route("/v1/pending/cleanup", post(cleanup_pending))
        .route("/v1/pending/:index", delete(delete_pending))
        .route("/v1/deficits", get(list_deficits).delete(clear_deficits))
        .route("/v1/deficits/:index", delete(delete_deficit_at))
        .route(
            "/v1/deficits/by-timestamp/:settled_at",
            delete(delete_deficit_by_timestamp),
        )
        .route("/v1/settled", get(list_settled).delete(reset_settled))
        .route("/v1/stats/rolling", get(rolling_stats))
        .route("/v1/stats/daily", get(daily_stats))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Every handler failure. Caller mistakes map to 400, ledger failures to 500.
#[derive(Debug)]
pub enum ApiError {
    Ledger(RuntimeError),
    /// Body or query did not decode.
    BadRequest(String),
    Internal(String),
}

impl From<RuntimeError> for ApiError {
    fn from(e: RuntimeError) -> Self {
        Self::Ledger(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, msg) = match &self {
            ApiError::Ledger(e) if e.is_rejection() => (StatusCode::BAD_REQUEST, e.kind(), e.to_string()),
            ApiError::Ledger(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.kind(), e.to_string()),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "validation", m.clone()),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m.clone()),
        };
        if status.is_server_error() {
            error!(kind, error = %msg, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: msg,
                kind: kind.to_string(),
            }),
        )
            .into_response()
    }
}

/// Run a ledger call on the blocking pool.
async fn blocking<T, F>(st: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&LedgerRuntime) -> RuntimeResult<T> + Send + 'static,
{
    let ledger = Arc::clone(&st.ledger);
    tokio::task::spawn_blocking(move || f(&ledger))
        .await
        .map_err(|e| ApiError::Internal(format!("ledger task failed: {e}")))?
        .map_err(ApiError::from)
}

fn parse_index(raw: &str) -> Result<usize, ApiError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ApiError::BadRequest(format!("invalid index '{raw}'")))
}

// ---------------------------------------------------------------------------
// GET /v1/health, GET /v1/sports
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

pub(crate) async fn sports(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(SportsResponse {
        sports: st.sports.clone(),
    })
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

pub(crate) async fn submit_game(
    State(st): State<Arc<AppState>>,
    body: Result<Json<GameSubmission>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(submission) = body?;
    let out = blocking(&st, move |l| l.submit_game(&submission)).await?;
    st.announce("submit", "pending");
    Ok((StatusCode::OK, Json(out)).into_response())
}

pub(crate) async fn settle_game(
    State(st): State<Arc<AppState>>,
    body: Result<Json<SettleRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let out = blocking(&st, move |l| l.settle(&req)).await?;
    st.announce("settle", "settled");
    Ok((StatusCode::OK, Json(out)).into_response())
}

pub(crate) async fn cancel_game(
    State(st): State<Arc<AppState>>,
    body: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let out = blocking(&st, move |l| l.cancel(&req)).await?;
    st.announce("cancel", "deficits");
    Ok((StatusCode::OK, Json(out)).into_response())
}

// ---------------------------------------------------------------------------
// Pending
// ---------------------------------------------------------------------------

pub(crate) async fn list_pending(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let view = blocking(&st, |l| l.list_pending()).await?;
    Ok(Json(view).into_response())
}

pub(crate) async fn delete_pending(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let index = parse_index(&raw)?;
    let removed = blocking(&st, move |l| l.delete_pending(index)).await?;
    st.announce("delete_pending", "pending");
    Ok(Json(removed).into_response())
}

pub(crate) async fn clear_pending(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let out = blocking(&st, |l| l.clear_pending()).await?;
    st.announce("clear_pending", "pending");
    Ok(Json(out).into_response())
}

pub(crate) async fn cleanup_pending(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let out = blocking(&st, |l| l.cleanup_orphans()).await?;
    if out.removed > 0 {
        st.announce("cleanup_orphans", "pending");
    }
    Ok(Json(out).into_response())
}

// ---------------------------------------------------------------------------
// Deficits
// ---------------------------------------------------------------------------

pub(crate) async fn list_deficits(
    State(st): State<Arc<AppState>>,
    query: Result<Query<DeficitQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let order = match q.sort.as_deref().map(str::trim) {
        None | Some("") => DeficitOrder::Stored,
        Some("combined") => DeficitOrder::Combined,
        Some(other) => return Err(ApiError::BadRequest(format!("unknown sort '{other}'"))),
    };
    let view = blocking(&st, move |l| l.list_deficits(order)).await?;
    Ok(Json(view).into_response())
}

pub(crate) async fn delete_deficit_at(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let index = parse_index(&raw)?;
    let view = blocking(&st, move |l| l.delete_deficit_at(index)).await?;
    st.announce("delete_deficit", "deficits");
    Ok(Json(view).into_response())
}

pub(crate) async fn delete_deficit_by_timestamp(
    State(st): State<Arc<AppState>>,
    Path(settled_at): Path<String>,
) -> Result<Response, ApiError> {
    let view = blocking(&st, move |l| l.delete_deficit_by_timestamp(&settled_at)).await?;
    st.announce("delete_deficit", "deficits");
    Ok(Json(view).into_response())
}

pub(crate) async fn clear_deficits(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let view = blocking(&st, |l| l.clear_deficits()).await?;
    st.announce("clear_deficits", "deficits");
    Ok(Json(view).into_response())
}

// ---------------------------------------------------------------------------
// Settled
// ---------------------------------------------------------------------------

pub(crate) async fn list_settled(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let settled = blocking(&st, |l| l.list_settled()).await?;
    Ok(Json(settled).into_response())
}

pub(crate) async fn reset_settled(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let settled = blocking(&st, |l| l.reset_settled()).await?;
    st.announce("reset_settled", "settled");
    Ok(Json(settled).into_response())
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

pub(crate) async fn rolling_stats(
    State(st): State<Arc<AppState>>,
    query: Result<Query<RollingQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let net = blocking(&st, move |l| l.rolling_net(q.hours)).await?;
    Ok(Json(net).into_response())
}

pub(crate) async fn daily_stats(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let rows = blocking(&st, |l| l.daily_stats()).await?;
    Ok(Json(rows).into_response())
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::LedgerChanged { .. } => "ledger",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
