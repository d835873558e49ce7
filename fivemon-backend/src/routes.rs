use crate::AppState;
use crate::error::{AppError, ErrorResponse};
use crate::helpers::now;
use crate::validation;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_macros::debug_handler;
use chrono::{DateTime, Utc};
use fivemon_store::{HistorySample, Period, ServerStats, TrackedPlayer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const AVAILABLE_ENDPOINTS: &[&str] = &[
    "/api/server-info",
    "/api/players",
    "/api/search/:query",
    "/api/status",
    "/api/history",
    "/api/test",
];

/// Success envelope shared by every endpoint
#[derive(Serialize)]
pub(crate) struct ApiResponse<T> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerSection {
    address: String,
    online: bool,
    max_players: u32,
    last_update: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub(crate) struct PlayersSection {
    current: Vec<TrackedPlayer>,
    count: usize,
    peak: usize,
}

#[derive(Serialize)]
pub(crate) struct ServerInfoData {
    server: ServerSection,
    info: Value,
    players: PlayersSection,
    dynamic: Value,
    history: Vec<HistorySample>,
    stats: ServerStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayersData {
    players: Vec<TrackedPlayer>,
    count: usize,
    max_players: u32,
    last_update: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub(crate) struct SearchData {
    query: String,
    results: Vec<TrackedPlayer>,
    count: usize,
    total: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusData {
    online: bool,
    server_address: String,
    players: usize,
    max_players: u32,
    last_update: Option<DateTime<Utc>>,
    /// Seconds since the monitor started
    uptime: i64,
    version: &'static str,
}

#[derive(Deserialize)]
pub(crate) struct HistoryParams {
    period: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct TimeRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryData {
    history: Vec<HistorySample>,
    period: Period,
    time_range: TimeRange,
    total_points: usize,
    is_real_data: bool,
}

#[derive(Serialize)]
pub(crate) struct ApiTestResponse {
    success: bool,
    message: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
    endpoints: &'static [&'static str],
}

#[debug_handler]
pub(crate) async fn server_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let overview = state.store.overview(now()).await;
    let count = overview.players.len();

    ok(ServerInfoData {
        server: ServerSection {
            address: state.server_address.clone(),
            online: overview.online,
            max_players: state.max_players,
            last_update: overview.last_update,
        },
        info: overview.info,
        players: PlayersSection {
            current: overview.players,
            count,
            peak: overview.stats.peak_today,
        },
        dynamic: overview.dynamic,
        history: overview.history,
        stats: overview.stats,
    })
}

pub(crate) async fn players(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = state.store.players().await;

    ok(PlayersData {
        count: view.players.len(),
        players: view.players,
        max_players: state.max_players,
        last_update: view.last_update,
    })
}

#[debug_handler]
pub(crate) async fn search(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_search_query(&query)?;

    let found = state.store.search(&query).await?;

    Ok(ok(SearchData {
        query: found.query,
        count: found.results.len(),
        results: found.results,
        total: found.total,
    }))
}

pub(crate) async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.store.status(now()).await;

    ok(StatusData {
        online: status.online,
        server_address: state.server_address.clone(),
        players: status.players,
        max_players: state.max_players,
        last_update: status.last_update,
        uptime: status.uptime_secs,
        version: API_VERSION,
    })
}

#[debug_handler]
pub(crate) async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let period = validation::resolve_period(params.period.as_deref());
    let window = state.store.history(period, now()).await;
    let is_real_data = window.series.is_real();
    let history = window.series.into_samples();

    tracing::info!(
        points = history.len(),
        %period,
        real = is_real_data,
        "History sent ({} to {})",
        window.from,
        window.to
    );

    ok(HistoryData {
        total_points: history.len(),
        history,
        period: window.period,
        time_range: TimeRange {
            from: window.from,
            to: window.to,
        },
        is_real_data,
    })
}

pub(crate) async fn api_test() -> impl IntoResponse {
    Json(ApiTestResponse {
        success: true,
        message: "FiveM Monitor API operational",
        timestamp: now(),
        version: API_VERSION,
        endpoints: AVAILABLE_ENDPOINTS,
    })
}

pub(crate) async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::with_endpoints(
            "Endpoint not found",
            AVAILABLE_ENDPOINTS,
        )),
    )
}
