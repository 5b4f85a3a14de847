use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::article::Article;
use crate::dashboard::Dashboard;
use crate::error::{FeedError, ServiceError};
use crate::filters::FilterState;
use crate::live::ChannelState;
use crate::metrics::Metrics;
use crate::news_api::TrendingTopic;
use crate::reducer::FeedView;
use crate::stats::Stats;

#[derive(Clone)]
pub struct AppState {
    dashboard: Arc<Dashboard>,
}

/// Read-model surface for the presentation layer.
pub fn create_router(dashboard: Arc<Dashboard>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/feed", get(feed))
        .route("/stats", get(stats))
        .route("/filters", get(get_filters).post(set_filters))
        .route("/filters/reset", post(reset_filters))
        .route("/search", get(search))
        .route("/articles/{id}/select", post(select_article))
        .route("/selection", axum::routing::delete(clear_selection))
        .route("/connection", get(connection))
        .route("/trending", get(trending))
        .route("/stats/realtime", post(realtime_stats))
        .route("/fact-check", post(fact_check))
        .route("/preferences", get(preferences))
        .route("/preferences/dark-mode/toggle", post(toggle_dark_mode))
        .layer(CorsLayer::very_permissive())
        .with_state(AppState { dashboard })
}

/// Status router plus `/metrics` when a recorder is installed.
pub fn router(dashboard: Arc<Dashboard>, metrics: Option<&Metrics>) -> Router {
    let app = create_router(dashboard);
    match metrics {
        Some(m) => app.merge(m.router()),
        None => app,
    }
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<FeedError> for ApiError {
    fn from(e: FeedError) -> Self {
        let status = match e {
            FeedError::UnknownArticle(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: e.to_string(),
        }
    }
}

#[derive(serde::Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(serde::Serialize)]
struct ConnectionOut {
    state: ChannelState,
}

#[derive(serde::Deserialize)]
struct FactCheckIn {
    claim: String,
}

#[derive(serde::Serialize)]
struct RealtimeOut {
    stats: Stats,
    trending: Vec<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesOut {
    dark_mode: bool,
}

async fn feed(State(state): State<AppState>) -> Json<FeedView> {
    Json(state.dashboard.view())
}

async fn stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.dashboard.stats())
}

async fn get_filters(State(state): State<AppState>) -> Json<FilterState> {
    Json(state.dashboard.filters())
}

async fn set_filters(
    State(state): State<AppState>,
    Json(filters): Json<FilterState>,
) -> Result<Json<FeedView>, ApiError> {
    state.dashboard.set_filters(filters).await?;
    Ok(Json(state.dashboard.view()))
}

async fn reset_filters(State(state): State<AppState>) -> Result<Json<FeedView>, ApiError> {
    state.dashboard.reset_filters().await?;
    Ok(Json(state.dashboard.view()))
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<FeedView>, ApiError> {
    state.dashboard.search(&params.q).await?;
    Ok(Json(state.dashboard.view()))
}

async fn select_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Article>, ApiError> {
    let article = state.dashboard.select_article(&id).await?;
    Ok(Json(article))
}

async fn clear_selection(State(state): State<AppState>) -> StatusCode {
    state.dashboard.clear_selection();
    StatusCode::NO_CONTENT
}

async fn connection(State(state): State<AppState>) -> Json<ConnectionOut> {
    Json(ConnectionOut {
        state: state.dashboard.connection_state(),
    })
}

async fn trending(State(state): State<AppState>) -> Result<Json<Vec<TrendingTopic>>, ApiError> {
    Ok(Json(state.dashboard.trending_topics().await?))
}

async fn realtime_stats(State(state): State<AppState>) -> Result<Json<RealtimeOut>, ApiError> {
    let trending = state.dashboard.refresh_realtime_stats().await?;
    Ok(Json(RealtimeOut {
        stats: state.dashboard.stats(),
        trending,
    }))
}

async fn fact_check(
    State(state): State<AppState>,
    Json(body): Json<FactCheckIn>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.dashboard.fact_check(&body.claim).await?))
}

async fn preferences(State(state): State<AppState>) -> Json<PreferencesOut> {
    Json(PreferencesOut {
        dark_mode: state.dashboard.dark_mode(),
    })
}

async fn toggle_dark_mode(State(state): State<AppState>) -> Result<Json<PreferencesOut>, ApiError> {
    let dark_mode = state.dashboard.toggle_dark_mode().map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("{e:#}"),
    })?;
    Ok(Json(PreferencesOut { dark_mode }))
}
