use crate::config::Config;
use crate::dashboard_state::{AdviceCoordinator, AdviceState, ApplyResult, DashboardStore};
use crate::data_service::DashboardDataService;
use crate::errors::AppError;
use crate::models::DashboardData;
use crate::poller::refresh_cycle;
use crate::view::DashboardView;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the dashboard data endpoint.
    pub data_service: DashboardDataService,
    /// Latest accepted dashboard snapshot and load status.
    pub store: DashboardStore,
    /// Advice generation, superseding older requests.
    pub advice: Arc<AdviceCoordinator>,
}

/// Health check endpoint.
///
/// Returns the service status, version and refresh schedule.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "sales-dashboard",
            "version": env!("CARGO_PKG_VERSION"),
            "refresh_interval_secs": state.config.refresh_interval_secs,
            "advice_enabled": state.config.gemini_api_key.is_some()
        })),
    )
}

async fn current_view(state: &AppState) -> DashboardView {
    let status = state.store.status().await;
    let snapshot = state.store.snapshot().await;
    DashboardView::new(status, snapshot.as_ref())
}

/// GET /api/v1/dashboard
///
/// Render-ready view of the current snapshot. Reports `loading` until the
/// first refresh completes.
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(current_view(&state).await)
}

/// GET /api/v1/dashboard/raw
///
/// The current snapshot in the upstream payload shape.
pub async fn get_dashboard_raw(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardData>, AppError> {
    let snapshot = state
        .store
        .snapshot()
        .await
        .ok_or_else(|| AppError::NotReady("Dashboard data is still loading".to_string()))?;
    Ok(Json(snapshot.data.as_ref().clone()))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub result: &'static str,
    /// Failure category only; upstream detail stays in the logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<&'static str>,
    pub view: DashboardView,
}

/// POST /api/v1/dashboard/refresh
///
/// Runs one refresh cycle immediately, outside the regular schedule.
pub async fn trigger_refresh(State(state): State<Arc<AppState>>) -> Json<RefreshResponse> {
    tracing::info!("POST /dashboard/refresh - manual refresh requested");

    let result = match refresh_cycle(&state).await {
        ApplyResult::Applied(_) => "applied",
        ApplyResult::KeptStale => "kept_stale",
        ApplyResult::Superseded => "superseded",
    };

    Json(RefreshResponse {
        result,
        failure: state.store.last_failure().await.map(|f| f.category),
        view: current_view(&state).await,
    })
}

/// GET /api/v1/advice
pub async fn get_advice(State(state): State<Arc<AppState>>) -> Json<AdviceState> {
    Json(state.advice.state().await)
}

/// POST /api/v1/advice/regenerate
///
/// Requests fresh advice for the current snapshot even when inputs are unchanged.
pub async fn regenerate_advice(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<AdviceState>), AppError> {
    let snapshot = state.store.snapshot().await.ok_or_else(|| {
        AppError::NotReady("Dashboard data is still loading; advice cannot be generated yet".to_string())
    })?;

    let generation = state.advice.request(Arc::clone(&snapshot.data)).await;
    tracing::info!("POST /advice/regenerate - started generation {}", generation);

    Ok((StatusCode::ACCEPTED, Json(state.advice.state().await)))
}
