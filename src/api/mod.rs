// Thin namespace wrapper for API-layer components
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub mod handlers {
    pub use crate::handlers::*;
}

use crate::handlers::AppState;

/// Read-only routes, safe to poll from every open dashboard.
pub fn read_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/dashboard", get(handlers::get_dashboard))
        .route("/api/v1/dashboard/raw", get(handlers::get_dashboard_raw))
        .route("/api/v1/advice", get(handlers::get_advice))
}

/// Routes that trigger upstream calls; callers should rate limit these.
pub fn trigger_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/dashboard/refresh", post(handlers::trigger_refresh))
        .route("/api/v1/advice/regenerate", post(handlers::regenerate_advice))
}
