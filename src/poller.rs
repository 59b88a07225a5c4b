//! Background dashboard refresh poller.
//!
//! Refreshes once at startup, then every `refresh_interval`. Each accepted
//! snapshot is handed to the advice coordinator.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::dashboard_state::ApplyResult;
use crate::handlers::AppState;

/// Runs one fetch-and-apply cycle.
pub async fn refresh_cycle(state: &AppState) -> ApplyResult {
    let ticket = state.store.begin_refresh();
    let outcome = state.data_service.refresh_with_outcome().await;
    let result = state.store.apply(ticket, outcome).await;

    match &result {
        ApplyResult::Applied(snapshot) => {
            tracing::info!(
                "Refresh #{} applied ({:?} data)",
                snapshot.ticket,
                snapshot.source
            );
            state.advice.on_snapshot(Arc::clone(&snapshot.data)).await;
        }
        ApplyResult::KeptStale => {
            tracing::warn!("Refresh #{} failed; serving stale data", ticket);
        }
        ApplyResult::Superseded => {
            tracing::debug!("Refresh #{} superseded by a newer refresh", ticket);
        }
    }

    result
}

/// Long-lived refresh loop. The first tick fires immediately.
pub async fn run_refresh_poller(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        refresh_cycle(&state).await;
    }
}
