//! Latest-wins state holders for the dashboard snapshot and the advice list.
//!
//! Both pipelines can overlap (a manual refresh racing the scheduled one,
//! advice requests fired by consecutive snapshots). Each request is stamped
//! with a sequence number when it starts; a completion is applied only if no
//! later-started request has been applied already.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::advice_service::GeminiAdviceService;
use crate::data_service::{DataSource, RefreshFailure, RefreshOutcome};
use crate::errors::{AdviceError, AdviceErrorKind};
use crate::fingerprint::AdviceInputFingerprint;
use crate::models::DashboardData;

/// Banner shown when a refresh fails after live data was obtained.
pub const STALE_DATA_BANNER: &str =
    "データの自動更新に失敗しました。古いデータが表示されている可能性があります。";

/// The snapshot currently offered to consumers.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub data: Arc<DashboardData>,
    pub source: DataSource,
    pub fetched_at: DateTime<Utc>,
    pub ticket: u64,
}

/// What the store did with a completed refresh.
#[derive(Debug, Clone)]
pub enum ApplyResult {
    /// The outcome replaced the current snapshot.
    Applied(DashboardSnapshot),
    /// Live data was kept because the refresh fell back; the stale banner is up.
    KeptStale,
    /// A later-started refresh was already applied.
    Superseded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    /// No refresh has completed yet.
    Loading,
    Ready {
        #[serde(skip_serializing_if = "Option::is_none")]
        banner: Option<String>,
    },
}

#[derive(Default)]
struct StoreInner {
    current: Option<DashboardSnapshot>,
    applied_ticket: u64,
    has_live_data: bool,
    stale_banner: Option<String>,
    last_failure: Option<RefreshFailure>,
}

/// Holds the latest accepted dashboard snapshot.
#[derive(Default)]
pub struct DashboardStore {
    next_ticket: AtomicU64,
    inner: RwLock<StoreInner>,
}

impl DashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a refresh at the moment it starts.
    pub fn begin_refresh(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn apply(&self, ticket: u64, outcome: RefreshOutcome) -> ApplyResult {
        let mut inner = self.inner.write().await;

        if ticket <= inner.applied_ticket {
            tracing::debug!(
                "Discarding refresh #{}: #{} already applied",
                ticket,
                inner.applied_ticket
            );
            return ApplyResult::Superseded;
        }
        inner.applied_ticket = ticket;
        inner.last_failure = outcome.failure.clone();

        match outcome.source {
            DataSource::Fallback if inner.has_live_data => {
                tracing::warn!("Refresh #{} failed; keeping previous live data", ticket);
                inner.stale_banner = Some(STALE_DATA_BANNER.to_string());
                ApplyResult::KeptStale
            }
            source => {
                if source == DataSource::Live {
                    inner.has_live_data = true;
                    inner.stale_banner = None;
                }
                let snapshot = DashboardSnapshot {
                    data: Arc::new(outcome.data),
                    source,
                    fetched_at: Utc::now(),
                    ticket,
                };
                inner.current = Some(snapshot.clone());
                ApplyResult::Applied(snapshot)
            }
        }
    }

    pub async fn snapshot(&self) -> Option<DashboardSnapshot> {
        self.inner.read().await.current.clone()
    }

    pub async fn status(&self) -> LoadStatus {
        let inner = self.inner.read().await;
        match inner.current {
            None => LoadStatus::Loading,
            Some(_) => LoadStatus::Ready {
                banner: inner.stale_banner.clone(),
            },
        }
    }

    /// Cause of the most recent live-fetch failure, for diagnostics.
    pub async fn last_failure(&self) -> Option<RefreshFailure> {
        self.inner.read().await.last_failure.clone()
    }
}

/// State of the advice list as seen by consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdviceState {
    Idle,
    Pending {
        generation: u64,
    },
    Ready {
        generation: u64,
        advice: Vec<String>,
        generated_at: DateTime<Utc>,
    },
    Failed {
        generation: u64,
        kind: AdviceErrorKind,
        message: String,
    },
}

impl AdviceState {
    fn from_result(generation: u64, result: Result<Vec<String>, AdviceError>) -> Self {
        match result {
            Ok(advice) => AdviceState::Ready {
                generation,
                advice,
                generated_at: Utc::now(),
            },
            Err(e) => AdviceState::Failed {
                generation,
                kind: e.kind(),
                message: e.user_message().to_string(),
            },
        }
    }
}

/// Runs advice generation for each new snapshot, superseding older requests.
pub struct AdviceCoordinator {
    service: Result<Arc<GeminiAdviceService>, AdviceError>,
    generation: AtomicU64,
    state: RwLock<AdviceState>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    last_fingerprint: Mutex<Option<AdviceInputFingerprint>>,
}

impl AdviceCoordinator {
    /// A constructor error (e.g. `MissingCredential`) is kept and reported on every request.
    pub fn new(service: Result<GeminiAdviceService, AdviceError>) -> Arc<Self> {
        if let Err(ref e) = service {
            tracing::error!("Advice generation disabled: {}", e);
        }
        Arc::new(Self {
            service: service.map(Arc::new),
            generation: AtomicU64::new(0),
            state: RwLock::new(AdviceState::Idle),
            in_flight: Mutex::new(None),
            last_fingerprint: Mutex::new(None),
        })
    }

    pub async fn state(&self) -> AdviceState {
        self.state.read().await.clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Requests advice only when the advice inputs differ from the last request.
    /// Returns the new generation, or `None` when inputs are unchanged.
    pub async fn on_snapshot(self: &Arc<Self>, data: Arc<DashboardData>) -> Option<u64> {
        let fingerprint = AdviceInputFingerprint::of(
            &data.individual_metrics,
            &data.period_progress,
            &data.daily_sales_ranking,
        );
        {
            let mut last = self.last_fingerprint.lock().await;
            if last.as_ref() == Some(&fingerprint) {
                tracing::debug!("Advice inputs unchanged ({}), skipping", fingerprint.as_str());
                return None;
            }
            *last = Some(fingerprint);
        }
        Some(self.request(data).await)
    }

    /// Starts a new advice request, cancelling the one in flight.
    pub async fn request(self: &Arc<Self>, data: Arc<DashboardData>) -> u64 {
        // Generations are handed out under the in-flight lock so they are issued in spawn order
        let mut in_flight = self.in_flight.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(previous) = in_flight.take() {
            if !previous.is_finished() {
                tracing::debug!("Cancelling superseded advice request");
                previous.abort();
            }
        }

        let service = match &self.service {
            Ok(service) => Arc::clone(service),
            Err(e) => {
                self.complete(generation, Err(e.clone())).await;
                return generation;
            }
        };

        *self.state.write().await = AdviceState::Pending { generation };

        let coordinator = Arc::clone(self);
        *in_flight = Some(tokio::spawn(async move {
            let ranking = data.daily_ranking_sorted();
            let result = service
                .generate_advice(&data.individual_metrics, &data.period_progress, &ranking)
                .await;
            coordinator.complete(generation, result).await;
        }));

        generation
    }

    async fn complete(&self, generation: u64, result: Result<Vec<String>, AdviceError>) {
        let mut state = self.state.write().await;
        if generation != self.current_generation() {
            tracing::debug!(
                "Discarding advice generation {} (current {})",
                generation,
                self.current_generation()
            );
            return;
        }
        if let Err(ref e) = result {
            tracing::error!("Advice generation {} failed: {}", generation, e);
            // A failed call must not suppress the retry on the next identical snapshot
            if *e != AdviceError::MissingCredential {
                *self.last_fingerprint.lock().await = None;
            }
        }
        *state = AdviceState::from_result(generation, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::fallback_dashboard_data;

    fn outcome(source: DataSource, marker: f64) -> RefreshOutcome {
        let mut data = fallback_dashboard_data();
        data.period_progress.current = marker;
        RefreshOutcome {
            data,
            source,
            failure: match source {
                DataSource::Live => None,
                DataSource::Fallback => Some(RefreshFailure {
                    category: "upstream_error",
                    detail: "boom".to_string(),
                }),
            },
        }
    }

    #[tokio::test]
    async fn test_loading_until_first_apply() {
        let store = DashboardStore::new();
        assert!(matches!(store.status().await, LoadStatus::Loading));
        assert!(store.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_initial_fallback_is_applied_without_banner() {
        let store = DashboardStore::new();
        let ticket = store.begin_refresh();
        let result = store.apply(ticket, outcome(DataSource::Fallback, 1.0)).await;

        assert!(matches!(result, ApplyResult::Applied(_)));
        assert!(matches!(store.status().await, LoadStatus::Ready { banner: None }));
        assert_eq!(store.snapshot().await.unwrap().source, DataSource::Fallback);
        assert_eq!(store.last_failure().await.map(|f| f.detail), Some("boom".to_string()));
    }

    #[tokio::test]
    async fn test_fallback_after_live_keeps_stale_data() {
        let store = DashboardStore::new();
        let first = store.begin_refresh();
        store.apply(first, outcome(DataSource::Live, 42.0)).await;

        let second = store.begin_refresh();
        let result = store.apply(second, outcome(DataSource::Fallback, 1.0)).await;

        assert!(matches!(result, ApplyResult::KeptStale));
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.source, DataSource::Live);
        assert_eq!(snapshot.data.period_progress.current, 42.0);
        match store.status().await {
            LoadStatus::Ready { banner } => assert_eq!(banner.as_deref(), Some(STALE_DATA_BANNER)),
            LoadStatus::Loading => panic!("expected ready status"),
        }

        // Next live refresh clears the banner
        let third = store.begin_refresh();
        store.apply(third, outcome(DataSource::Live, 43.0)).await;
        assert!(matches!(store.status().await, LoadStatus::Ready { banner: None }));
    }

    #[tokio::test]
    async fn test_latest_initiated_refresh_wins() {
        let store = DashboardStore::new();
        let older = store.begin_refresh();
        let newer = store.begin_refresh();

        assert!(matches!(
            store.apply(newer, outcome(DataSource::Live, 2.0)).await,
            ApplyResult::Applied(_)
        ));
        assert!(matches!(
            store.apply(older, outcome(DataSource::Live, 1.0)).await,
            ApplyResult::Superseded
        ));
        assert_eq!(store.snapshot().await.unwrap().data.period_progress.current, 2.0);
        assert_eq!(store.snapshot().await.unwrap().ticket, newer);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_spawning() {
        let coordinator = AdviceCoordinator::new(Err(AdviceError::MissingCredential));
        let generation = coordinator
            .on_snapshot(Arc::new(fallback_dashboard_data()))
            .await
            .unwrap();

        match coordinator.state().await {
            AdviceState::Failed {
                generation: g,
                kind,
                ..
            } => {
                assert_eq!(g, generation);
                assert_eq!(kind, AdviceErrorKind::MissingCredential);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(coordinator.in_flight.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_unchanged_inputs_skip_regeneration() {
        let coordinator = AdviceCoordinator::new(Err(AdviceError::MissingCredential));
        assert_eq!(
            coordinator.on_snapshot(Arc::new(fallback_dashboard_data())).await,
            Some(1)
        );
        assert_eq!(
            coordinator.on_snapshot(Arc::new(fallback_dashboard_data())).await,
            None
        );

        let mut changed = fallback_dashboard_data();
        changed.individual_metrics[0].current = 0.5;
        assert_eq!(coordinator.on_snapshot(Arc::new(changed)).await, Some(2));
    }

    #[tokio::test]
    async fn test_failed_generation_forgets_fingerprint() {
        let coordinator = AdviceCoordinator::new(Err(AdviceError::MissingCredential));
        let data = Arc::new(fallback_dashboard_data());
        coordinator.on_snapshot(Arc::clone(&data)).await;
        assert!(coordinator.last_fingerprint.lock().await.is_some());

        let generation = coordinator.current_generation();
        coordinator
            .complete(generation, Err(AdviceError::ProviderUnavailable("503".to_string())))
            .await;
        assert!(coordinator.last_fingerprint.lock().await.is_none());
        assert_eq!(coordinator.on_snapshot(data).await, Some(generation + 1));
    }

    #[tokio::test]
    async fn test_concurrent_requests_settle_on_latest_generation() {
        let coordinator = AdviceCoordinator::new(Err(AdviceError::MissingCredential));
        let data = Arc::new(fallback_dashboard_data());

        let (a, b) = tokio::join!(
            coordinator.request(Arc::clone(&data)),
            coordinator.request(Arc::clone(&data))
        );
        let latest = a.max(b);
        assert_eq!(coordinator.current_generation(), latest);
        match coordinator.state().await {
            AdviceState::Failed { generation, .. } => assert_eq!(generation, latest),
            other => panic!("expected failure for latest generation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stale_completion_discarded() {
        let coordinator = AdviceCoordinator::new(Err(AdviceError::MissingCredential));
        coordinator.generation.store(5, Ordering::SeqCst);

        coordinator
            .complete(4, Ok(vec!["old".to_string()]))
            .await;
        assert!(matches!(coordinator.state().await, AdviceState::Idle));

        coordinator
            .complete(5, Ok(vec!["new".to_string()]))
            .await;
        match coordinator.state().await {
            AdviceState::Ready { advice, .. } => assert_eq!(advice, vec!["new"]),
            other => panic!("expected ready, got {:?}", other),
        }
    }
}
