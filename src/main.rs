use std::net::SocketAddr;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sales_dashboard::advice_service::GeminiAdviceService;
use sales_dashboard::api;
use sales_dashboard::config::Config;
use sales_dashboard::dashboard_state::{AdviceCoordinator, DashboardStore};
use sales_dashboard::data_service::DashboardDataService;
use sales_dashboard::handlers::AppState;
use sales_dashboard::poller::run_refresh_poller;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the data and advice clients, starts
/// the refresh poller and serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sales_dashboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let data_service = DashboardDataService::new(&config)?;
    tracing::info!("✓ Dashboard data client initialized: {}", config.dashboard_data_url);

    // A missing key disables advice only; the dashboard keeps serving
    let advice_service = GeminiAdviceService::new(&config);
    if advice_service.is_ok() {
        tracing::info!("✓ Gemini advice client initialized (model {})", config.gemini_model);
    }
    let advice = AdviceCoordinator::new(advice_service);

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        data_service,
        store: DashboardStore::new(),
        advice,
    });

    // Initial load runs on the poller's first tick
    tokio::spawn(run_refresh_poller(
        Arc::clone(&app_state),
        config.refresh_interval(),
    ));
    tracing::info!(
        "Refresh poller started ({}s interval)",
        config.refresh_interval_secs
    );

    // Manual triggers: one request replenished every 10 seconds per IP, burst of 2
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(2)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let trigger_routes = api::trigger_routes().layer(
        ServiceBuilder::new()
            .layer(RequestBodyLimitLayer::new(64 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    let app = api::read_routes()
        .merge(trigger_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
