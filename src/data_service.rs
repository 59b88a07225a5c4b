use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::fallback::fallback_dashboard_data;
use crate::models::DashboardData;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

/// Top-level fields a live payload must carry to be accepted.
pub const REQUIRED_FIELDS: [&str; 3] = ["periodProgress", "individualMetrics", "monthlySalesRanking"];

/// Where a refreshed snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Fallback,
}

/// Why a live fetch was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    /// Short category from `AppError::category`, exposed over HTTP.
    pub category: &'static str,
    /// Full error text including upstream status and body; logs only.
    pub detail: String,
}

impl From<&AppError> for RefreshFailure {
    fn from(err: &AppError) -> Self {
        Self {
            category: err.category(),
            detail: err.to_string(),
        }
    }
}

/// Result of one refresh cycle. Always carries renderable data.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub data: DashboardData,
    pub source: DataSource,
    /// Set when `source` is `Fallback`.
    pub failure: Option<RefreshFailure>,
}

/// Checks that the three required top-level fields are present and not `null`.
pub fn validate_dashboard_json(value: &Value) -> Result<(), AppError> {
    let object = value.as_object().ok_or_else(|| {
        AppError::InvalidPayload("dashboard payload is not a JSON object".to_string())
    })?;

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| object.get(*field).map_or(true, Value::is_null))
        .collect();

    if !missing.is_empty() {
        return Err(AppError::InvalidPayload(format!(
            "dashboard payload missing required fields: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Decodes a response body into dashboard data, applying the required-field check first.
pub fn parse_dashboard_body(body: &str) -> Result<DashboardData, AppError> {
    let value: Value = serde_json::from_str(body).context("dashboard body is not valid JSON")?;
    validate_dashboard_json(&value)?;
    let data: DashboardData =
        serde_json::from_value(value).context("dashboard payload has unexpected field types")?;
    Ok(data)
}

/// Fetches dashboard metrics from the spreadsheet-backed endpoint.
pub struct DashboardDataService {
    client: Client,
    data_url: String,
}

impl DashboardDataService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        // reqwest follows up to 10 redirects by default; the Apps Script endpoint relies on one
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create dashboard client: {}", e))
            })?;

        Ok(Self {
            client,
            data_url: config.dashboard_data_url.clone(),
        })
    }

    /// Fetches and validates live data. Every failure is returned, not absorbed.
    pub async fn fetch_live(&self) -> Result<DashboardData, AppError> {
        tracing::debug!("Fetching dashboard data from {}", self.data_url);

        let response = self.client.get(&self.data_url).send().await.map_err(|e| {
            AppError::ExternalApiError(format!("Dashboard request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Dashboard endpoint returned {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to read dashboard response: {}", e))
        })?;

        let data = parse_dashboard_body(&body)?;

        let violations = data.check_invariants();
        if !violations.is_empty() {
            tracing::warn!(
                "Live dashboard data accepted with {} invariant violation(s): {:?}",
                violations.len(),
                violations
            );
        }

        Ok(data)
    }

    /// Fetches live data, substituting the embedded snapshot on any failure.
    pub async fn refresh_with_outcome(&self) -> RefreshOutcome {
        match self.fetch_live().await {
            Ok(data) => {
                tracing::info!(
                    "Dashboard data refreshed: {} metrics, {} monthly / {} daily ranking rows",
                    data.individual_metrics.len(),
                    data.monthly_sales_ranking.len(),
                    data.daily_sales_ranking.len()
                );
                RefreshOutcome {
                    data,
                    source: DataSource::Live,
                    failure: None,
                }
            }
            Err(e) => {
                tracing::error!(
                    "Failed to fetch or parse live dashboard data, using fallback: {}",
                    e
                );
                RefreshOutcome {
                    data: fallback_dashboard_data(),
                    source: DataSource::Fallback,
                    failure: Some(RefreshFailure::from(&e)),
                }
            }
        }
    }

    /// Total refresh: always yields renderable data.
    pub async fn refresh(&self) -> DashboardData {
        self.refresh_with_outcome().await.data
    }
}
