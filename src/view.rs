//! Presentation-neutral view of a dashboard snapshot.
//!
//! Carries every derived value a front end needs (formatted strings,
//! percentages, bar widths, medal tiers) so renderers stay logic-free.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dashboard_state::{DashboardSnapshot, LoadStatus};
use crate::data_service::DataSource;
use crate::formatting::{format_metric_value, format_number, format_value};
use crate::models::{sorted_by_rank, DashboardData, SalesMetric, SalesRep};

/// Points unit used on both leaderboards.
const POINTS_UNIT: &str = "P";

fn bar_width(current: f64, target: f64) -> f64 {
    if target <= 0.0 || !current.is_finite() {
        return 0.0;
    }
    (current / target * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarTone {
    Achieved,
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMedal {
    Gold,
    Silver,
    Bronze,
    None,
}

impl RankMedal {
    pub fn for_rank(rank: u32) -> Self {
        match rank {
            1 => RankMedal::Gold,
            2 => RankMedal::Silver,
            3 => RankMedal::Bronze,
            _ => RankMedal::None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricView {
    pub label: String,
    pub current: String,
    pub target: String,
    pub progress_percent: u32,
    pub bar_width: f64,
    pub target_met: bool,
    pub tone: BarTone,
}

impl From<&SalesMetric> for MetricView {
    fn from(metric: &SalesMetric) -> Self {
        let target_met = metric.target_met();
        Self {
            label: metric.label.clone(),
            current: format_metric_value(metric, metric.current),
            target: format_metric_value(metric, metric.target),
            progress_percent: metric.progress_percent(),
            bar_width: bar_width(metric.current, metric.target),
            target_met,
            tone: if target_met {
                BarTone::Achieved
            } else {
                BarTone::InProgress
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalView {
    pub daily_target: String,
    pub daily_target_unit: String,
    pub period_current: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_official: Option<String>,
    pub period_target: String,
    pub period_remaining: String,
    pub period_unit: String,
    pub progress_percent: u32,
    pub bar_width: f64,
}

impl From<&DashboardData> for GoalView {
    fn from(data: &DashboardData) -> Self {
        let period = &data.period_progress;
        Self {
            daily_target: format_number(data.daily_target.target),
            daily_target_unit: data.daily_target.unit.clone(),
            period_current: format_number(period.current),
            period_official: period.official.map(format_number),
            period_target: format_number(period.target),
            period_remaining: format_number(period.remaining()),
            period_unit: period.unit.clone(),
            progress_percent: period.progress_percent(),
            bar_width: bar_width(period.current, period.target),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingRowView {
    pub rank: u32,
    pub name: String,
    pub points: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_count: Option<u32>,
    pub medal: RankMedal,
    /// Rank 1 is rendered distinctly.
    pub highlighted: bool,
}

impl From<&SalesRep> for RankingRowView {
    fn from(rep: &SalesRep) -> Self {
        Self {
            rank: rep.rank,
            name: rep.name.clone(),
            points: format_value(rep.points, Some(POINTS_UNIT)),
            award_count: rep.award_count,
            medal: RankMedal::for_rank(rep.rank),
            highlighted: rep.rank == 1,
        }
    }
}

pub fn ranking_rows(ranking: &[SalesRep]) -> Vec<RankingRowView> {
    sorted_by_rank(ranking)
        .iter()
        .map(RankingRowView::from)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardBody {
    pub goal: GoalView,
    pub metrics: Vec<MetricView>,
    pub monthly_ranking: Vec<RankingRowView>,
    pub daily_ranking: Vec<RankingRowView>,
}

impl From<&DashboardData> for DashboardBody {
    fn from(data: &DashboardData) -> Self {
        Self {
            goal: GoalView::from(data),
            metrics: data.individual_metrics.iter().map(MetricView::from).collect(),
            monthly_ranking: ranking_rows(&data.monthly_sales_ranking),
            daily_ranking: ranking_rows(&data.daily_sales_ranking),
        }
    }
}

/// Response envelope of `GET /api/v1/dashboard`.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    #[serde(flatten)]
    pub status: LoadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<DashboardBody>,
}

impl DashboardView {
    pub fn new(status: LoadStatus, snapshot: Option<&DashboardSnapshot>) -> Self {
        Self {
            status,
            source: snapshot.map(|s| s.source),
            fetched_at: snapshot.map(|s| s.fetched_at),
            dashboard: snapshot.map(|s| DashboardBody::from(s.data.as_ref())),
        }
    }
}
