use serde::{Deserialize, Serialize};

/// Label of the metric whose values are fractions in [0, 1] shown as percentages.
pub const RATE_METRIC_LABEL: &str = "ペイトク加入率";

/// Unit that marks a value as a fraction rendered as a percentage.
pub const PERCENT_UNIT: &str = "%";

/// Ratio of achieved to target as a rounded percentage; 0 when `target <= 0`.
pub fn progress_percent(current: f64, target: f64) -> u32 {
    if target <= 0.0 || !current.is_finite() || !target.is_finite() {
        return 0;
    }
    let percent = (current / target * 100.0).round();
    if percent <= 0.0 {
        0
    } else if percent >= u32::MAX as f64 {
        u32::MAX
    } else {
        percent as u32
    }
}

/// `true` only when a positive target has been reached.
pub fn is_target_met(current: f64, target: f64) -> bool {
    target > 0.0 && current >= target
}

/// Cumulative progress toward a period-level goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodProgress {
    pub current: f64,
    pub target: f64,
    pub unit: String,
    /// Confirmed subset of `current`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official: Option<f64>,
}

impl PeriodProgress {
    pub fn progress_percent(&self) -> u32 {
        progress_percent(self.current, self.target)
    }

    pub fn remaining(&self) -> f64 {
        (self.target - self.current).max(0.0)
    }
}

/// Today's goal. Today's actual is not tracked here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTarget {
    pub target: f64,
    pub unit: String,
}

/// One named KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesMetric {
    pub label: String,
    pub current: f64,
    pub target: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl SalesMetric {
    pub fn is_rate(&self) -> bool {
        self.label == RATE_METRIC_LABEL || self.unit.as_deref() == Some(PERCENT_UNIT)
    }

    pub fn progress_percent(&self) -> u32 {
        progress_percent(self.current, self.target)
    }

    pub fn target_met(&self) -> bool {
        is_target_met(self.current, self.target)
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesRep {
    pub rank: u32,
    pub name: String,
    pub points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award_count: Option<u32>,
}

/// Aggregate root produced by a refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub period_progress: PeriodProgress,
    #[serde(default)]
    pub daily_target: DailyTarget,
    pub individual_metrics: Vec<SalesMetric>,
    pub monthly_sales_ranking: Vec<SalesRep>,
    #[serde(default)]
    pub daily_sales_ranking: Vec<SalesRep>,
}

impl DashboardData {
    /// Returns one message per violated shape invariant; empty when the snapshot is sound.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if let Some(official) = self.period_progress.official {
            if official > self.period_progress.current {
                violations.push(format!(
                    "periodProgress.official ({}) exceeds current ({})",
                    official, self.period_progress.current
                ));
            }
        }

        check_ranking("monthlySalesRanking", &self.monthly_sales_ranking, &mut violations);
        check_ranking("dailySalesRanking", &self.daily_sales_ranking, &mut violations);

        violations
    }

    /// Daily ranking in rank order, as consumed by the advice prompt.
    pub fn daily_ranking_sorted(&self) -> Vec<SalesRep> {
        sorted_by_rank(&self.daily_sales_ranking)
    }
}

pub fn sorted_by_rank(ranking: &[SalesRep]) -> Vec<SalesRep> {
    let mut sorted = ranking.to_vec();
    sorted.sort_by_key(|rep| rep.rank);
    sorted
}

fn check_ranking(name: &str, ranking: &[SalesRep], violations: &mut Vec<String>) {
    let sorted = sorted_by_rank(ranking);

    for rep in &sorted {
        if rep.rank == 0 {
            violations.push(format!("{}: rank must be 1-based ({})", name, rep.name));
        }
    }

    for pair in sorted.windows(2) {
        let (higher, lower) = (&pair[0], &pair[1]);
        if higher.rank == lower.rank {
            violations.push(format!("{}: duplicate rank {}", name, higher.rank));
        } else if higher.points < lower.points {
            violations.push(format!(
                "{}: rank {} has fewer points than rank {}",
                name, higher.rank, lower.rank
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(rank: u32, name: &str, points: f64) -> SalesRep {
        SalesRep {
            rank,
            name: name.to_string(),
            points,
            award_count: None,
        }
    }

    #[test]
    fn test_progress_percent_zero_target() {
        assert_eq!(progress_percent(10.0, 0.0), 0);
        assert_eq!(progress_percent(10.0, -5.0), 0);
    }

    #[test]
    fn test_progress_percent_rounds() {
        assert_eq!(progress_percent(3700.0, 6500.0), 57);
        assert_eq!(progress_percent(65.0, 60.0), 108);
        assert_eq!(progress_percent(0.45, 0.60), 75);
    }

    #[test]
    fn test_target_met_requires_positive_target() {
        assert!(is_target_met(65.0, 60.0));
        assert!(is_target_met(60.0, 60.0));
        assert!(!is_target_met(59.0, 60.0));
        assert!(!is_target_met(0.0, 0.0));
    }

    #[test]
    fn test_rate_metric_detection() {
        let by_label = SalesMetric {
            label: RATE_METRIC_LABEL.to_string(),
            current: 0.45,
            target: 0.6,
            unit: None,
        };
        let by_unit = SalesMetric {
            label: "成約率".to_string(),
            current: 0.2,
            target: 0.3,
            unit: Some("%".to_string()),
        };
        let count = SalesMetric {
            label: "MNP (ALL)".to_string(),
            current: 30.0,
            target: 70.0,
            unit: Some(String::new()),
        };
        assert!(by_label.is_rate());
        assert!(by_unit.is_rate());
        assert!(!count.is_rate());
    }

    #[test]
    fn test_deserialize_defaults_optional_sections() {
        let data: DashboardData = serde_json::from_value(serde_json::json!({
            "periodProgress": { "current": 1, "target": 2, "unit": "P" },
            "individualMetrics": [],
            "monthlySalesRanking": [{ "rank": 1, "name": "佐藤", "points": 10, "awardCount": 2 }]
        }))
        .unwrap();

        assert_eq!(data.daily_target, DailyTarget::default());
        assert!(data.daily_sales_ranking.is_empty());
        assert_eq!(data.monthly_sales_ranking[0].award_count, Some(2));
    }

    #[test]
    fn test_invariant_violations_reported() {
        let mut data: DashboardData = serde_json::from_value(serde_json::json!({
            "periodProgress": { "current": 10, "target": 20, "unit": "P", "official": 15 },
            "individualMetrics": [],
            "monthlySalesRanking": []
        }))
        .unwrap();
        data.monthly_sales_ranking = vec![rep(1, "a", 5.0), rep(2, "b", 9.0)];
        data.daily_sales_ranking = vec![rep(1, "a", 5.0), rep(1, "b", 4.0), rep(0, "c", 9.0)];

        let violations = data.check_invariants();
        assert_eq!(violations.len(), 4);
        assert!(violations.iter().any(|v| v.contains("official")));
        assert!(violations.iter().any(|v| v.contains("fewer points")));
        assert!(violations.iter().any(|v| v.contains("duplicate rank 1")));
        assert!(violations.iter().any(|v| v.contains("1-based")));
    }
}
