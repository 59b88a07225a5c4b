//! Embedded snapshot served when the live endpoint cannot be used.
//!
//! Doubles as the canonical example of a valid dashboard payload.

use crate::models::{
    DailyTarget, DashboardData, PeriodProgress, SalesMetric, SalesRep, RATE_METRIC_LABEL,
};

fn metric(label: &str, current: f64, target: f64, unit: &str) -> SalesMetric {
    SalesMetric {
        label: label.to_string(),
        current,
        target,
        unit: Some(unit.to_string()),
    }
}

fn rep(rank: u32, name: &str, points: f64, award_count: Option<u32>) -> SalesRep {
    SalesRep {
        rank,
        name: name.to_string(),
        points,
        award_count,
    }
}

pub fn fallback_dashboard_data() -> DashboardData {
    DashboardData {
        period_progress: PeriodProgress {
            current: 3700.0,
            target: 6500.0,
            unit: "P".to_string(),
            official: None,
        },
        daily_target: DailyTarget {
            target: 800.0,
            unit: "P".to_string(),
        },
        individual_metrics: vec![
            metric(RATE_METRIC_LABEL, 0.45, 0.60, "%"),
            metric("S対外", 18.0, 40.0, ""),
            metric("Y対外", 12.0, 30.0, ""),
            metric("MNP (ALL)", 30.0, 70.0, ""),
            metric("機種変", 65.0, 60.0, ""),
            metric("固定 (光・Air)", 7.0, 15.0, ""),
            metric("タブレット", 11.0, 25.0, ""),
            metric("でんき", 6.0, 12.0, ""),
            metric("PayPayカード", 22.0, 45.0, ""),
            metric("Apple Watch", 9.0, 20.0, ""),
            metric("Pixel Watch", 5.0, 10.0, ""),
            metric("アップグレード", 28.0, 50.0, ""),
            metric("セレクション売上", 1_250_000.0, 2_400_000.0, "円"),
        ],
        monthly_sales_ranking: vec![
            rep(1, "佐藤", 1250.0, None),
            rep(2, "鈴木", 980.0, None),
            rep(3, "高橋", 760.0, None),
        ],
        daily_sales_ranking: vec![
            rep(1, "佐藤", 310.0, Some(3)),
            rep(2, "高橋", 250.0, Some(5)),
            rep(3, "田中", 220.0, Some(1)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_satisfies_invariants() {
        let data = fallback_dashboard_data();
        assert!(data.check_invariants().is_empty());
        assert!(data.period_progress.target > 0.0);
        assert!(!data.individual_metrics.is_empty());
    }

    #[test]
    fn test_fallback_contains_one_met_target() {
        let data = fallback_dashboard_data();
        let met: Vec<&str> = data
            .individual_metrics
            .iter()
            .filter(|m| m.target_met())
            .map(|m| m.label.as_str())
            .collect();
        assert_eq!(met, vec!["機種変"]);
    }
}
