use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::{PeriodProgress, SalesMetric, SalesRep};

/// Content fingerprint of the inputs the advice pipeline depends on.
///
/// Every refresh replaces the dashboard snapshot wholesale, so object
/// identity changes every cycle even when the numbers do not. Advice is
/// regenerated only when this fingerprint changes:
///
/// 1. The advice inputs are serialized to canonical JSON
/// 2. The JSON is hashed with SHA-256
/// 3. The hex digest is compared with the one from the last request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdviceInputFingerprint(String);

#[derive(Serialize)]
struct AdviceInputs<'a> {
    metrics: &'a [SalesMetric],
    period_progress: &'a PeriodProgress,
    daily_ranking: &'a [SalesRep],
}

impl AdviceInputFingerprint {
    pub fn of(
        metrics: &[SalesMetric],
        period_progress: &PeriodProgress,
        daily_ranking: &[SalesRep],
    ) -> Self {
        let inputs = AdviceInputs {
            metrics,
            period_progress,
            daily_ranking,
        };
        // Serializing plain structs of strings and numbers cannot fail
        let canonical = serde_json::to_string(&inputs).unwrap_or_default();
        Self(Self::compute_checksum(&canonical))
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::fallback_dashboard_data;

    fn fingerprint(data: &crate::models::DashboardData) -> AdviceInputFingerprint {
        AdviceInputFingerprint::of(
            &data.individual_metrics,
            &data.period_progress,
            &data.daily_sales_ranking,
        )
    }

    #[test]
    fn test_fingerprint_consistency() {
        let a = fallback_dashboard_data();
        let b = fallback_dashboard_data();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).as_str().len(), 64);
    }

    #[test]
    fn test_metric_change_changes_fingerprint() {
        let a = fallback_dashboard_data();
        let mut b = fallback_dashboard_data();
        b.individual_metrics[1].current += 1.0;
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_unrelated_sections_ignored() {
        let a = fallback_dashboard_data();
        let mut b = fallback_dashboard_data();
        b.daily_target.target = 1000.0;
        b.monthly_sales_ranking.clear();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }
}
