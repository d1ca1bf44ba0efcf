use chrono::{DateTime, Utc};

use crate::insight::InsightRule;
use crate::models::{InsightKind, NewInsight, Snapshot};

/// Flags a partner network where too few organizations are actively
/// engaged.
pub struct OrgNetworkHealthRule;

impl InsightRule for OrgNetworkHealthRule {
    fn name(&self) -> &'static str {
        "org_network_health"
    }

    fn evaluate(
        &self,
        window: &[Snapshot],
        _now: DateTime<Utc>,
    ) -> anyhow::Result<Option<NewInsight>> {
        let Some(recent) = window.first() else {
            return Ok(None);
        };
        let total = recent.metrics.total_organizations;
        let active = recent.metrics.active_organizations;
        let active_ratio = if total > 0 { (active as f64 / total as f64) * 100.0 } else { 0.0 };

        if active_ratio < 60.0 && total > 20 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Recommendation,
                category: "Network Health".to_string(),
                title: "Low Organization Engagement".to_string(),
                summary: format!(
                    "Only {active_ratio:.1}% of partner organizations are actively engaged."
                ),
                details: format!(
                    "Out of {total} organizations in the network, only {active} are actively \
                     participating. Re-engagement efforts may be needed."
                ),
                confidence: 0.8,
                actionable: true,
                suggested_actions: vec![
                    "Reach out to inactive organizations".to_string(),
                    "Survey organizations to understand barriers".to_string(),
                    "Create engagement incentives or recognition programs".to_string(),
                    "Review onboarding process for new organizations".to_string(),
                ],
                related_metrics: vec![
                    "total_organizations".to_string(),
                    "active_organizations".to_string(),
                ],
            }));
        }

        Ok(None)
    }
}
