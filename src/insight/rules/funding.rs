use chrono::{DateTime, Utc};

use crate::insight::InsightRule;
use crate::metrics::percent_change;
use crate::models::{InsightKind, NewInsight, Snapshot};

/// Watches the donation count across the last three snapshots for a
/// sustained decline or sustained momentum.
pub struct DonationTrendRule;

impl InsightRule for DonationTrendRule {
    fn name(&self) -> &'static str {
        "donation_trend"
    }

    fn evaluate(
        &self,
        window: &[Snapshot],
        _now: DateTime<Utc>,
    ) -> anyhow::Result<Option<NewInsight>> {
        if window.len() < 3 {
            return Ok(None);
        }
        let recent = &window[0].metrics;
        let previous = &window[1].metrics;
        let oldest = &window[2].metrics;

        let recent_change =
            percent_change(recent.total_donations as f64, previous.total_donations as f64);
        let previous_change =
            percent_change(previous.total_donations as f64, oldest.total_donations as f64);

        if recent_change < -15.0 && previous_change < -10.0 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Anomaly,
                category: "Funding".to_string(),
                title: "Sustained Donation Decline".to_string(),
                summary: format!(
                    "Donations have declined for consecutive periods: {recent_change:.1}% most \
                     recently, {previous_change:.1}% before that."
                ),
                details: format!(
                    "This sustained decline in donations requires attention. Current donation \
                     count: {}. Consider reviewing donor communication and engagement strategies.",
                    recent.total_donations
                ),
                confidence: 0.85,
                actionable: true,
                suggested_actions: vec![
                    "Review donor communication frequency and content".to_string(),
                    "Launch a re-engagement campaign for lapsed donors".to_string(),
                    "Analyze donor feedback and satisfaction".to_string(),
                    "Consider new fundraising channels or campaigns".to_string(),
                ],
                related_metrics: related_metrics(),
            }));
        }

        if recent_change > 25.0 && previous_change > 15.0 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Trend,
                category: "Funding".to_string(),
                title: "Strong Donation Momentum".to_string(),
                summary: format!(
                    "Donations showing strong growth: {recent_change:.1}% increase, following \
                     {previous_change:.1}% in the previous period."
                ),
                details: "This momentum in donations is excellent. Consider capitalizing on this \
                          success by analyzing what's working and scaling those efforts."
                    .to_string(),
                confidence: 0.85,
                actionable: true,
                suggested_actions: vec![
                    "Identify and replicate successful fundraising strategies".to_string(),
                    "Thank and recognize top donors".to_string(),
                    "Consider launching a matching gift campaign".to_string(),
                ],
                related_metrics: related_metrics(),
            }));
        }

        Ok(None)
    }
}

fn related_metrics() -> Vec<String> {
    vec![
        "total_donations".to_string(),
        "average_donation".to_string(),
        "total_sponsors".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::insight::testkit::snapshot_with;
    use crate::metrics::CoreMetrics;

    use super::*;

    fn window(recent: u64, previous: u64, oldest: u64) -> Vec<Snapshot> {
        [recent, previous, oldest]
            .into_iter()
            .map(|total_donations| {
                snapshot_with(CoreMetrics { total_donations, ..CoreMetrics::default() })
            })
            .collect()
    }

    #[test]
    fn needs_three_snapshots() {
        let rule = DonationTrendRule;
        let short = window(60, 80, 100);
        assert!(rule.evaluate(&short[..2], Utc::now()).unwrap().is_none());
    }

    #[test]
    fn flags_sustained_decline() {
        // 100 -> 80 is -20%, 80 -> 60 is -25%: both periods past their
        // floors.
        let rule = DonationTrendRule;
        let insight = rule.evaluate(&window(60, 80, 100), Utc::now()).unwrap().unwrap();

        assert_eq!(insight.kind, InsightKind::Anomaly);
        assert_eq!(insight.title, "Sustained Donation Decline");
        assert!(insight.summary.contains("-25.0% most recently"));
        assert!(insight.summary.contains("-20.0% before that"));
        assert!(insight.details.contains("Current donation count: 60"));
    }

    #[test]
    fn flags_sustained_momentum() {
        // 100 -> 120 is +20%, 120 -> 156 is +30%.
        let rule = DonationTrendRule;
        let insight = rule.evaluate(&window(156, 120, 100), Utc::now()).unwrap().unwrap();

        assert_eq!(insight.kind, InsightKind::Trend);
        assert_eq!(insight.title, "Strong Donation Momentum");
        assert!(insight.summary.contains("30.0% increase"));
    }

    #[test]
    fn single_bad_period_is_quiet() {
        // A one-off -20% after a flat period does not qualify as
        // sustained.
        let rule = DonationTrendRule;
        assert!(rule.evaluate(&window(80, 100, 100), Utc::now()).unwrap().is_none());
    }

    #[test]
    fn modest_growth_is_quiet() {
        let rule = DonationTrendRule;
        assert!(rule.evaluate(&window(120, 100, 85), Utc::now()).unwrap().is_none());
    }
}
