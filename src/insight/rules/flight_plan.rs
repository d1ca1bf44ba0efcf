use chrono::{DateTime, Utc};

use crate::insight::InsightRule;
use crate::metrics::{days_until_flight_plan_end, format_count, FLIGHT_PLAN_GOAL_LIVES};
use crate::models::{InsightKind, NewInsight, Snapshot};

/// Projects whether the current lives-impacted pace reaches the 2030
/// goal, comparing the recent daily rate against the rate still needed.
pub struct FlightPlanProjectionRule;

impl InsightRule for FlightPlanProjectionRule {
    fn name(&self) -> &'static str {
        "flight_plan_projection"
    }

    fn evaluate(
        &self,
        window: &[Snapshot],
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<NewInsight>> {
        if window.len() < 2 {
            return Ok(None);
        }
        let recent = &window[0].metrics;
        let previous = &window[1].metrics;

        let lives = recent.lives_impacted as f64;
        let days_remaining = days_until_flight_plan_end(now) as f64;
        let daily_needed = (FLIGHT_PLAN_GOAL_LIVES as f64 - lives) / days_remaining;
        let recent_daily_rate = (lives - previous.lives_impacted as f64) / 30.0;

        if recent_daily_rate >= daily_needed * 1.2 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Prediction,
                category: "Flight Plan 2030".to_string(),
                title: "On Track to Exceed 2030 Goal".to_string(),
                summary: "At current pace, we are projected to exceed the 1 million lives goal \
                          before 2030."
                    .to_string(),
                details: format!(
                    "Current daily impact rate: ~{} lives/day. Required rate: ~{} lives/day. \
                     Total impacted so far: {}.",
                    recent_daily_rate.round(),
                    daily_needed.round(),
                    format_count(recent.lives_impacted)
                ),
                confidence: 0.7,
                actionable: true,
                suggested_actions: vec![
                    "Consider setting stretch goals beyond 1 million".to_string(),
                    "Document successful strategies for future reference".to_string(),
                    "Plan celebration milestones along the way".to_string(),
                ],
                related_metrics: related_metrics(),
            }));
        }

        if recent_daily_rate < daily_needed * 0.5 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Prediction,
                category: "Flight Plan 2030".to_string(),
                title: "Flight Plan 2030 at Risk".to_string(),
                summary: "Current impact rate is significantly below the pace needed to reach 1 \
                          million lives by 2030."
                    .to_string(),
                details: format!(
                    "Current daily impact rate: ~{} lives/day. Required rate: ~{} lives/day. \
                     Need to increase pace by {}%.",
                    recent_daily_rate.round(),
                    daily_needed.round(),
                    ((daily_needed / recent_daily_rate - 1.0) * 100.0).round()
                ),
                confidence: 0.75,
                actionable: true,
                suggested_actions: vec![
                    "Review and optimize program capacity".to_string(),
                    "Accelerate partner organization onboarding".to_string(),
                    "Launch new high-impact initiatives".to_string(),
                    "Consider strategic partnerships for scale".to_string(),
                ],
                related_metrics: related_metrics(),
            }));
        }

        Ok(None)
    }
}

fn related_metrics() -> Vec<String> {
    vec!["lives_impacted".to_string(), "progress_to_goal".to_string()]
}
