use chrono::{DateTime, Utc};

use crate::insight::InsightRule;
use crate::models::{InsightKind, NewInsight, Snapshot};

/// Flags large swings in the program completion rate between the two
/// most recent snapshots.
pub struct ProgramCompletionRule;

impl InsightRule for ProgramCompletionRule {
    fn name(&self) -> &'static str {
        "program_completion_trend"
    }

    fn evaluate(
        &self,
        window: &[Snapshot],
        _now: DateTime<Utc>,
    ) -> anyhow::Result<Option<NewInsight>> {
        if window.len() < 2 {
            return Ok(None);
        }
        let recent = &window[0].metrics;
        let previous = &window[1].metrics;
        let diff = recent.completion_rate - previous.completion_rate;

        if diff < -10.0 && recent.completion_rate < 60.0 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Anomaly,
                category: "Program Performance".to_string(),
                title: "Declining Program Completion Rate".to_string(),
                summary: format!(
                    "Program completion rate dropped by {:.1}% to {:.1}%.",
                    diff.abs(),
                    recent.completion_rate
                ),
                details: format!(
                    "This significant decline may indicate issues with program content, student \
                     support, or external factors affecting student commitment. {} completions \
                     out of {} enrollments.",
                    recent.program_completions, recent.program_enrollments
                ),
                confidence: 0.85,
                actionable: true,
                suggested_actions: vec![
                    "Survey students who did not complete programs".to_string(),
                    "Review program content for engagement issues".to_string(),
                    "Analyze dropout points within programs".to_string(),
                    "Implement early intervention for at-risk students".to_string(),
                ],
                related_metrics: related_metrics(),
            }));
        }

        if diff > 10.0 && recent.completion_rate > 70.0 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Trend,
                category: "Program Performance".to_string(),
                title: "Program Completion Rate Improving".to_string(),
                summary: format!(
                    "Program completion rate increased by {diff:.1}% to {:.1}%.",
                    recent.completion_rate
                ),
                details: "This positive trend suggests program improvements are effective. \
                          Consider documenting and replicating successful strategies."
                    .to_string(),
                confidence: 0.85,
                actionable: true,
                suggested_actions: vec![
                    "Document successful completion strategies".to_string(),
                    "Share best practices across programs".to_string(),
                    "Recognize and reward high-performing mentors".to_string(),
                ],
                related_metrics: related_metrics(),
            }));
        }

        Ok(None)
    }
}

fn related_metrics() -> Vec<String> {
    vec![
        "program_completions".to_string(),
        "program_enrollments".to_string(),
        "completion_rate".to_string(),
    ]
}
