use chrono::{DateTime, Utc};

use crate::insight::InsightRule;
use crate::metrics::percent_change;
use crate::models::{InsightKind, NewInsight, Snapshot};

/// Compares student enrollment growth across the last three snapshots
/// and flags acceleration or a marked slowdown.
pub struct StudentGrowthRule;

impl InsightRule for StudentGrowthRule {
    fn name(&self) -> &'static str {
        "student_growth_acceleration"
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

        let recent_growth =
            percent_change(recent.total_students as f64, previous.total_students as f64);
        let previous_growth =
            percent_change(previous.total_students as f64, oldest.total_students as f64);

        if recent_growth > previous_growth * 1.5 && recent_growth > 10.0 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Trend,
                category: "Student Growth".to_string(),
                title: "Student Growth is Accelerating".to_string(),
                summary: format!(
                    "Student enrollment growth has accelerated to {recent_growth:.1}%, up from \
                     {previous_growth:.1}% in the previous period."
                ),
                details: format!(
                    "This acceleration indicates strong momentum in student acquisition. Current \
                     total: {} students. Consider scaling mentorship capacity to maintain quality.",
                    recent.total_students
                ),
                confidence: 0.85,
                actionable: true,
                suggested_actions: vec![
                    "Review mentor-to-student ratios to ensure adequate support".to_string(),
                    "Consider expanding program offerings to accommodate growth".to_string(),
                    "Analyze which channels are driving the increased enrollments".to_string(),
                ],
                related_metrics: vec![
                    "total_students".to_string(),
                    "student_growth_rate".to_string(),
                    "mentor_student_ratio".to_string(),
                ],
            }));
        }

        if recent_growth < previous_growth * 0.5 && previous_growth > 5.0 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Trend,
                category: "Student Growth".to_string(),
                title: "Student Growth is Slowing".to_string(),
                summary: format!(
                    "Student enrollment growth has slowed to {recent_growth:.1}%, down from \
                     {previous_growth:.1}% previously."
                ),
                details: "This deceleration may indicate market saturation, seasonal effects, or \
                          reduced marketing effectiveness. Investigation recommended."
                    .to_string(),
                confidence: 0.8,
                actionable: true,
                suggested_actions: vec![
                    "Review and optimize marketing campaigns".to_string(),
                    "Survey recent leads to understand conversion barriers".to_string(),
                    "Consider new partnership opportunities for reach expansion".to_string(),
                ],
                related_metrics: vec![
                    "total_students".to_string(),
                    "student_growth_rate".to_string(),
                    "new_students_this_period".to_string(),
                ],
            }));
        }

        Ok(None)
    }
}
