use chrono::{DateTime, Utc};

use crate::insight::InsightRule;
use crate::models::{InsightKind, NewInsight, Snapshot};

/// Watches the mentor-to-student ratio in the latest snapshot for
/// overload (above 15:1) or underuse (below 5:1 with a real mentor
/// pool).
pub struct MentorCapacityRule;

impl InsightRule for MentorCapacityRule {
    fn name(&self) -> &'static str {
        "mentor_capacity_concern"
    }

    fn evaluate(
        &self,
        window: &[Snapshot],
        _now: DateTime<Utc>,
    ) -> anyhow::Result<Option<NewInsight>> {
        let Some(recent) = window.first() else {
            return Ok(None);
        };
        let ratio = recent.metrics.mentor_student_ratio;
        let mentors = recent.metrics.total_mentors;
        let students = recent.metrics.total_students;

        if ratio > 15.0 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Recommendation,
                category: "Mentorship Capacity".to_string(),
                title: "Mentor Capacity Concern".to_string(),
                summary: format!(
                    "Current mentor-to-student ratio is {ratio:.1}:1, which exceeds the \
                     recommended maximum of 15:1."
                ),
                details: format!(
                    "High mentor-to-student ratios can lead to decreased quality of mentorship \
                     and student outcomes. Current mentors: {mentors}, Current students: \
                     {students}."
                ),
                confidence: 0.9,
                actionable: true,
                suggested_actions: vec![
                    "Launch a mentor recruitment campaign".to_string(),
                    "Consider peer mentoring programs to supplement".to_string(),
                    "Review mentor retention and engagement strategies".to_string(),
                    "Implement mentorship efficiency tools".to_string(),
                ],
                related_metrics: related_metrics(),
            }));
        }

        if ratio < 5.0 && mentors > 10 {
            return Ok(Some(NewInsight {
                kind: InsightKind::Recommendation,
                category: "Mentorship Capacity".to_string(),
                title: "Underutilized Mentor Capacity".to_string(),
                summary: format!(
                    "Current mentor-to-student ratio is {ratio:.1}:1, indicating underutilized \
                     mentor capacity."
                ),
                details: format!(
                    "With {mentors} mentors and {students} students, there may be an opportunity \
                     to increase student enrollment or optimize mentor allocation."
                ),
                confidence: 0.75,
                actionable: true,
                suggested_actions: vec![
                    "Increase student recruitment efforts".to_string(),
                    "Consider expanding geographic reach".to_string(),
                    "Offer mentors additional responsibilities or specializations".to_string(),
                ],
                related_metrics: related_metrics(),
            }));
        }

        Ok(None)
    }
}

fn related_metrics() -> Vec<String> {
    vec![
        "total_mentors".to_string(),
        "total_students".to_string(),
        "mentor_student_ratio".to_string(),
    ]
}
