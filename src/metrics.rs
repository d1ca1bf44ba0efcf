//! Shared metrics vocabulary: the flat snapshot record, trend
//! classification, and the closed set of KPI metric keys.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Flight Plan 2030 program constants.
pub const FLIGHT_PLAN_GOAL_LIVES: u64 = 1_000_000;
pub const FLIGHT_PLAN_START_YEAR: i32 = 2024;
pub const FLIGHT_PLAN_END_YEAR: i32 = 2030;

pub(crate) const DAY_MS: f64 = 86_400_000.0;

/// Days from `now` to the end of the Flight Plan window (Dec 31 of the
/// final year), fractional days rounded up. Negative once past the end.
pub fn days_until_flight_plan_end(now: DateTime<Utc>) -> i64 {
    // Fixed, valid calendar date.
    let end = NaiveDate::from_ymd_opt(FLIGHT_PLAN_END_YEAR, 12, 31)
        .unwrap_or(NaiveDate::MAX)
        .and_time(NaiveTime::MIN)
        .and_utc();
    ((end - now).num_milliseconds() as f64 / DAY_MS).ceil() as i64
}

/// Aggregated organizational metrics captured by one snapshot.
///
/// Recomputed in full on every run; never updated incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreMetrics {
    pub total_students: u64,
    pub active_students: u64,
    pub new_students_this_period: u64,
    pub student_growth_rate: f64,
    pub total_mentors: u64,
    pub active_mentors: u64,
    pub mentor_student_ratio: f64,
    pub total_organizations: u64,
    pub active_organizations: u64,
    pub total_programs: u64,
    pub program_enrollments: u64,
    pub program_completions: u64,
    pub completion_rate: f64,
    pub total_scholarships: u64,
    pub scholarship_value_awarded: f64,
    pub total_donations: u64,
    pub total_donation_amount: f64,
    pub total_sponsors: u64,
    pub average_donation: f64,
    pub lives_impacted: u64,
    pub progress_to_goal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Stable => "stable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(TrendDirection::Up),
            "down" => Some(TrendDirection::Down),
            "stable" => Some(TrendDirection::Stable),
            _ => None,
        }
    }
}

/// The six metric groups tracked for snapshot-over-snapshot trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricGroup {
    Students,
    Mentors,
    Organizations,
    Programs,
    Donations,
    Impact,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 6] = [
        MetricGroup::Students,
        MetricGroup::Mentors,
        MetricGroup::Organizations,
        MetricGroup::Programs,
        MetricGroup::Donations,
        MetricGroup::Impact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricGroup::Students => "students",
            MetricGroup::Mentors => "mentors",
            MetricGroup::Organizations => "organizations",
            MetricGroup::Programs => "programs",
            MetricGroup::Donations => "donations",
            MetricGroup::Impact => "impact",
        }
    }

    /// The headline value this group is trended on.
    pub fn value(self, metrics: &CoreMetrics) -> f64 {
        match self {
            MetricGroup::Students => metrics.total_students as f64,
            MetricGroup::Mentors => metrics.total_mentors as f64,
            MetricGroup::Organizations => metrics.total_organizations as f64,
            MetricGroup::Programs => metrics.total_programs as f64,
            MetricGroup::Donations => metrics.total_donations as f64,
            MetricGroup::Impact => metrics.lives_impacted as f64,
        }
    }
}

/// Percent change from `previous` to `current`. A zero baseline counts as
/// +100% when the current value is positive, 0% otherwise.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    ((current - previous) / previous) * 100.0
}

/// Classify movement between two measurements into up/down/stable using
/// the ±2% band. A zero baseline is `up` exactly when the current value
/// is positive.
pub fn classify_trend(current: f64, previous: f64) -> TrendDirection {
    if previous == 0.0 {
        return if current > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Stable
        };
    }
    let change = ((current - previous) / previous) * 100.0;
    if change > 2.0 {
        TrendDirection::Up
    } else if change < -2.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

/// Short-window trend over an oldest-first value series, as used for KPI
/// smoothing: only the last two points matter. Returns the direction and
/// the absolute percent magnitude of the move.
pub fn trend_from_history(values: &[f64]) -> (TrendDirection, f64) {
    if values.len() < 2 {
        return (TrendDirection::Stable, 0.0);
    }

    let recent = values[values.len() - 1];
    let previous = values[values.len() - 2];

    if previous == 0.0 {
        let direction = if recent > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Stable
        };
        return (direction, 100.0);
    }

    let change = ((recent - previous) / previous) * 100.0;
    let direction = if change > 2.0 {
        TrendDirection::Up
    } else if change < -2.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    (direction, change.abs())
}

/// Closed set of metric identifiers a KPI can be bound to.
///
/// Unknown identifiers stay unresolved and the monitor treats the value
/// as 0 rather than failing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKey {
    TotalStudents,
    ActiveStudents,
    TotalMentors,
    TotalOrganizations,
    ProgramCompletions,
    TotalDonations,
    ScholarshipValue,
    LivesImpacted,
    MentorStudentRatio,
    ProgramCompletionRate,
}

impl MetricKey {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "total_students" => Some(MetricKey::TotalStudents),
            "active_students" => Some(MetricKey::ActiveStudents),
            "total_mentors" => Some(MetricKey::TotalMentors),
            "total_organizations" => Some(MetricKey::TotalOrganizations),
            "program_completions" => Some(MetricKey::ProgramCompletions),
            "total_donations" => Some(MetricKey::TotalDonations),
            "scholarship_value" => Some(MetricKey::ScholarshipValue),
            "lives_impacted" => Some(MetricKey::LivesImpacted),
            "mentor_student_ratio" => Some(MetricKey::MentorStudentRatio),
            "program_completion_rate" => Some(MetricKey::ProgramCompletionRate),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::TotalStudents => "total_students",
            MetricKey::ActiveStudents => "active_students",
            MetricKey::TotalMentors => "total_mentors",
            MetricKey::TotalOrganizations => "total_organizations",
            MetricKey::ProgramCompletions => "program_completions",
            MetricKey::TotalDonations => "total_donations",
            MetricKey::ScholarshipValue => "scholarship_value",
            MetricKey::LivesImpacted => "lives_impacted",
            MetricKey::MentorStudentRatio => "mentor_student_ratio",
            MetricKey::ProgramCompletionRate => "program_completion_rate",
        }
    }
}

/// Derive a metric key from a KPI display name: lowercase with whitespace
/// runs collapsed to single underscores ("Total Students" -> "total_students").
pub fn derive_metric_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut in_gap = false;

    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            in_gap = true;
            continue;
        }
        if in_gap && !key.is_empty() {
            key.push('_');
        }
        in_gap = false;
        for lower in ch.to_lowercase() {
            key.push(lower);
        }
    }

    key
}

/// Format a count with thousands separators for operator-facing messages.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}
