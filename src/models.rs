//! Documents owned by the analytics engine: snapshots, KPI targets,
//! alerts, insights, and the Flight Plan status projection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::{CoreMetrics, MetricGroup, TrendDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl SnapshotFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotFrequency::Daily => "daily",
            SnapshotFrequency::Weekly => "weekly",
            SnapshotFrequency::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(SnapshotFrequency::Daily),
            "weekly" => Some(SnapshotFrequency::Weekly),
            "monthly" => Some(SnapshotFrequency::Monthly),
            _ => None,
        }
    }

    /// Length of the rolling window this frequency snapshots over.
    pub fn period_days(self) -> i64 {
        match self {
            SnapshotFrequency::Daily => 1,
            SnapshotFrequency::Weekly => 7,
            SnapshotFrequency::Monthly => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedBy {
    Scheduled,
    Manual,
}

impl GeneratedBy {
    pub fn as_str(self) -> &'static str {
        match self {
            GeneratedBy::Scheduled => "scheduled",
            GeneratedBy::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(GeneratedBy::Scheduled),
            "manual" => Some(GeneratedBy::Manual),
            _ => None,
        }
    }
}

/// An immutable record of aggregated metrics for one frequency bucket.
///
/// Snapshots form one append-only timeline per frequency, totally ordered
/// by `created_at`; trends are always relative to the previous snapshot of
/// the same frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub frequency: SnapshotFrequency,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub metrics: CoreMetrics,
    pub trends: BTreeMap<MetricGroup, TrendDirection>,
    pub generated_by: GeneratedBy,
    pub triggered_by: Option<String>,
}

/// A snapshot ready to persist; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub frequency: SnapshotFrequency,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub metrics: CoreMetrics,
    pub trends: BTreeMap<MetricGroup, TrendDirection>,
    pub generated_by: GeneratedBy,
    pub triggered_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiStatus {
    Green,
    Yellow,
    Red,
}

impl KpiStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            KpiStatus::Green => "green",
            KpiStatus::Yellow => "yellow",
            KpiStatus::Red => "red",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "green" => Some(KpiStatus::Green),
            "yellow" => Some(KpiStatus::Yellow),
            "red" => Some(KpiStatus::Red),
            _ => None,
        }
    }

    /// Health ordering: red < yellow < green.
    pub fn rank(self) -> u8 {
        match self {
            KpiStatus::Red => 0,
            KpiStatus::Yellow => 1,
            KpiStatus::Green => 2,
        }
    }
}

/// Percent-of-target gates for the red/yellow/green classification,
/// conventionally descending (green >= yellow >= red). The ordering is
/// not validated; see the KPI monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiThresholds {
    pub green: f64,
    pub yellow: f64,
    pub red: f64,
}

/// A configured KPI. Definition fields belong to configuration; the
/// monitor exclusively writes `current_value`, `status`, `trend`,
/// `trend_percentage`, and `last_checked`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiTarget {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: String,
    pub thresholds: KpiThresholds,
    pub status: KpiStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub trend: TrendDirection,
    pub trend_percentage: f64,
    /// Explicit metric binding; falls back to the name-derived key when absent.
    pub metric_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiHistoryPoint {
    pub value: f64,
    pub status: KpiStatus,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    KpiWarning,
    KpiCritical,
    MilestoneReached,
    AnomalyDetected,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::KpiWarning => "kpi_warning",
            AlertKind::KpiCritical => "kpi_critical",
            AlertKind::MilestoneReached => "milestone_reached",
            AlertKind::AnomalyDetected => "anomaly_detected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "kpi_warning" => Some(AlertKind::KpiWarning),
            "kpi_critical" => Some(AlertKind::KpiCritical),
            "milestone_reached" => Some(AlertKind::MilestoneReached),
            "anomaly_detected" => Some(AlertKind::AnomalyDetected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "info" => Some(AlertSeverity::Info),
            "warning" => Some(AlertSeverity::Warning),
            "critical" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }
}

/// An operator-facing alert raised by the KPI monitor. Immutable once
/// created; acknowledgement is an external operator action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub kpi_id: Option<Uuid>,
    pub metric: Option<String>,
    pub current_value: Option<f64>,
    pub threshold_value: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub kpi_id: Option<Uuid>,
    pub metric: Option<String>,
    pub current_value: Option<f64>,
    pub threshold_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Trend,
    Recommendation,
    Prediction,
    Anomaly,
}

impl InsightKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InsightKind::Trend => "trend",
            InsightKind::Recommendation => "recommendation",
            InsightKind::Prediction => "prediction",
            InsightKind::Anomaly => "anomaly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trend" => Some(InsightKind::Trend),
            "recommendation" => Some(InsightKind::Recommendation),
            "prediction" => Some(InsightKind::Prediction),
            "anomaly" => Some(InsightKind::Anomaly),
            _ => None,
        }
    }
}

/// Active insights expire after this many days and are auto-dismissed
/// by the next generation pass.
pub const INSIGHT_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightStatus {
    Active,
    Dismissed,
    Actioned,
}

impl InsightStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InsightStatus::Active => "active",
            InsightStatus::Dismissed => "dismissed",
            InsightStatus::Actioned => "actioned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(InsightStatus::Active),
            "dismissed" => Some(InsightStatus::Dismissed),
            "actioned" => Some(InsightStatus::Actioned),
            _ => None,
        }
    }
}

/// A rule-generated observation about metric behavior. Created `active`,
/// dismissed by the 7-day expiry pass or an explicit operator action;
/// `dismissed` and `actioned` are terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: Uuid,
    pub kind: InsightKind,
    pub category: String,
    pub title: String,
    pub summary: String,
    pub details: String,
    pub confidence: f64,
    pub actionable: bool,
    pub suggested_actions: Vec<String>,
    pub related_metrics: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: InsightStatus,
    pub dismissed_by: Option<String>,
    pub dismissed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewInsight {
    pub kind: InsightKind,
    pub category: String,
    pub title: String,
    pub summary: String,
    pub details: String,
    pub confidence: f64,
    pub actionable: bool,
    pub suggested_actions: Vec<String>,
    pub related_metrics: Vec<String>,
}

/// Point-in-time Flight Plan 2030 projection. Overwrites a single latest
/// row on every run; `projected_completion` is absent when the current
/// rate is zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneCheck {
    pub year: i32,
    pub target_lives: u64,
    pub current_lives: u64,
    pub percent_complete: f64,
    pub on_track: bool,
    pub projected_completion: Option<i32>,
    pub days_remaining: i64,
}
