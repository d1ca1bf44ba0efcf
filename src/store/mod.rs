//! Persistence capability for the documents the engine owns. The
//! Postgres implementation lives in `db::store`; [`memory::MemoryStore`]
//! backs the test suites.

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::TrendDirection;
use crate::models::{
    Alert, AlertKind, Insight, InsightKind, InsightStatus, KpiHistoryPoint, KpiStatus, KpiTarget,
    MilestoneCheck, NewAlert, NewInsight, NewSnapshot, Snapshot, SnapshotFrequency,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("stored {field} value {value:?} is not recognized")]
    Corrupt { field: &'static str, value: String },
}

/// Monitor-owned fields written back to a KPI on every check.
#[derive(Debug, Clone, Copy)]
pub struct KpiCheckUpdate {
    pub current_value: f64,
    pub status: KpiStatus,
    pub trend: TrendDirection,
    pub trend_percentage: f64,
    pub last_checked: DateTime<Utc>,
}

/// Typed document operations over snapshots, KPI targets, alerts,
/// insights, and the Flight Plan state row.
///
/// Stores assign `id` and `created_at`-style fields on insert;
/// timestamps are monotonic within a timeline. "Recent" listings are
/// ordered newest first.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn insert_snapshot(&self, snapshot: NewSnapshot) -> Result<Snapshot, StoreError>;

    async fn latest_snapshot(
        &self,
        frequency: SnapshotFrequency,
    ) -> Result<Option<Snapshot>, StoreError>;

    async fn recent_snapshots(
        &self,
        frequency: SnapshotFrequency,
        limit: usize,
    ) -> Result<Vec<Snapshot>, StoreError>;

    /// Upserts the per-frequency pointer to the most recent snapshot.
    async fn set_latest_snapshot(
        &self,
        frequency: SnapshotFrequency,
        snapshot_id: Uuid,
    ) -> Result<(), StoreError>;

    async fn list_kpi_targets(&self) -> Result<Vec<KpiTarget>, StoreError>;

    async fn update_kpi_check(
        &self,
        kpi_id: Uuid,
        update: KpiCheckUpdate,
    ) -> Result<(), StoreError>;

    async fn append_kpi_history(
        &self,
        kpi_id: Uuid,
        value: f64,
        status: KpiStatus,
    ) -> Result<(), StoreError>;

    async fn recent_kpi_history(
        &self,
        kpi_id: Uuid,
        limit: usize,
    ) -> Result<Vec<KpiHistoryPoint>, StoreError>;

    /// Inserts an alert. Milestone alerts are unique per metric key; when
    /// an insert collides with an existing milestone the stored alert is
    /// returned instead of a new row.
    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    /// Most recent alert of the given kind carrying this metric key.
    async fn latest_alert_for_metric(
        &self,
        kind: AlertKind,
        metric: &str,
    ) -> Result<Option<Alert>, StoreError>;

    /// Inserts an insight, or returns `None` when an active insight with
    /// the same (kind, category) already holds the uniqueness slot.
    async fn insert_insight(&self, insight: NewInsight) -> Result<Option<Insight>, StoreError>;

    async fn has_active_insight(
        &self,
        kind: InsightKind,
        category: &str,
    ) -> Result<bool, StoreError>;

    async fn active_insights_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Insight>, StoreError>;

    /// Moves an insight to `dismissed` or `actioned`, stamping
    /// `dismissed_at` and the optional actor.
    async fn update_insight_status(
        &self,
        id: Uuid,
        status: InsightStatus,
        dismissed_by: Option<&str>,
    ) -> Result<Insight, StoreError>;

    async fn upsert_flight_plan_status(&self, check: &MilestoneCheck) -> Result<(), StoreError>;
}
