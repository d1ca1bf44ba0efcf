//! [`AnalyticsStore`] backed by the `impact_analytics` schema. The two
//! check-then-insert dedups (milestone alerts, active insights) are
//! backstopped here by partial unique indexes rather than trusting the
//! engine-side check alone.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::metrics::{CoreMetrics, MetricGroup, TrendDirection};
use crate::models::{
    Alert, AlertKind, AlertSeverity, GeneratedBy, Insight, InsightKind, InsightStatus,
    KpiHistoryPoint, KpiStatus, KpiTarget, KpiThresholds, MilestoneCheck, NewAlert, NewInsight,
    NewSnapshot, Snapshot, SnapshotFrequency, INSIGHT_TTL_DAYS,
};
use crate::store::{AnalyticsStore, KpiCheckUpdate, StoreError};

pub struct PgAnalyticsStore {
    pool: PgPool,
}

impl PgAnalyticsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn snapshot_from_row(row: &PgRow) -> Result<Snapshot, StoreError> {
    let frequency: String = row.get("frequency");
    let frequency = SnapshotFrequency::parse(&frequency)
        .ok_or(StoreError::Corrupt { field: "frequency", value: frequency })?;
    let generated_by: String = row.get("generated_by");
    let generated_by = GeneratedBy::parse(&generated_by)
        .ok_or(StoreError::Corrupt { field: "generated_by", value: generated_by })?;
    let metrics: Json<CoreMetrics> = row.get("metrics");
    let trends: Json<BTreeMap<MetricGroup, TrendDirection>> = row.get("trends");

    Ok(Snapshot {
        id: row.get("id"),
        created_at: row.get("created_at"),
        frequency,
        period_start: row.get("period_start"),
        period_end: row.get("period_end"),
        metrics: metrics.0,
        trends: trends.0,
        generated_by,
        triggered_by: row.get("triggered_by"),
    })
}

fn kpi_from_row(row: &PgRow) -> Result<KpiTarget, StoreError> {
    let status: String = row.get("status");
    let status = KpiStatus::parse(&status)
        .ok_or(StoreError::Corrupt { field: "status", value: status })?;
    let trend: String = row.get("trend");
    let trend = TrendDirection::parse(&trend)
        .ok_or(StoreError::Corrupt { field: "trend", value: trend })?;

    Ok(KpiTarget {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        category: row.get("category"),
        target_value: row.get("target_value"),
        current_value: row.get("current_value"),
        unit: row.get("unit"),
        thresholds: KpiThresholds {
            green: row.get("green_threshold"),
            yellow: row.get("yellow_threshold"),
            red: row.get("red_threshold"),
        },
        status,
        last_checked: row.get("last_checked"),
        trend,
        trend_percentage: row.get("trend_percentage"),
        metric_key: row.get("metric_key"),
    })
}

fn history_from_row(row: &PgRow) -> Result<KpiHistoryPoint, StoreError> {
    let status: String = row.get("status");
    let status = KpiStatus::parse(&status)
        .ok_or(StoreError::Corrupt { field: "status", value: status })?;
    Ok(KpiHistoryPoint {
        value: row.get("value"),
        status,
        recorded_at: row.get("recorded_at"),
    })
}

fn alert_from_row(row: &PgRow) -> Result<Alert, StoreError> {
    let kind: String = row.get("kind");
    let kind =
        AlertKind::parse(&kind).ok_or(StoreError::Corrupt { field: "kind", value: kind })?;
    let severity: String = row.get("severity");
    let severity = AlertSeverity::parse(&severity)
        .ok_or(StoreError::Corrupt { field: "severity", value: severity })?;

    Ok(Alert {
        id: row.get("id"),
        kind,
        severity,
        title: row.get("title"),
        message: row.get("message"),
        kpi_id: row.get("kpi_id"),
        metric: row.get("metric"),
        current_value: row.get("current_value"),
        threshold_value: row.get("threshold_value"),
        acknowledged: row.get("acknowledged"),
        acknowledged_by: row.get("acknowledged_by"),
        acknowledged_at: row.get("acknowledged_at"),
        created_at: row.get("created_at"),
    })
}

fn insight_from_row(row: &PgRow) -> Result<Insight, StoreError> {
    let kind: String = row.get("kind");
    let kind =
        InsightKind::parse(&kind).ok_or(StoreError::Corrupt { field: "kind", value: kind })?;
    let status: String = row.get("status");
    let status = InsightStatus::parse(&status)
        .ok_or(StoreError::Corrupt { field: "status", value: status })?;

    Ok(Insight {
        id: row.get("id"),
        kind,
        category: row.get("category"),
        title: row.get("title"),
        summary: row.get("summary"),
        details: row.get("details"),
        confidence: row.get("confidence"),
        actionable: row.get("actionable"),
        suggested_actions: row.get("suggested_actions"),
        related_metrics: row.get("related_metrics"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        status,
        dismissed_by: row.get("dismissed_by"),
        dismissed_at: row.get("dismissed_at"),
    })
}

#[async_trait]
impl AnalyticsStore for PgAnalyticsStore {
    async fn insert_snapshot(&self, snapshot: NewSnapshot) -> Result<Snapshot, StoreError> {
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            INSERT INTO impact_analytics.snapshots
            (id, frequency, period_start, period_end, metrics, trends, generated_by, triggered_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(snapshot.frequency.as_str())
        .bind(snapshot.period_start)
        .bind(snapshot.period_end)
        .bind(Json(&snapshot.metrics))
        .bind(Json(&snapshot.trends))
        .bind(snapshot.generated_by.as_str())
        .bind(&snapshot.triggered_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(Snapshot {
            id,
            created_at: row.get("created_at"),
            frequency: snapshot.frequency,
            period_start: snapshot.period_start,
            period_end: snapshot.period_end,
            metrics: snapshot.metrics,
            trends: snapshot.trends,
            generated_by: snapshot.generated_by,
            triggered_by: snapshot.triggered_by,
        })
    }

    async fn latest_snapshot(
        &self,
        frequency: SnapshotFrequency,
    ) -> Result<Option<Snapshot>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM impact_analytics.snapshots \
             WHERE frequency = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(frequency.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(snapshot_from_row).transpose()
    }

    async fn recent_snapshots(
        &self,
        frequency: SnapshotFrequency,
        limit: usize,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM impact_analytics.snapshots \
             WHERE frequency = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(frequency.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(snapshot_from_row).collect()
    }

    async fn set_latest_snapshot(
        &self,
        frequency: SnapshotFrequency,
        snapshot_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO impact_analytics.latest_snapshots (frequency, snapshot_id, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (frequency) DO UPDATE
            SET snapshot_id = EXCLUDED.snapshot_id, updated_at = now()
            "#,
        )
        .bind(frequency.as_str())
        .bind(snapshot_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_kpi_targets(&self) -> Result<Vec<KpiTarget>, StoreError> {
        let rows = sqlx::query("SELECT * FROM impact_analytics.kpi_targets ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(kpi_from_row).collect()
    }

    async fn update_kpi_check(
        &self,
        kpi_id: Uuid,
        update: KpiCheckUpdate,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE impact_analytics.kpi_targets
            SET current_value = $2, status = $3, trend = $4, trend_percentage = $5,
                last_checked = $6
            WHERE id = $1
            "#,
        )
        .bind(kpi_id)
        .bind(update.current_value)
        .bind(update.status.as_str())
        .bind(update.trend.as_str())
        .bind(update.trend_percentage)
        .bind(update.last_checked)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_kpi_history(
        &self,
        kpi_id: Uuid,
        value: f64,
        status: KpiStatus,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO impact_analytics.kpi_history (id, kpi_id, value, status) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(kpi_id)
        .bind(value)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_kpi_history(
        &self,
        kpi_id: Uuid,
        limit: usize,
    ) -> Result<Vec<KpiHistoryPoint>, StoreError> {
        let rows = sqlx::query(
            "SELECT value, status, recorded_at FROM impact_analytics.kpi_history \
             WHERE kpi_id = $1 ORDER BY recorded_at DESC LIMIT $2",
        )
        .bind(kpi_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(history_from_row).collect()
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO impact_analytics.alerts
            (id, kind, severity, title, message, kpi_id, metric, current_value, threshold_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (metric) WHERE kind = 'milestone_reached' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(alert.kind.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(alert.kpi_id)
        .bind(&alert.metric)
        .bind(alert.current_value)
        .bind(alert.threshold_value)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => alert_from_row(&row),
            // Milestone already recorded; hand back the stored alert.
            None => {
                let metric = alert.metric.unwrap_or_default();
                self.latest_alert_for_metric(alert.kind, &metric).await?.ok_or(
                    StoreError::NotFound { entity: "alert", id: metric },
                )
            }
        }
    }

    async fn latest_alert_for_metric(
        &self,
        kind: AlertKind,
        metric: &str,
    ) -> Result<Option<Alert>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM impact_analytics.alerts \
             WHERE kind = $1 AND metric = $2 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(kind.as_str())
        .bind(metric)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(alert_from_row).transpose()
    }

    async fn insert_insight(&self, insight: NewInsight) -> Result<Option<Insight>, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO impact_analytics.insights
            (id, kind, category, title, summary, details, confidence, actionable,
             suggested_actions, related_metrics, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    now() + make_interval(days => $11))
            ON CONFLICT (kind, category) WHERE status = 'active' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(insight.kind.as_str())
        .bind(&insight.category)
        .bind(&insight.title)
        .bind(&insight.summary)
        .bind(&insight.details)
        .bind(insight.confidence)
        .bind(insight.actionable)
        .bind(&insight.suggested_actions)
        .bind(&insight.related_metrics)
        .bind(INSIGHT_TTL_DAYS as i32)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(insight_from_row).transpose()
    }

    async fn has_active_insight(
        &self,
        kind: InsightKind,
        category: &str,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM impact_analytics.insights \
             WHERE kind = $1 AND category = $2 AND status = 'active') AS present",
        )
        .bind(kind.as_str())
        .bind(category)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("present"))
    }

    async fn active_insights_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Insight>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM impact_analytics.insights \
             WHERE status = 'active' AND created_at < $1 ORDER BY created_at",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(insight_from_row).collect()
    }

    async fn update_insight_status(
        &self,
        id: Uuid,
        status: InsightStatus,
        dismissed_by: Option<&str>,
    ) -> Result<Insight, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE impact_analytics.insights
            SET status = $2, dismissed_by = $3, dismissed_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(dismissed_by)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => insight_from_row(&row),
            None => Err(StoreError::NotFound { entity: "insight", id: id.to_string() }),
        }
    }

    async fn upsert_flight_plan_status(&self, check: &MilestoneCheck) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO impact_analytics.flight_plan_status
            (id, year, target_lives, current_lives, percent_complete, on_track,
             projected_completion, days_remaining, updated_at)
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, now())
            ON CONFLICT (id) DO UPDATE
            SET year = EXCLUDED.year,
                target_lives = EXCLUDED.target_lives,
                current_lives = EXCLUDED.current_lives,
                percent_complete = EXCLUDED.percent_complete,
                on_track = EXCLUDED.on_track,
                projected_completion = EXCLUDED.projected_completion,
                days_remaining = EXCLUDED.days_remaining,
                updated_at = now()
            "#,
        )
        .bind(check.year)
        .bind(check.target_lives as i64)
        .bind(check.current_lives as i64)
        .bind(check.percent_complete)
        .bind(check.on_track)
        .bind(check.projected_completion)
        .bind(check.days_remaining)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
