//! In-memory [`AnalyticsStore`] backing the test suites. Behaves like
//! the Postgres store, including the milestone-alert and active-insight
//! uniqueness backstops, and keeps store-assigned timestamps strictly
//! increasing so ordering assertions are deterministic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Alert, AlertKind, Insight, InsightKind, InsightStatus, KpiHistoryPoint, KpiStatus, KpiTarget,
    MilestoneCheck, NewAlert, NewInsight, NewSnapshot, Snapshot, SnapshotFrequency,
    INSIGHT_TTL_DAYS,
};

use super::{AnalyticsStore, KpiCheckUpdate, StoreError};

#[derive(Default)]
struct Inner {
    snapshots: Vec<Snapshot>,
    latest: HashMap<SnapshotFrequency, Uuid>,
    kpis: Vec<KpiTarget>,
    history: HashMap<Uuid, Vec<KpiHistoryPoint>>,
    alerts: Vec<Alert>,
    insights: Vec<Insight>,
    flight_plan: Option<MilestoneCheck>,
    last_ts: Option<DateTime<Utc>>,
}

impl Inner {
    // Store-assigned timestamps must be strictly increasing per store.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut at = Utc::now();
        if let Some(last) = self.last_ts {
            if at <= last {
                at = last + Duration::microseconds(1);
            }
        }
        self.last_ts = Some(at);
        at
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a KPI definition, replacing any row with the same id.
    pub async fn put_kpi_target(&self, kpi: KpiTarget) {
        let mut inner = self.inner.write().await;
        inner.kpis.retain(|k| k.id != kpi.id);
        inner.kpis.push(kpi);
    }

    pub async fn kpi_target(&self, id: Uuid) -> Option<KpiTarget> {
        let inner = self.inner.read().await;
        inner.kpis.iter().find(|k| k.id == id).cloned()
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.inner.read().await.alerts.clone()
    }

    pub async fn insights(&self) -> Vec<Insight> {
        self.inner.read().await.insights.clone()
    }

    pub async fn flight_plan(&self) -> Option<MilestoneCheck> {
        self.inner.read().await.flight_plan.clone()
    }

    pub async fn latest_pointer(&self, frequency: SnapshotFrequency) -> Option<Uuid> {
        self.inner.read().await.latest.get(&frequency).copied()
    }

    /// Rewrites an alert's creation time, for exercising the off-track
    /// cooldown without waiting.
    pub async fn backdate_alert(&self, id: Uuid, created_at: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        if let Some(alert) = inner.alerts.iter_mut().find(|a| a.id == id) {
            alert.created_at = created_at;
        }
    }

    /// Rewrites an insight's creation time (and its derived expiry), for
    /// exercising the expiry pass without waiting.
    pub async fn backdate_insight(&self, id: Uuid, created_at: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        if let Some(insight) = inner.insights.iter_mut().find(|i| i.id == id) {
            insight.created_at = created_at;
            insight.expires_at = Some(created_at + Duration::days(INSIGHT_TTL_DAYS));
        }
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn insert_snapshot(&self, snapshot: NewSnapshot) -> Result<Snapshot, StoreError> {
        let mut inner = self.inner.write().await;
        let created_at = inner.next_timestamp();
        let stored = Snapshot {
            id: Uuid::new_v4(),
            created_at,
            frequency: snapshot.frequency,
            period_start: snapshot.period_start,
            period_end: snapshot.period_end,
            metrics: snapshot.metrics,
            trends: snapshot.trends,
            generated_by: snapshot.generated_by,
            triggered_by: snapshot.triggered_by,
        };
        inner.snapshots.push(stored.clone());
        Ok(stored)
    }

    async fn latest_snapshot(
        &self,
        frequency: SnapshotFrequency,
    ) -> Result<Option<Snapshot>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .snapshots
            .iter()
            .filter(|s| s.frequency == frequency)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn recent_snapshots(
        &self,
        frequency: SnapshotFrequency,
        limit: usize,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let inner = self.inner.read().await;
        let mut matching: Vec<Snapshot> = inner
            .snapshots
            .iter()
            .filter(|s| s.frequency == frequency)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn set_latest_snapshot(
        &self,
        frequency: SnapshotFrequency,
        snapshot_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.latest.insert(frequency, snapshot_id);
        Ok(())
    }

    async fn list_kpi_targets(&self) -> Result<Vec<KpiTarget>, StoreError> {
        Ok(self.inner.read().await.kpis.clone())
    }

    async fn update_kpi_check(
        &self,
        kpi_id: Uuid,
        update: KpiCheckUpdate,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let kpi = inner
            .kpis
            .iter_mut()
            .find(|k| k.id == kpi_id)
            .ok_or(StoreError::NotFound {
                entity: "kpi target",
                id: kpi_id.to_string(),
            })?;
        kpi.current_value = update.current_value;
        kpi.status = update.status;
        kpi.trend = update.trend;
        kpi.trend_percentage = update.trend_percentage;
        kpi.last_checked = Some(update.last_checked);
        Ok(())
    }

    async fn append_kpi_history(
        &self,
        kpi_id: Uuid,
        value: f64,
        status: KpiStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let recorded_at = inner.next_timestamp();
        inner.history.entry(kpi_id).or_default().push(KpiHistoryPoint {
            value,
            status,
            recorded_at,
        });
        Ok(())
    }

    async fn recent_kpi_history(
        &self,
        kpi_id: Uuid,
        limit: usize,
    ) -> Result<Vec<KpiHistoryPoint>, StoreError> {
        let inner = self.inner.read().await;
        let mut points = inner.history.get(&kpi_id).cloned().unwrap_or_default();
        points.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        points.truncate(limit);
        Ok(points)
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let mut inner = self.inner.write().await;
        if alert.kind == AlertKind::MilestoneReached {
            if let Some(metric) = alert.metric.as_deref() {
                let existing = inner
                    .alerts
                    .iter()
                    .find(|a| {
                        a.kind == AlertKind::MilestoneReached && a.metric.as_deref() == Some(metric)
                    })
                    .cloned();
                if let Some(existing) = existing {
                    return Ok(existing);
                }
            }
        }
        let created_at = inner.next_timestamp();
        let stored = Alert {
            id: Uuid::new_v4(),
            kind: alert.kind,
            severity: alert.severity,
            title: alert.title,
            message: alert.message,
            kpi_id: alert.kpi_id,
            metric: alert.metric,
            current_value: alert.current_value,
            threshold_value: alert.threshold_value,
            created_at,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        };
        inner.alerts.push(stored.clone());
        Ok(stored)
    }

    async fn latest_alert_for_metric(
        &self,
        kind: AlertKind,
        metric: &str,
    ) -> Result<Option<Alert>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .alerts
            .iter()
            .filter(|a| a.kind == kind && a.metric.as_deref() == Some(metric))
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn insert_insight(&self, insight: NewInsight) -> Result<Option<Insight>, StoreError> {
        let mut inner = self.inner.write().await;
        let duplicate = inner.insights.iter().any(|i| {
            i.status == InsightStatus::Active
                && i.kind == insight.kind
                && i.category == insight.category
        });
        if duplicate {
            return Ok(None);
        }
        let created_at = inner.next_timestamp();
        let stored = Insight {
            id: Uuid::new_v4(),
            kind: insight.kind,
            category: insight.category,
            title: insight.title,
            summary: insight.summary,
            details: insight.details,
            confidence: insight.confidence,
            actionable: insight.actionable,
            suggested_actions: insight.suggested_actions,
            related_metrics: insight.related_metrics,
            created_at,
            expires_at: Some(created_at + Duration::days(INSIGHT_TTL_DAYS)),
            status: InsightStatus::Active,
            dismissed_by: None,
            dismissed_at: None,
        };
        inner.insights.push(stored.clone());
        Ok(Some(stored))
    }

    async fn has_active_insight(
        &self,
        kind: InsightKind,
        category: &str,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .insights
            .iter()
            .any(|i| i.status == InsightStatus::Active && i.kind == kind && i.category == category))
    }

    async fn active_insights_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Insight>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .insights
            .iter()
            .filter(|i| i.status == InsightStatus::Active && i.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn update_insight_status(
        &self,
        id: Uuid,
        status: InsightStatus,
        dismissed_by: Option<&str>,
    ) -> Result<Insight, StoreError> {
        let mut inner = self.inner.write().await;
        let insight = inner
            .insights
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(StoreError::NotFound {
                entity: "insight",
                id: id.to_string(),
            })?;
        insight.status = status;
        insight.dismissed_by = dismissed_by.map(str::to_owned);
        insight.dismissed_at = Some(Utc::now());
        Ok(insight.clone())
    }

    async fn upsert_flight_plan_status(&self, check: &MilestoneCheck) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.flight_plan = Some(check.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertSeverity;

    fn sample_insight(kind: InsightKind, category: &str) -> NewInsight {
        NewInsight {
            kind,
            category: category.to_string(),
            title: "Example".to_string(),
            summary: "Example summary".to_string(),
            details: "Example details".to_string(),
            confidence: 0.8,
            actionable: false,
            suggested_actions: vec![],
            related_metrics: vec![],
        }
    }

    fn milestone_alert(metric: &str) -> NewAlert {
        NewAlert {
            kind: AlertKind::MilestoneReached,
            severity: AlertSeverity::Info,
            title: "Milestone".to_string(),
            message: "Reached".to_string(),
            kpi_id: None,
            metric: Some(metric.to_string()),
            current_value: Some(100_000.0),
            threshold_value: Some(100_000.0),
        }
    }

    #[tokio::test]
    async fn active_insight_duplicates_are_suppressed() {
        let store = MemoryStore::new();
        let first = store
            .insert_insight(sample_insight(InsightKind::Trend, "Student Growth"))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .insert_insight(sample_insight(InsightKind::Trend, "Student Growth"))
            .await
            .unwrap();
        assert!(second.is_none());

        // A different kind in the same category is its own slot.
        let third = store
            .insert_insight(sample_insight(InsightKind::Anomaly, "Student Growth"))
            .await
            .unwrap();
        assert!(third.is_some());
    }

    #[tokio::test]
    async fn dismissing_frees_the_uniqueness_slot() {
        let store = MemoryStore::new();
        let first = store
            .insert_insight(sample_insight(InsightKind::Trend, "Funding"))
            .await
            .unwrap()
            .unwrap();
        store
            .update_insight_status(first.id, InsightStatus::Dismissed, Some("ops"))
            .await
            .unwrap();

        let second = store
            .insert_insight(sample_insight(InsightKind::Trend, "Funding"))
            .await
            .unwrap();
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn milestone_alerts_are_unique_per_metric() {
        let store = MemoryStore::new();
        let first = store.insert_alert(milestone_alert("flightPlan2030_25")).await.unwrap();
        let second = store.insert_alert(milestone_alert("flightPlan2030_25")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.alerts().await.len(), 1);

        let other = store.insert_alert(milestone_alert("flightPlan2030_50")).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn recent_listings_are_newest_first() {
        let store = MemoryStore::new();
        let kpi_id = Uuid::new_v4();
        for value in [1.0, 2.0, 3.0] {
            store.append_kpi_history(kpi_id, value, KpiStatus::Green).await.unwrap();
        }
        let points = store.recent_kpi_history(kpi_id, 2).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 3.0);
        assert_eq!(points[1].value, 2.0);
    }

    #[tokio::test]
    async fn unknown_insight_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_insight_status(Uuid::new_v4(), InsightStatus::Dismissed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
