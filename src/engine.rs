//! The engine root: holds the metric source and analytics store
//! capabilities plus the insight rule set. The batch operations
//! themselves are implemented in `snapshot`, `kpi`, and `insight`.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::insight::{default_rules, InsightRule};
use crate::models::{Alert, GeneratedBy, Insight, InsightStatus};
use crate::source::MetricSource;
use crate::store::AnalyticsStore;

/// How an operation run was initiated. Manual triggers carry the
/// already-authenticated caller identity; authorization happens in the
/// invoking wrapper, never here.
#[derive(Debug, Clone)]
pub enum Trigger {
    Scheduled,
    Manual { actor: String },
}

impl Trigger {
    pub fn generated_by(&self) -> GeneratedBy {
        match self {
            Trigger::Scheduled => GeneratedBy::Scheduled,
            Trigger::Manual { .. } => GeneratedBy::Manual,
        }
    }

    pub fn actor(&self) -> Option<&str> {
        match self {
            Trigger::Scheduled => None,
            Trigger::Manual { actor } => Some(actor),
        }
    }
}

/// Result of one KPI monitoring pass. `checked` counts KPIs fully
/// evaluated and persisted, `skipped` those dropped by a contained
/// per-KPI failure.
#[derive(Debug, Clone, Serialize)]
pub struct KpiCheckOutcome {
    pub checked: usize,
    pub skipped: usize,
    pub alerts: Vec<Alert>,
}

/// Result of one insight generation pass: freshly generated insights and
/// the number auto-dismissed by the expiry sweep.
#[derive(Debug, Clone, Serialize)]
pub struct InsightOutcome {
    pub generated: Vec<Insight>,
    pub dismissed: usize,
}

pub struct Engine {
    pub(crate) source: Arc<dyn MetricSource>,
    pub(crate) store: Arc<dyn AnalyticsStore>,
    pub(crate) rules: Vec<Box<dyn InsightRule>>,
}

impl Engine {
    pub fn new(source: Arc<dyn MetricSource>, store: Arc<dyn AnalyticsStore>) -> Self {
        Self::with_rules(source, store, default_rules())
    }

    /// Constructor with an explicit rule set, used to test rule ordering
    /// and failure isolation.
    pub fn with_rules(
        source: Arc<dyn MetricSource>,
        store: Arc<dyn AnalyticsStore>,
        rules: Vec<Box<dyn InsightRule>>,
    ) -> Self {
        Self { source, store, rules }
    }

    /// Marks an insight dismissed, or actioned when the operator took the
    /// suggested action. Unknown ids surface as a store failure.
    pub async fn dismiss_insight(
        &self,
        id: Uuid,
        actioned: bool,
        actor: &str,
    ) -> Result<Insight, EngineError> {
        let status = if actioned {
            InsightStatus::Actioned
        } else {
            InsightStatus::Dismissed
        };
        let insight = self.store.update_insight_status(id, status, Some(actor)).await?;
        info!(insight_id = %id, status = status.as_str(), actor, "insight dismissed");
        Ok(insight)
    }
}
