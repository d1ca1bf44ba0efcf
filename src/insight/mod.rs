//! Rule-based insight generation over the recent snapshot window.
//!
//! Each [`InsightRule`] inspects a newest-first window of daily
//! snapshots and may produce one draft insight per pass. The generation
//! pass first auto-dismisses expired insights, then evaluates every
//! registered rule with per-rule failure containment, deduplicating
//! against active insights by (kind, category).

pub mod rules;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::engine::{Engine, InsightOutcome};
use crate::error::EngineError;
use crate::models::{InsightStatus, NewInsight, Snapshot, SnapshotFrequency, INSIGHT_TTL_DAYS};
use crate::store::AnalyticsStore;

/// Daily snapshots handed to each rule, newest first.
const SNAPSHOT_WINDOW: usize = 7;

/// A narrative rule that evaluates the recent snapshot window and
/// optionally produces a draft insight.
///
/// Rules are pure analysis: persistence, deduplication, and expiry are
/// handled by the generation pass. A rule that returns an error is
/// logged and skipped without affecting the other rules.
pub trait InsightRule: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;

    /// Evaluates a newest-first window of daily snapshots. `now` is the
    /// wall clock of the pass, shared by all rules.
    fn evaluate(
        &self,
        window: &[Snapshot],
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<NewInsight>>;
}

/// The built-in rule set, in evaluation order.
pub fn default_rules() -> Vec<Box<dyn InsightRule>> {
    vec![
        Box::new(rules::StudentGrowthRule),
        Box::new(rules::MentorCapacityRule),
        Box::new(rules::ProgramCompletionRule),
        Box::new(rules::DonationTrendRule),
        Box::new(rules::FlightPlanProjectionRule),
        Box::new(rules::OrgNetworkHealthRule),
    ]
}

impl Engine {
    /// One insight generation pass: expiry sweep, then every registered
    /// rule against the recent daily snapshot window. Only freshly
    /// inserted insights are reported as generated.
    pub async fn generate_all_insights(&self) -> Result<InsightOutcome, EngineError> {
        let now = Utc::now();
        let mut outcome = InsightOutcome { generated: Vec::new(), dismissed: 0 };

        // Expiry runs unconditionally so stale insights free their
        // dedup slot before any rule is evaluated.
        let cutoff = now - Duration::days(INSIGHT_TTL_DAYS);
        for stale in self.store.active_insights_created_before(cutoff).await? {
            self.store
                .update_insight_status(stale.id, InsightStatus::Dismissed, None)
                .await?;
            debug!(id = %stale.id, title = %stale.title, "insight expired");
            outcome.dismissed += 1;
        }

        let window = self
            .store
            .recent_snapshots(SnapshotFrequency::Daily, SNAPSHOT_WINDOW)
            .await?;
        if window.is_empty() {
            warn!("no snapshots available for insight generation");
            return Ok(outcome);
        }

        for rule in &self.rules {
            let draft = match rule.evaluate(&window, now) {
                Ok(Some(draft)) => draft,
                Ok(None) => continue,
                Err(err) => {
                    error!(rule = rule.name(), error = %err, "insight rule failed");
                    continue;
                }
            };
            if self.store.has_active_insight(draft.kind, &draft.category).await? {
                debug!(rule = rule.name(), category = %draft.category, "active insight already exists");
                continue;
            }
            if let Some(insight) = self.store.insert_insight(draft).await? {
                outcome.generated.push(insight);
            }
        }

        info!(
            generated = outcome.generated.len(),
            dismissed = outcome.dismissed,
            "insight generation complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod testkit {
    use std::collections::BTreeMap;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::metrics::CoreMetrics;
    use crate::models::{GeneratedBy, Snapshot, SnapshotFrequency};

    /// A daily snapshot carrying the given metrics, suitable for
    /// feeding rule windows directly.
    pub(crate) fn snapshot_with(metrics: CoreMetrics) -> Snapshot {
        let now = Utc::now();
        Snapshot {
            id: Uuid::new_v4(),
            created_at: now,
            frequency: SnapshotFrequency::Daily,
            period_start: now - Duration::days(1),
            period_end: now,
            metrics,
            trends: BTreeMap::new(),
            generated_by: GeneratedBy::Scheduled,
            triggered_by: None,
        }
    }
}
