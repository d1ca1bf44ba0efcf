//! Snapshot generation: collect raw counts from the metric source,
//! derive ratios and rates, compare against the prior snapshot of the
//! same frequency, and persist the result.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{info, warn};

use crate::engine::{Engine, Trigger};
use crate::error::EngineError;
use crate::metrics::{classify_trend, CoreMetrics, MetricGroup, FLIGHT_PLAN_GOAL_LIVES};
use crate::models::{NewSnapshot, Snapshot, SnapshotFrequency};
use crate::source::{MetricSource, SourceError};
use crate::store::AnalyticsStore;

/// Rolling window boundaries: `period_end` is `now` truncated to
/// midnight UTC, `period_start` lies 1/7/30 days earlier. Never
/// calendar-aligned.
pub(crate) fn period_boundaries(
    frequency: SnapshotFrequency,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let start = end - Duration::days(frequency.period_days());
    (start, end)
}

fn count_or_zero(
    result: Result<u64, SourceError>,
    metric: &'static str,
) -> Result<u64, EngineError> {
    match result {
        Ok(value) => Ok(value),
        Err(err @ SourceError::Unavailable(_)) => Err(EngineError::Source(err)),
        Err(SourceError::Query(reason)) => {
            warn!(metric, %reason, "metric read failed, defaulting to 0");
            Ok(0)
        }
    }
}

fn sum_or_zero(result: Result<f64, SourceError>, metric: &'static str) -> Result<f64, EngineError> {
    match result {
        Ok(value) => Ok(value),
        Err(err @ SourceError::Unavailable(_)) => Err(EngineError::Source(err)),
        Err(SourceError::Query(reason)) => {
            warn!(metric, %reason, "metric read failed, defaulting to 0");
            Ok(0.0)
        }
    }
}

fn lives_or_missing(
    result: Result<Option<u64>, SourceError>,
) -> Result<Option<u64>, EngineError> {
    match result {
        Ok(value) => Ok(value),
        Err(err @ SourceError::Unavailable(_)) => Err(EngineError::Source(err)),
        Err(SourceError::Query(reason)) => {
            warn!(metric = "lives_impacted", %reason, "metric read failed, falling back to estimate");
            Ok(None)
        }
    }
}

impl Engine {
    /// Collects current metrics, computes per-group trends against the
    /// most recent snapshot of the same frequency, and persists a new
    /// snapshot plus the per-frequency latest pointer.
    ///
    /// Only an unreachable metric source fails the run; individual read
    /// failures degrade the affected metric to 0.
    pub async fn generate_snapshot(
        &self,
        frequency: SnapshotFrequency,
        trigger: Trigger,
    ) -> Result<Snapshot, EngineError> {
        let now = Utc::now();
        let (period_start, period_end) = period_boundaries(frequency, now);

        let metrics = self.collect_metrics(period_start).await?;
        let previous = self.store.latest_snapshot(frequency).await?;

        let mut trends = BTreeMap::new();
        for group in MetricGroup::ALL {
            let baseline = previous
                .as_ref()
                .map(|prior| group.value(&prior.metrics))
                .unwrap_or(0.0);
            trends.insert(group, classify_trend(group.value(&metrics), baseline));
        }

        let stored = self
            .store
            .insert_snapshot(NewSnapshot {
                frequency,
                period_start,
                period_end,
                metrics,
                trends,
                generated_by: trigger.generated_by(),
                triggered_by: trigger.actor().map(str::to_owned),
            })
            .await?;
        self.store.set_latest_snapshot(frequency, stored.id).await?;

        info!(
            frequency = frequency.as_str(),
            snapshot_id = %stored.id,
            generated_by = stored.generated_by.as_str(),
            "generated snapshot"
        );
        Ok(stored)
    }

    async fn collect_metrics(
        &self,
        period_start: DateTime<Utc>,
    ) -> Result<CoreMetrics, EngineError> {
        let source = &self.source;
        let (
            students,
            active_students,
            new_students,
            mentors,
            active_mentors,
            organizations,
            active_organizations,
            programs,
            enrollments,
            completions,
            scholarships,
            scholarship_value,
            donations,
            donation_amount,
            sponsors,
            lives,
        ) = tokio::join!(
            source.count_students(),
            source.count_active_students(),
            source.count_new_students_since(period_start),
            source.count_mentors(),
            source.count_active_mentors(),
            source.count_organizations(),
            source.count_active_organizations(),
            source.count_programs(),
            source.count_enrollments(),
            source.count_completed_enrollments(),
            source.count_scholarships(),
            source.awarded_scholarship_value(),
            source.count_donations(),
            source.total_donation_amount(),
            source.count_sponsors(),
            source.lives_impacted(),
        );

        let total_students = count_or_zero(students, "total_students")?;
        let active_students = count_or_zero(active_students, "active_students")?;
        let new_students_this_period = count_or_zero(new_students, "new_students_this_period")?;
        let total_mentors = count_or_zero(mentors, "total_mentors")?;
        let active_mentors = count_or_zero(active_mentors, "active_mentors")?;
        let total_organizations = count_or_zero(organizations, "total_organizations")?;
        let active_organizations = count_or_zero(active_organizations, "active_organizations")?;
        let total_programs = count_or_zero(programs, "total_programs")?;
        let program_enrollments = count_or_zero(enrollments, "program_enrollments")?;
        let program_completions = count_or_zero(completions, "program_completions")?;
        let total_scholarships = count_or_zero(scholarships, "total_scholarships")?;
        let scholarship_value_awarded = sum_or_zero(scholarship_value, "scholarship_value_awarded")?;
        let total_donations = count_or_zero(donations, "total_donations")?;
        let total_donation_amount = sum_or_zero(donation_amount, "total_donation_amount")?;
        let total_sponsors = count_or_zero(sponsors, "total_sponsors")?;
        let lives = lives_or_missing(lives)?;

        let mentor_student_ratio = if total_mentors > 0 {
            total_students as f64 / total_mentors as f64
        } else {
            0.0
        };
        let completion_rate = if program_enrollments > 0 {
            (program_completions as f64 / program_enrollments as f64) * 100.0
        } else {
            0.0
        };
        let average_donation = if total_donations > 0 {
            total_donation_amount / total_donations as f64
        } else {
            0.0
        };
        let student_growth_rate = if total_students > 0 {
            (new_students_this_period as f64 / total_students as f64) * 100.0
        } else {
            0.0
        };

        // A recorded running total of zero falls back to the estimate too.
        let lives_impacted = match lives {
            Some(total) if total > 0 => total,
            _ => total_students + program_completions,
        };
        let progress_to_goal = (lives_impacted as f64 / FLIGHT_PLAN_GOAL_LIVES as f64) * 100.0;

        Ok(CoreMetrics {
            total_students,
            active_students,
            new_students_this_period,
            student_growth_rate,
            total_mentors,
            active_mentors,
            mentor_student_ratio,
            total_organizations,
            active_organizations,
            total_programs,
            program_enrollments,
            program_completions,
            completion_rate,
            total_scholarships,
            scholarship_value_awarded,
            total_donations,
            total_donation_amount,
            total_sponsors,
            average_donation,
            lives_impacted,
            progress_to_goal,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::metrics::TrendDirection;
    use crate::models::GeneratedBy;
    use crate::source::StaticSource;
    use crate::store::memory::MemoryStore;

    fn engine_with(source: StaticSource) -> (Engine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = Engine::new(Arc::new(source), store.clone());
        (engine, store)
    }

    fn sample_source() -> StaticSource {
        StaticSource {
            students: 100,
            active_students: 80,
            new_students: 10,
            mentors: 20,
            active_mentors: 15,
            organizations: 12,
            active_organizations: 9,
            programs: 4,
            enrollments: 50,
            completed_enrollments: 30,
            scholarships: 6,
            scholarship_value: 60_000.0,
            donations: 40,
            donation_amount: 20_000.0,
            sponsors: 5,
            lives: None,
            ..Default::default()
        }
    }

    #[test]
    fn boundaries_are_midnight_truncated_rolling_windows() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 42, 7).unwrap();

        let (start, end) = period_boundaries(SnapshotFrequency::Daily, now);
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());

        let (start, _) = period_boundaries(SnapshotFrequency::Weekly, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap());

        // 30 days back, not a calendar month.
        let (start, _) = period_boundaries(SnapshotFrequency::Monthly, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 8, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn derives_rates_and_estimates_lives() {
        let (engine, _) = engine_with(sample_source());
        let snapshot = engine
            .generate_snapshot(SnapshotFrequency::Daily, Trigger::Scheduled)
            .await
            .unwrap();

        let m = &snapshot.metrics;
        assert_eq!(m.total_students, 100);
        assert_eq!(m.mentor_student_ratio, 5.0);
        assert_eq!(m.completion_rate, 60.0);
        assert_eq!(m.average_donation, 500.0);
        assert_eq!(m.student_growth_rate, 10.0);
        // No running total kept: students + completions.
        assert_eq!(m.lives_impacted, 130);
        assert!((m.progress_to_goal - 0.013).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_running_total_falls_back_to_estimate() {
        let mut source = sample_source();
        source.lives = Some(0);
        let (engine, _) = engine_with(source);
        let snapshot = engine
            .generate_snapshot(SnapshotFrequency::Daily, Trigger::Scheduled)
            .await
            .unwrap();
        assert_eq!(snapshot.metrics.lives_impacted, 130);
    }

    #[tokio::test]
    async fn first_snapshot_trends_against_zero_baseline() {
        let mut source = sample_source();
        source.programs = 0;
        let (engine, _) = engine_with(source);
        let snapshot = engine
            .generate_snapshot(SnapshotFrequency::Daily, Trigger::Scheduled)
            .await
            .unwrap();

        assert_eq!(snapshot.trends[&MetricGroup::Students], TrendDirection::Up);
        assert_eq!(snapshot.trends[&MetricGroup::Programs], TrendDirection::Stable);
    }

    #[tokio::test]
    async fn trends_compare_against_prior_same_frequency_snapshot() {
        let store = Arc::new(MemoryStore::new());

        let first = Engine::new(Arc::new(sample_source()), store.clone());
        first
            .generate_snapshot(SnapshotFrequency::Daily, Trigger::Scheduled)
            .await
            .unwrap();

        // +5% students is up, +1% organizations stays inside the band,
        // mentors drop is down.
        let mut changed = sample_source();
        changed.students = 105;
        changed.organizations = 12;
        changed.mentors = 15;
        let second = Engine::new(Arc::new(changed), store.clone());
        let snapshot = second
            .generate_snapshot(SnapshotFrequency::Daily, Trigger::Scheduled)
            .await
            .unwrap();

        assert_eq!(snapshot.trends[&MetricGroup::Students], TrendDirection::Up);
        assert_eq!(snapshot.trends[&MetricGroup::Organizations], TrendDirection::Stable);
        assert_eq!(snapshot.trends[&MetricGroup::Mentors], TrendDirection::Down);
    }

    #[tokio::test]
    async fn weekly_timeline_does_not_mix_with_daily() {
        let store = Arc::new(MemoryStore::new());
        let engine = Engine::new(Arc::new(sample_source()), store.clone());
        engine
            .generate_snapshot(SnapshotFrequency::Daily, Trigger::Scheduled)
            .await
            .unwrap();

        let mut grown = sample_source();
        grown.students = 200;
        let engine = Engine::new(Arc::new(grown), store.clone());
        let weekly = engine
            .generate_snapshot(SnapshotFrequency::Weekly, Trigger::Scheduled)
            .await
            .unwrap();

        // No prior weekly snapshot, so the baseline is zero.
        assert_eq!(weekly.trends[&MetricGroup::Students], TrendDirection::Up);
        assert_eq!(
            store.latest_pointer(SnapshotFrequency::Weekly).await,
            Some(weekly.id)
        );
    }

    #[tokio::test]
    async fn single_metric_failure_degrades_to_zero() {
        let mut source = sample_source();
        source.failing.insert("total_mentors");
        let (engine, _) = engine_with(source);
        let snapshot = engine
            .generate_snapshot(SnapshotFrequency::Daily, Trigger::Scheduled)
            .await
            .unwrap();

        assert_eq!(snapshot.metrics.total_mentors, 0);
        assert_eq!(snapshot.metrics.mentor_student_ratio, 0.0);
        // Other metrics are untouched.
        assert_eq!(snapshot.metrics.total_students, 100);
    }

    #[tokio::test]
    async fn unreachable_source_fails_the_run() {
        let mut source = sample_source();
        source.unavailable = true;
        let (engine, store) = engine_with(source);
        let err = engine
            .generate_snapshot(SnapshotFrequency::Daily, Trigger::Scheduled)
            .await
            .unwrap_err();

        assert_eq!(err.code().as_str(), "internal");
        assert!(store.latest_snapshot(SnapshotFrequency::Daily).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn manual_trigger_is_attributed() {
        let (engine, _) = engine_with(sample_source());
        let snapshot = engine
            .generate_snapshot(
                SnapshotFrequency::Daily,
                Trigger::Manual { actor: "admin-1".into() },
            )
            .await
            .unwrap();

        assert_eq!(snapshot.generated_by, GeneratedBy::Manual);
        assert_eq!(snapshot.triggered_by.as_deref(), Some("admin-1"));
    }
}
