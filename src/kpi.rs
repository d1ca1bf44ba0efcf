//! KPI monitoring: re-evaluate every configured target against its
//! thresholds, smooth a short-window trend from history, raise alerts on
//! status changes, and track Flight Plan 2030 milestones.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use tracing::{error, info, warn};

use crate::engine::{Engine, KpiCheckOutcome};
use crate::error::EngineError;
use crate::metrics::{
    days_until_flight_plan_end, derive_metric_key, format_count, trend_from_history, MetricKey,
    DAY_MS, FLIGHT_PLAN_END_YEAR, FLIGHT_PLAN_GOAL_LIVES, FLIGHT_PLAN_START_YEAR,
};
use crate::models::{
    AlertKind, AlertSeverity, KpiStatus, KpiTarget, KpiThresholds, MilestoneCheck, NewAlert,
};
use crate::source::{MetricSource, SourceError};
use crate::store::{AnalyticsStore, KpiCheckUpdate};

/// Stored history points consulted for trend smoothing.
const KPI_HISTORY_WINDOW: usize = 5;

const MILESTONE_THRESHOLDS: [u32; 6] = [10, 25, 50, 75, 90, 100];
const OFF_TRACK_METRIC: &str = "flightPlan2030_offTrack";
const OFF_TRACK_COOLDOWN_DAYS: i64 = 7;

/// Red/yellow/green classification by percent of target. Threshold
/// ordering is deliberately not validated; an inverted configuration
/// still evaluates top-down.
pub(crate) fn classify_status(
    current_value: f64,
    target_value: f64,
    thresholds: KpiThresholds,
) -> KpiStatus {
    let percent_of_target = (current_value / target_value) * 100.0;
    if percent_of_target >= thresholds.green {
        KpiStatus::Green
    } else if percent_of_target >= thresholds.yellow {
        KpiStatus::Yellow
    } else {
        KpiStatus::Red
    }
}

fn resolve_metric_key(kpi: &KpiTarget) -> String {
    kpi.metric_key
        .clone()
        .unwrap_or_else(|| derive_metric_key(&kpi.name))
}

/// Projects Flight Plan 2030 state from the current lives-impacted total:
/// expected progress is linear in elapsed program years, the completion
/// projection extrapolates the average daily rate since program start.
pub(crate) fn evaluate_flight_plan(current_lives: u64, now: DateTime<Utc>) -> MilestoneCheck {
    let goal = FLIGHT_PLAN_GOAL_LIVES as f64;
    let current_year = now.year();

    let total_years = (FLIGHT_PLAN_END_YEAR - FLIGHT_PLAN_START_YEAR) as f64;
    let years_elapsed = (current_year - FLIGHT_PLAN_START_YEAR).max(0) as f64;
    let expected_progress = (years_elapsed / total_years) * goal;

    // Fixed, valid calendar date.
    let start = NaiveDate::from_ymd_opt(FLIGHT_PLAN_START_YEAR, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
        .and_utc();

    let days_remaining = days_until_flight_plan_end(now);
    let days_since_start = ((now - start).num_milliseconds() as f64 / DAY_MS).ceil().max(1.0);

    let daily_rate = current_lives as f64 / days_since_start;
    let projected_completion = if daily_rate > 0.0 {
        let days_to_complete = ((goal - current_lives as f64) / daily_rate).ceil() as i64;
        Duration::try_days(days_to_complete)
            .and_then(|days| now.checked_add_signed(days))
            .map(|at| at.year())
    } else {
        None
    };

    MilestoneCheck {
        year: current_year,
        target_lives: expected_progress.round() as u64,
        current_lives,
        percent_complete: (current_lives as f64 / goal) * 100.0,
        on_track: current_lives as f64 >= expected_progress,
        projected_completion,
        days_remaining,
    }
}

impl Engine {
    /// One monitoring pass over every configured KPI. A KPI whose value
    /// cannot be read is skipped; a persistence failure aborts the rest
    /// of the pass without rolling back already-updated KPIs.
    pub async fn check_all_kpi_targets(&self) -> Result<KpiCheckOutcome, EngineError> {
        let kpis = self.store.list_kpi_targets().await?;
        if kpis.is_empty() {
            info!("no KPI targets configured");
            return Ok(KpiCheckOutcome { checked: 0, skipped: 0, alerts: Vec::new() });
        }

        let mut outcome = KpiCheckOutcome { checked: 0, skipped: 0, alerts: Vec::new() };
        for kpi in kpis {
            let key = resolve_metric_key(&kpi);
            let current_value = match self.current_metric_value(&key).await {
                Ok(value) => value,
                Err(err @ SourceError::Unavailable(_)) => return Err(EngineError::Source(err)),
                Err(SourceError::Query(reason)) => {
                    error!(kpi = %kpi.name, %reason, "failed to read KPI value, skipping");
                    outcome.skipped += 1;
                    continue;
                }
            };

            if kpi.thresholds.green < kpi.thresholds.yellow
                || kpi.thresholds.yellow < kpi.thresholds.red
            {
                warn!(kpi = %kpi.name, "thresholds are not descending (green >= yellow >= red)");
            }

            // Oldest-first series of stored points plus the fresh value.
            let history = self.store.recent_kpi_history(kpi.id, KPI_HISTORY_WINDOW).await?;
            let mut series: Vec<f64> = history.iter().rev().map(|point| point.value).collect();
            series.push(current_value);
            let (trend, trend_percentage) = trend_from_history(&series);

            let previous_status = kpi.status;
            let new_status = classify_status(current_value, kpi.target_value, kpi.thresholds);

            self.store
                .update_kpi_check(
                    kpi.id,
                    KpiCheckUpdate {
                        current_value,
                        status: new_status,
                        trend,
                        trend_percentage,
                        last_checked: Utc::now(),
                    },
                )
                .await?;
            self.store.append_kpi_history(kpi.id, current_value, new_status).await?;

            if previous_status != new_status {
                let alert = self.raise_status_alert(&kpi, current_value, new_status).await?;
                outcome.alerts.push(alert);
            }
            outcome.checked += 1;
        }

        info!(
            checked = outcome.checked,
            skipped = outcome.skipped,
            alerts = outcome.alerts.len(),
            "KPI check complete"
        );
        Ok(outcome)
    }

    /// Evaluates the Flight Plan 2030 goal, overwrites the latest state
    /// row, and raises milestone and off-track alerts. Milestone alerts
    /// fire at most once ever per threshold; off-track alerts re-notify
    /// on a 7-day cooldown.
    pub async fn check_flight_plan_milestones(&self) -> Result<MilestoneCheck, EngineError> {
        let current_lives = self.source.lives_impacted().await?.unwrap_or(0);
        let now = Utc::now();
        let check = evaluate_flight_plan(current_lives, now);
        self.store.upsert_flight_plan_status(&check).await?;

        for threshold in MILESTONE_THRESHOLDS {
            if check.percent_complete < threshold as f64 {
                continue;
            }
            let metric = format!("flightPlan2030_{threshold}");
            let existing = self
                .store
                .latest_alert_for_metric(AlertKind::MilestoneReached, &metric)
                .await?;
            if existing.is_some() {
                continue;
            }
            self.store
                .insert_alert(NewAlert {
                    kind: AlertKind::MilestoneReached,
                    severity: AlertSeverity::Info,
                    title: format!("Flight Plan 2030: {threshold}% Milestone Reached!"),
                    message: format!(
                        "Congratulations! We have reached {} lives impacted, achieving \
                         {threshold}% of our goal to impact 1 million lives by 2030.",
                        format_count(current_lives)
                    ),
                    kpi_id: None,
                    metric: Some(metric),
                    current_value: Some(current_lives as f64),
                    threshold_value: Some((threshold as f64 / 100.0) * FLIGHT_PLAN_GOAL_LIVES as f64),
                })
                .await?;
            info!(threshold, "flight plan milestone reached");
        }

        if !check.on_track {
            let last = self
                .store
                .latest_alert_for_metric(AlertKind::KpiWarning, OFF_TRACK_METRIC)
                .await?;
            let cooled_down = last
                .map(|alert| {
                    now.signed_duration_since(alert.created_at)
                        >= Duration::days(OFF_TRACK_COOLDOWN_DAYS)
                })
                .unwrap_or(true);
            if cooled_down {
                let projected = check
                    .projected_completion
                    .map(|year| year.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                self.store
                    .insert_alert(NewAlert {
                        kind: AlertKind::KpiWarning,
                        severity: AlertSeverity::Warning,
                        title: "Flight Plan 2030: Behind Schedule".to_string(),
                        message: format!(
                            "We are currently at {} lives impacted. To stay on track for 2030, \
                             we should be at {}. At current pace, projected completion is {}.",
                            format_count(current_lives),
                            format_count(check.target_lives),
                            projected
                        ),
                        kpi_id: None,
                        metric: Some(OFF_TRACK_METRIC.to_string()),
                        current_value: Some(current_lives as f64),
                        threshold_value: Some(check.target_lives as f64),
                    })
                    .await?;
                warn!(
                    current_lives,
                    expected = check.target_lives,
                    "flight plan is behind schedule"
                );
            }
        }

        Ok(check)
    }

    /// Current value for a KPI metric key. Unknown keys resolve to 0
    /// with a warning rather than failing the pass.
    async fn current_metric_value(&self, key: &str) -> Result<f64, SourceError> {
        let Some(metric) = MetricKey::parse(key) else {
            warn!(metric_key = key, "unknown metric key, using 0");
            return Ok(0.0);
        };

        let value = match metric {
            MetricKey::TotalStudents => self.source.count_students().await? as f64,
            MetricKey::ActiveStudents => self.source.count_active_students().await? as f64,
            MetricKey::TotalMentors => self.source.count_mentors().await? as f64,
            MetricKey::TotalOrganizations => self.source.count_organizations().await? as f64,
            MetricKey::ProgramCompletions => {
                self.source.count_completed_enrollments().await? as f64
            }
            // The donation KPI tracks the money raised, not the count.
            MetricKey::TotalDonations => self.source.total_donation_amount().await?,
            MetricKey::ScholarshipValue => self.source.awarded_scholarship_value().await?,
            MetricKey::LivesImpacted => self.source.lives_impacted().await?.unwrap_or(0) as f64,
            MetricKey::MentorStudentRatio => {
                let (students, mentors) =
                    tokio::join!(self.source.count_students(), self.source.count_mentors());
                let (students, mentors) = (students?, mentors?);
                if mentors > 0 {
                    students as f64 / mentors as f64
                } else {
                    0.0
                }
            }
            MetricKey::ProgramCompletionRate => {
                let (enrollments, completions) = tokio::join!(
                    self.source.count_enrollments(),
                    self.source.count_completed_enrollments()
                );
                let (enrollments, completions) = (enrollments?, completions?);
                if enrollments > 0 {
                    (completions as f64 / enrollments as f64) * 100.0
                } else {
                    0.0
                }
            }
        };
        Ok(value)
    }

    async fn raise_status_alert(
        &self,
        kpi: &KpiTarget,
        current_value: f64,
        new_status: KpiStatus,
    ) -> Result<crate::models::Alert, EngineError> {
        let alert = match new_status {
            KpiStatus::Green => {
                info!(kpi = %kpi.name, "KPI recovered");
                NewAlert {
                    kind: AlertKind::KpiWarning,
                    severity: AlertSeverity::Info,
                    title: format!("{} has recovered", kpi.name),
                    message: format!(
                        "The KPI \"{}\" has returned to healthy status ({} {}).",
                        kpi.name, current_value, kpi.unit
                    ),
                    kpi_id: Some(kpi.id),
                    metric: Some(kpi.name.clone()),
                    current_value: Some(current_value),
                    threshold_value: Some(kpi.thresholds.green),
                }
            }
            KpiStatus::Yellow => {
                warn!(kpi = %kpi.name, "KPI dropped to warning");
                NewAlert {
                    kind: AlertKind::KpiWarning,
                    severity: AlertSeverity::Warning,
                    title: format!("{} needs attention", kpi.name),
                    message: format!(
                        "The KPI \"{}\" has dropped to warning level ({} {}). Target: {} {}.",
                        kpi.name, current_value, kpi.unit, kpi.target_value, kpi.unit
                    ),
                    kpi_id: Some(kpi.id),
                    metric: Some(kpi.name.clone()),
                    current_value: Some(current_value),
                    threshold_value: Some(kpi.thresholds.yellow),
                }
            }
            KpiStatus::Red => {
                error!(kpi = %kpi.name, "KPI dropped to critical");
                NewAlert {
                    kind: AlertKind::KpiCritical,
                    severity: AlertSeverity::Critical,
                    title: format!("{} is critical", kpi.name),
                    message: format!(
                        "The KPI \"{}\" has dropped to critical level ({} {}). Immediate \
                         attention required. Target: {} {}.",
                        kpi.name, current_value, kpi.unit, kpi.target_value, kpi.unit
                    ),
                    kpi_id: Some(kpi.id),
                    metric: Some(kpi.name.clone()),
                    current_value: Some(current_value),
                    threshold_value: Some(kpi.thresholds.red),
                }
            }
        };
        Ok(self.store.insert_alert(alert).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::metrics::TrendDirection;
    use crate::source::StaticSource;
    use crate::store::memory::MemoryStore;
    use crate::store::AnalyticsStore;

    fn thresholds(green: f64, yellow: f64, red: f64) -> KpiThresholds {
        KpiThresholds { green, yellow, red }
    }

    #[test]
    fn classifies_percent_of_target() {
        let t = thresholds(90.0, 70.0, 50.0);
        assert_eq!(classify_status(95.0, 100.0, t), KpiStatus::Green);
        assert_eq!(classify_status(90.0, 100.0, t), KpiStatus::Green);
        assert_eq!(classify_status(89.9, 100.0, t), KpiStatus::Yellow);
        assert_eq!(classify_status(70.0, 100.0, t), KpiStatus::Yellow);
        assert_eq!(classify_status(69.9, 100.0, t), KpiStatus::Red);
        assert_eq!(classify_status(0.0, 100.0, t), KpiStatus::Red);
    }

    #[test]
    fn status_is_monotone_in_percent_of_target() {
        let t = thresholds(90.0, 70.0, 50.0);
        let mut last_rank = 0;
        for value in [10.0, 60.0, 69.0, 70.0, 80.0, 90.0, 120.0] {
            let rank = classify_status(value, 100.0, t).rank();
            assert!(rank >= last_rank, "rank regressed at value {value}");
            last_rank = rank;
        }
    }

    #[test]
    fn inverted_thresholds_still_evaluate_top_down() {
        // A green gate of 50 admits anything at or above 50%.
        let t = thresholds(50.0, 70.0, 90.0);
        assert_eq!(classify_status(60.0, 100.0, t), KpiStatus::Green);
        assert_eq!(classify_status(40.0, 100.0, t), KpiStatus::Red);
    }

    #[test]
    fn expected_progress_is_linear_in_years() {
        let now = Utc.with_ymd_and_hms(2027, 6, 15, 12, 0, 0).unwrap();
        let check = evaluate_flight_plan(250_000, now);

        assert_eq!(check.year, 2027);
        assert_eq!(check.target_lives, 500_000);
        assert_eq!(check.percent_complete, 25.0);
        assert!(!check.on_track);
    }

    #[test]
    fn on_track_when_lives_meet_expected() {
        let now = Utc.with_ymd_and_hms(2027, 6, 15, 12, 0, 0).unwrap();
        assert!(evaluate_flight_plan(500_000, now).on_track);
        assert!(evaluate_flight_plan(700_000, now).on_track);
    }

    #[test]
    fn start_year_has_zero_expected_progress() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let check = evaluate_flight_plan(0, now);
        assert_eq!(check.target_lives, 0);
        assert!(check.on_track);
    }

    #[test]
    fn days_remaining_counts_to_end_of_2030() {
        let now = Utc.with_ymd_and_hms(2027, 6, 15, 0, 0, 0).unwrap();
        let check = evaluate_flight_plan(250_000, now);
        assert_eq!(check.days_remaining, 1295);
    }

    #[test]
    fn zero_rate_has_no_projection() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let check = evaluate_flight_plan(0, now);
        assert_eq!(check.projected_completion, None);
    }

    #[test]
    fn projection_extrapolates_average_daily_rate() {
        // 600k lives over the 1096 days since 2024-01-01 is ~547/day;
        // the remaining 400k then lands in early 2029.
        let now = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        let check = evaluate_flight_plan(600_000, now);
        assert_eq!(check.projected_completion, Some(2029));
    }

    #[test]
    fn metric_key_prefers_explicit_binding() {
        let kpi = KpiTarget {
            id: uuid::Uuid::new_v4(),
            name: "Monthly Giving".to_string(),
            description: String::new(),
            category: "funding".to_string(),
            target_value: 10_000.0,
            current_value: 0.0,
            unit: "USD".to_string(),
            thresholds: thresholds(90.0, 70.0, 50.0),
            status: KpiStatus::Green,
            last_checked: None,
            trend: crate::metrics::TrendDirection::Stable,
            trend_percentage: 0.0,
            metric_key: Some("total_donations".to_string()),
        };
        assert_eq!(resolve_metric_key(&kpi), "total_donations");

        let derived = KpiTarget { metric_key: None, ..kpi };
        assert_eq!(resolve_metric_key(&derived), "monthly_giving");
    }

    fn target(name: &str, goal: f64, status: KpiStatus) -> KpiTarget {
        KpiTarget {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            category: "growth".to_string(),
            target_value: goal,
            current_value: 0.0,
            unit: "students".to_string(),
            thresholds: thresholds(90.0, 70.0, 50.0),
            status,
            last_checked: None,
            trend: TrendDirection::Stable,
            trend_percentage: 0.0,
            metric_key: None,
        }
    }

    fn engine_with(source: StaticSource, store: Arc<MemoryStore>) -> Engine {
        Engine::new(Arc::new(source), store)
    }

    #[tokio::test]
    async fn check_pass_updates_kpi_and_appends_history() {
        let store = Arc::new(MemoryStore::new());
        let kpi = target("Total Students", 500.0, KpiStatus::Green);
        let id = kpi.id;
        store.put_kpi_target(kpi).await;

        let source = StaticSource { students: 400, ..StaticSource::default() };
        let outcome = engine_with(source, store.clone())
            .check_all_kpi_targets()
            .await
            .unwrap();
        assert_eq!(outcome.checked, 1);
        assert_eq!(outcome.skipped, 0);
        assert!(outcome.alerts.is_empty());

        // Second pass with a higher reading trends up against the stored point.
        let source = StaticSource { students: 500, ..StaticSource::default() };
        engine_with(source, store.clone()).check_all_kpi_targets().await.unwrap();

        let stored = store.kpi_target(id).await.unwrap();
        assert_eq!(stored.current_value, 500.0);
        assert_eq!(stored.status, KpiStatus::Green);
        assert_eq!(stored.trend, TrendDirection::Up);
        assert_eq!(stored.trend_percentage, 25.0);
        assert!(stored.last_checked.is_some());

        let history = store.recent_kpi_history(id, 5).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].value, 500.0);
        assert_eq!(history[1].value, 400.0);
    }

    #[tokio::test]
    async fn status_transition_raises_exactly_one_alert() {
        let store = Arc::new(MemoryStore::new());
        let kpi = target("Total Students", 500.0, KpiStatus::Green);
        let id = kpi.id;
        store.put_kpi_target(kpi).await;

        let source = StaticSource { students: 200, ..StaticSource::default() };
        let engine = engine_with(source, store.clone());

        let outcome = engine.check_all_kpi_targets().await.unwrap();
        assert_eq!(outcome.alerts.len(), 1);
        let alert = &outcome.alerts[0];
        assert_eq!(alert.kind, AlertKind::KpiCritical);
        assert_eq!(alert.severity, AlertSeverity::Critical);
        assert_eq!(alert.title, "Total Students is critical");
        assert_eq!(alert.kpi_id, Some(id));

        // Unchanged status on the next pass stays quiet.
        let outcome = engine.check_all_kpi_targets().await.unwrap();
        assert!(outcome.alerts.is_empty());
        assert_eq!(store.alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn recovery_raises_an_info_alert() {
        let store = Arc::new(MemoryStore::new());
        let kpi = target("Total Students", 500.0, KpiStatus::Red);
        store.put_kpi_target(kpi).await;

        let source = StaticSource { students: 480, ..StaticSource::default() };
        let outcome = engine_with(source, store.clone())
            .check_all_kpi_targets()
            .await
            .unwrap();
        assert_eq!(outcome.alerts.len(), 1);
        assert_eq!(outcome.alerts[0].kind, AlertKind::KpiWarning);
        assert_eq!(outcome.alerts[0].severity, AlertSeverity::Info);
        assert_eq!(outcome.alerts[0].title, "Total Students has recovered");
    }

    #[tokio::test]
    async fn query_failure_skips_the_kpi_without_aborting() {
        let store = Arc::new(MemoryStore::new());
        let broken = target("Total Students", 500.0, KpiStatus::Green);
        let broken_id = broken.id;
        let healthy = target("Active Students", 400.0, KpiStatus::Green);
        let healthy_id = healthy.id;
        store.put_kpi_target(broken).await;
        store.put_kpi_target(healthy).await;

        let source = StaticSource {
            active_students: 380,
            failing: HashSet::from(["total_students"]),
            ..StaticSource::default()
        };
        let outcome = engine_with(source, store.clone())
            .check_all_kpi_targets()
            .await
            .unwrap();
        assert_eq!(outcome.checked, 1);
        assert_eq!(outcome.skipped, 1);

        assert!(store.kpi_target(broken_id).await.unwrap().last_checked.is_none());
        let healthy = store.kpi_target(healthy_id).await.unwrap();
        assert_eq!(healthy.current_value, 380.0);
        assert!(healthy.last_checked.is_some());
    }

    #[tokio::test]
    async fn unreachable_source_aborts_the_pass() {
        let store = Arc::new(MemoryStore::new());
        let kpi = target("Total Students", 500.0, KpiStatus::Green);
        let id = kpi.id;
        store.put_kpi_target(kpi).await;

        let source = StaticSource { unavailable: true, ..StaticSource::default() };
        let err = engine_with(source, store.clone())
            .check_all_kpi_targets()
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Source(SourceError::Unavailable(_))));
        assert!(store.kpi_target(id).await.unwrap().last_checked.is_none());
    }

    #[tokio::test]
    async fn unknown_metric_key_evaluates_as_zero() {
        let store = Arc::new(MemoryStore::new());
        let kpi = target("Community Reach", 500.0, KpiStatus::Green);
        let id = kpi.id;
        store.put_kpi_target(kpi).await;

        let outcome = engine_with(StaticSource::default(), store.clone())
            .check_all_kpi_targets()
            .await
            .unwrap();
        assert_eq!(outcome.checked, 1);
        assert_eq!(outcome.skipped, 0);

        let stored = store.kpi_target(id).await.unwrap();
        assert_eq!(stored.current_value, 0.0);
        assert_eq!(stored.status, KpiStatus::Red);
    }

    async fn milestone_metrics(store: &MemoryStore) -> Vec<String> {
        let mut metrics: Vec<String> = store
            .alerts()
            .await
            .into_iter()
            .filter(|alert| alert.kind == AlertKind::MilestoneReached)
            .filter_map(|alert| alert.metric)
            .collect();
        metrics.sort();
        metrics
    }

    #[tokio::test]
    async fn milestone_alerts_fire_once_ever() {
        let store = Arc::new(MemoryStore::new());

        let source = StaticSource { lives: Some(250_000), ..StaticSource::default() };
        let engine = engine_with(source, store.clone());
        engine.check_flight_plan_milestones().await.unwrap();
        assert_eq!(
            milestone_metrics(&store).await,
            vec!["flightPlan2030_10".to_string(), "flightPlan2030_25".to_string()]
        );

        engine.check_flight_plan_milestones().await.unwrap();
        assert_eq!(milestone_metrics(&store).await.len(), 2);

        // Progress unlocks new thresholds only.
        let source = StaticSource { lives: Some(500_000), ..StaticSource::default() };
        engine_with(source, store.clone()).check_flight_plan_milestones().await.unwrap();
        assert_eq!(
            milestone_metrics(&store).await,
            vec![
                "flightPlan2030_10".to_string(),
                "flightPlan2030_25".to_string(),
                "flightPlan2030_50".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn flight_plan_status_keeps_a_single_latest_row() {
        let store = Arc::new(MemoryStore::new());

        let source = StaticSource { lives: Some(100_000), ..StaticSource::default() };
        engine_with(source, store.clone()).check_flight_plan_milestones().await.unwrap();

        let source = StaticSource { lives: Some(150_000), ..StaticSource::default() };
        let check = engine_with(source, store.clone())
            .check_flight_plan_milestones()
            .await
            .unwrap();
        assert_eq!(check.percent_complete, 15.0);

        let stored = store.flight_plan().await.unwrap();
        assert_eq!(stored.current_lives, 150_000);
        assert_eq!(stored.percent_complete, 15.0);
    }

    #[tokio::test]
    async fn off_track_alert_respects_the_cooldown() {
        let store = Arc::new(MemoryStore::new());
        // Zero lives is behind the linear expectation in every year after
        // the program start.
        let source = StaticSource { lives: Some(0), ..StaticSource::default() };
        let engine = engine_with(source, store.clone());

        let check = engine.check_flight_plan_milestones().await.unwrap();
        assert!(!check.on_track);
        let alerts = store.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::KpiWarning);
        assert_eq!(alerts[0].metric.as_deref(), Some("flightPlan2030_offTrack"));
        assert!(alerts[0].message.contains("projected completion is unknown"));

        // Within the cooldown nothing new fires.
        engine.check_flight_plan_milestones().await.unwrap();
        assert_eq!(store.alerts().await.len(), 1);

        store.backdate_alert(alerts[0].id, Utc::now() - Duration::days(8)).await;
        engine.check_flight_plan_milestones().await.unwrap();
        assert_eq!(store.alerts().await.len(), 2);
    }
}
