//! [`MetricSource`] backed by the demo domain tables in Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::source::{MetricSource, SourceError};

pub struct PgMetricSource {
    pool: PgPool,
}

impl PgMetricSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> Result<u64, SourceError> {
        let row = sqlx::query(sql).fetch_one(&self.pool).await.map_err(classify)?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn sum(&self, sql: &str) -> Result<f64, SourceError> {
        let row = sqlx::query(sql).fetch_one(&self.pool).await.map_err(classify)?;
        Ok(row.get("total"))
    }
}

/// Connection-level failures mean the whole source is unreachable;
/// anything else is scoped to the single query.
fn classify(err: sqlx::Error) -> SourceError {
    match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => SourceError::Unavailable(err.to_string()),
        _ => SourceError::Query(err.to_string()),
    }
}

#[async_trait]
impl MetricSource for PgMetricSource {
    async fn count_students(&self) -> Result<u64, SourceError> {
        self.count("SELECT COUNT(*) AS count FROM impact_analytics.users WHERE role = 'student'")
            .await
    }

    async fn count_active_students(&self) -> Result<u64, SourceError> {
        self.count(
            "SELECT COUNT(*) AS count FROM impact_analytics.users \
             WHERE role = 'student' AND status = 'active'",
        )
        .await
    }

    async fn count_new_students_since(&self, since: DateTime<Utc>) -> Result<u64, SourceError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM impact_analytics.users \
             WHERE role = 'student' AND created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn count_mentors(&self) -> Result<u64, SourceError> {
        self.count("SELECT COUNT(*) AS count FROM impact_analytics.users WHERE role = 'mentor'")
            .await
    }

    async fn count_active_mentors(&self) -> Result<u64, SourceError> {
        self.count(
            "SELECT COUNT(*) AS count FROM impact_analytics.users \
             WHERE role = 'mentor' AND status = 'active'",
        )
        .await
    }

    async fn count_organizations(&self) -> Result<u64, SourceError> {
        self.count("SELECT COUNT(*) AS count FROM impact_analytics.organizations").await
    }

    async fn count_active_organizations(&self) -> Result<u64, SourceError> {
        self.count(
            "SELECT COUNT(*) AS count FROM impact_analytics.organizations \
             WHERE status = 'active'",
        )
        .await
    }

    async fn count_programs(&self) -> Result<u64, SourceError> {
        self.count("SELECT COUNT(*) AS count FROM impact_analytics.programs").await
    }

    async fn count_enrollments(&self) -> Result<u64, SourceError> {
        self.count("SELECT COUNT(*) AS count FROM impact_analytics.enrollments").await
    }

    async fn count_completed_enrollments(&self) -> Result<u64, SourceError> {
        self.count(
            "SELECT COUNT(*) AS count FROM impact_analytics.enrollments \
             WHERE status = 'completed'",
        )
        .await
    }

    async fn count_scholarships(&self) -> Result<u64, SourceError> {
        self.count("SELECT COUNT(*) AS count FROM impact_analytics.scholarships").await
    }

    async fn awarded_scholarship_value(&self) -> Result<f64, SourceError> {
        self.sum(
            "SELECT COALESCE(SUM(amount), 0) AS total FROM impact_analytics.scholarships \
             WHERE status = 'awarded'",
        )
        .await
    }

    async fn count_donations(&self) -> Result<u64, SourceError> {
        self.count("SELECT COUNT(*) AS count FROM impact_analytics.donations").await
    }

    async fn total_donation_amount(&self) -> Result<f64, SourceError> {
        self.sum("SELECT COALESCE(SUM(amount), 0) AS total FROM impact_analytics.donations")
            .await
    }

    async fn count_sponsors(&self) -> Result<u64, SourceError> {
        self.count("SELECT COUNT(*) AS count FROM impact_analytics.sponsors").await
    }

    async fn lives_impacted(&self) -> Result<Option<u64>, SourceError> {
        let row = sqlx::query(
            "SELECT total_lives_impacted FROM impact_analytics.impact_totals WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;
        Ok(row.map(|row| {
            let total: i64 = row.get("total_lives_impacted");
            total.max(0) as u64
        }))
    }
}
