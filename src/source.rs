//! Read-only capability over the operational datastore the engine
//! aggregates from. Implementations live in `db::source` (Postgres) and,
//! for tests, [`StaticSource`] below.

#[cfg(test)]
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The datastore cannot be reached at all. Fatal to the whole run.
    #[error("metric source unavailable: {0}")]
    Unavailable(String),

    /// A single query failed. The affected metric degrades to zero.
    #[error("metric query failed: {0}")]
    Query(String),
}

/// Counts and sums over the domain entities that feed [`CoreMetrics`].
///
/// Every method is a bounded single-shot query; callers may issue them
/// concurrently. `lives_impacted` distinguishes "no running total kept"
/// (`Ok(None)`) from a failed read.
///
/// [`CoreMetrics`]: crate::metrics::CoreMetrics
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn count_students(&self) -> Result<u64, SourceError>;
    async fn count_active_students(&self) -> Result<u64, SourceError>;
    async fn count_new_students_since(&self, since: DateTime<Utc>) -> Result<u64, SourceError>;
    async fn count_mentors(&self) -> Result<u64, SourceError>;
    async fn count_active_mentors(&self) -> Result<u64, SourceError>;
    async fn count_organizations(&self) -> Result<u64, SourceError>;
    async fn count_active_organizations(&self) -> Result<u64, SourceError>;
    async fn count_programs(&self) -> Result<u64, SourceError>;
    async fn count_enrollments(&self) -> Result<u64, SourceError>;
    async fn count_completed_enrollments(&self) -> Result<u64, SourceError>;
    async fn count_scholarships(&self) -> Result<u64, SourceError>;
    async fn awarded_scholarship_value(&self) -> Result<f64, SourceError>;
    async fn count_donations(&self) -> Result<u64, SourceError>;
    async fn total_donation_amount(&self) -> Result<f64, SourceError>;
    async fn count_sponsors(&self) -> Result<u64, SourceError>;
    async fn lives_impacted(&self) -> Result<Option<u64>, SourceError>;
}

/// A source with canned values, used by the test suites. Individual
/// metrics can be made to fail by key, or the whole source marked
/// unreachable.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub students: u64,
    pub active_students: u64,
    pub new_students: u64,
    pub mentors: u64,
    pub active_mentors: u64,
    pub organizations: u64,
    pub active_organizations: u64,
    pub programs: u64,
    pub enrollments: u64,
    pub completed_enrollments: u64,
    pub scholarships: u64,
    pub scholarship_value: f64,
    pub donations: u64,
    pub donation_amount: f64,
    pub sponsors: u64,
    pub lives: Option<u64>,
    pub failing: HashSet<&'static str>,
    pub unavailable: bool,
}

#[cfg(test)]
impl StaticSource {
    fn gate(&self, key: &'static str) -> Result<(), SourceError> {
        if self.unavailable {
            return Err(SourceError::Unavailable("static source marked unreachable".into()));
        }
        if self.failing.contains(key) {
            return Err(SourceError::Query(format!("{key} query failed")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl MetricSource for StaticSource {
    async fn count_students(&self) -> Result<u64, SourceError> {
        self.gate("total_students")?;
        Ok(self.students)
    }

    async fn count_active_students(&self) -> Result<u64, SourceError> {
        self.gate("active_students")?;
        Ok(self.active_students)
    }

    async fn count_new_students_since(&self, _since: DateTime<Utc>) -> Result<u64, SourceError> {
        self.gate("new_students")?;
        Ok(self.new_students)
    }

    async fn count_mentors(&self) -> Result<u64, SourceError> {
        self.gate("total_mentors")?;
        Ok(self.mentors)
    }

    async fn count_active_mentors(&self) -> Result<u64, SourceError> {
        self.gate("active_mentors")?;
        Ok(self.active_mentors)
    }

    async fn count_organizations(&self) -> Result<u64, SourceError> {
        self.gate("total_organizations")?;
        Ok(self.organizations)
    }

    async fn count_active_organizations(&self) -> Result<u64, SourceError> {
        self.gate("active_organizations")?;
        Ok(self.active_organizations)
    }

    async fn count_programs(&self) -> Result<u64, SourceError> {
        self.gate("total_programs")?;
        Ok(self.programs)
    }

    async fn count_enrollments(&self) -> Result<u64, SourceError> {
        self.gate("program_enrollments")?;
        Ok(self.enrollments)
    }

    async fn count_completed_enrollments(&self) -> Result<u64, SourceError> {
        self.gate("program_completions")?;
        Ok(self.completed_enrollments)
    }

    async fn count_scholarships(&self) -> Result<u64, SourceError> {
        self.gate("total_scholarships")?;
        Ok(self.scholarships)
    }

    async fn awarded_scholarship_value(&self) -> Result<f64, SourceError> {
        self.gate("scholarship_value")?;
        Ok(self.scholarship_value)
    }

    async fn count_donations(&self) -> Result<u64, SourceError> {
        self.gate("total_donations")?;
        Ok(self.donations)
    }

    async fn total_donation_amount(&self) -> Result<f64, SourceError> {
        self.gate("donation_amount")?;
        Ok(self.donation_amount)
    }

    async fn count_sponsors(&self) -> Result<u64, SourceError> {
        self.gate("total_sponsors")?;
        Ok(self.sponsors)
    }

    async fn lives_impacted(&self) -> Result<Option<u64>, SourceError> {
        self.gate("lives_impacted")?;
        Ok(self.lives)
    }
}
