//! Postgres plumbing: schema migrations, demo seed data, KPI definition
//! import, and the role lookup used by manual triggers.

pub mod source;
pub mod store;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub use source::PgMetricSource;
pub use store::PgAnalyticsStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Role of the given user, if they exist. Manual triggers resolve
/// `--actor` emails through this before touching the engine.
pub async fn lookup_role(pool: &PgPool, email: &str) -> anyhow::Result<Option<String>> {
    let row = sqlx::query("SELECT role FROM impact_analytics.users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("role")))
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let users = vec![
        (
            Uuid::parse_str("6f1c2a4e-9d3b-4e6a-8c0f-2a7d9e4b1c35")?,
            "Dana Whitfield",
            "dana.whitfield@uplift.org",
            "admin",
            "active",
            NaiveDate::from_ymd_opt(2024, 2, 15).context("invalid date")?,
        ),
        (
            Uuid::parse_str("2b8e5d71-3c4f-4a29-9e84-d61f0b7a5c92")?,
            "Marcus Obi",
            "marcus.obi@uplift.org",
            "manager",
            "active",
            NaiveDate::from_ymd_opt(2024, 6, 1).context("invalid date")?,
        ),
        (
            Uuid::parse_str("a3d9f2b7-1e58-4c06-b27a-84f1c6e09d43")?,
            "Priya Raman",
            "priya.raman@uplift.org",
            "mentor",
            "active",
            NaiveDate::from_ymd_opt(2024, 9, 12).context("invalid date")?,
        ),
        (
            Uuid::parse_str("c47b0e19-6a2d-4f83-92c5-1b8f7d30ea66")?,
            "Jordan Ellis",
            "jordan.ellis@uplift.org",
            "mentor",
            "active",
            NaiveDate::from_ymd_opt(2025, 1, 20).context("invalid date")?,
        ),
        (
            Uuid::parse_str("e59a1c83-7f40-4b6d-a1e2-3c9d5b27f084")?,
            "Sofia Mendez",
            "sofia.mendez@uplift.org",
            "mentor",
            "inactive",
            NaiveDate::from_ymd_opt(2024, 11, 5).context("invalid date")?,
        ),
        (
            Uuid::parse_str("19f3c6d2-8b5e-4a07-9c41-e270a8d5b3f6")?,
            "Amara Diallo",
            "amara.diallo@uplift.org",
            "student",
            "active",
            NaiveDate::from_ymd_opt(2025, 3, 18).context("invalid date")?,
        ),
        (
            Uuid::parse_str("7d21e8a5-4c9f-4d36-8e70-5a1b3f92c648")?,
            "Leo Tran",
            "leo.tran@uplift.org",
            "student",
            "active",
            NaiveDate::from_ymd_opt(2025, 8, 2).context("invalid date")?,
        ),
        (
            Uuid::parse_str("b682d4f0-2e7a-4c15-9d38-6f04c1a79e52")?,
            "Nia Okafor",
            "nia.okafor@uplift.org",
            "student",
            "active",
            NaiveDate::from_ymd_opt(2026, 1, 27).context("invalid date")?,
        ),
        (
            Uuid::parse_str("4e07a9c3-5d18-4f62-b84a-90e2d6c517b3")?,
            "Mateo Silva",
            "mateo.silva@uplift.org",
            "student",
            "active",
            NaiveDate::from_ymd_opt(2026, 8, 20).context("invalid date")?,
        ),
        (
            Uuid::parse_str("d1c5b7e9-0f32-4a84-86d9-7b45e0a2c318")?,
            "Hana Suzuki",
            "hana.suzuki@uplift.org",
            "student",
            "inactive",
            NaiveDate::from_ymd_opt(2025, 5, 9).context("invalid date")?,
        ),
    ];

    for (id, full_name, email, role, status, joined) in users {
        sqlx::query(
            r#"
            INSERT INTO impact_analytics.users (id, full_name, email, role, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, role = EXCLUDED.role, status = EXCLUDED.status
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(role)
        .bind(status)
        .bind(joined.and_time(NaiveTime::MIN).and_utc())
        .execute(pool)
        .await?;
    }

    let organizations = vec![
        ("Westside Youth Alliance", "active"),
        ("Harbor Education Fund", "active"),
        ("Bright Path Collective", "active"),
        ("Northgate Community Trust", "active"),
        ("Cedar Valley Outreach", "inactive"),
        ("Summit Scholars Network", "inactive"),
    ];

    for (name, status) in organizations {
        sqlx::query(
            r#"
            INSERT INTO impact_analytics.organizations (id, name, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(status)
        .execute(pool)
        .await?;
    }

    let programs = vec![
        ("Mentorship Foundations", "active"),
        ("College Prep Track", "active"),
        ("Career Catalyst", "active"),
    ];

    for (name, status) in programs {
        sqlx::query(
            r#"
            INSERT INTO impact_analytics.programs (id, name, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(status)
        .execute(pool)
        .await?;
    }

    let enrollments = vec![
        (
            "amara.diallo@uplift.org",
            "Mentorship Foundations",
            "completed",
            NaiveDate::from_ymd_opt(2025, 6, 30).context("invalid date")?,
        ),
        (
            "amara.diallo@uplift.org",
            "College Prep Track",
            "enrolled",
            NaiveDate::from_ymd_opt(2026, 2, 14).context("invalid date")?,
        ),
        (
            "leo.tran@uplift.org",
            "Mentorship Foundations",
            "completed",
            NaiveDate::from_ymd_opt(2026, 3, 1).context("invalid date")?,
        ),
        (
            "nia.okafor@uplift.org",
            "Mentorship Foundations",
            "enrolled",
            NaiveDate::from_ymd_opt(2026, 2, 10).context("invalid date")?,
        ),
        (
            "mateo.silva@uplift.org",
            "Career Catalyst",
            "enrolled",
            NaiveDate::from_ymd_opt(2026, 8, 21).context("invalid date")?,
        ),
        (
            "hana.suzuki@uplift.org",
            "College Prep Track",
            "enrolled",
            NaiveDate::from_ymd_opt(2025, 6, 12).context("invalid date")?,
        ),
    ];

    for (email, program, status, enrolled_at) in enrollments {
        let user_id: Uuid =
            sqlx::query("SELECT id FROM impact_analytics.users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");
        let program_id: Uuid =
            sqlx::query("SELECT id FROM impact_analytics.programs WHERE name = $1")
                .bind(program)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO impact_analytics.enrollments (id, user_id, program_id, status, enrolled_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, program_id) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(program_id)
        .bind(status)
        .bind(enrolled_at)
        .execute(pool)
        .await?;
    }

    let scholarships = vec![
        (
            "Founders Grant",
            5000.0_f64,
            "awarded",
            Some(NaiveDate::from_ymd_opt(2025, 9, 1).context("invalid date")?),
        ),
        (
            "STEM Futures Award",
            7500.0,
            "awarded",
            Some(NaiveDate::from_ymd_opt(2026, 4, 15).context("invalid date")?),
        ),
        ("Community Leader Award", 2500.0, "pending", None),
    ];

    for (name, amount, status, awarded_at) in scholarships {
        sqlx::query(
            r#"
            INSERT INTO impact_analytics.scholarships (id, name, amount, status, awarded_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE
            SET amount = EXCLUDED.amount, status = EXCLUDED.status,
                awarded_at = EXCLUDED.awarded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(amount)
        .bind(status)
        .bind(awarded_at)
        .execute(pool)
        .await?;
    }

    let applications = vec![
        (
            "Founders Grant",
            "amara.diallo@uplift.org",
            "approved",
            NaiveDate::from_ymd_opt(2025, 8, 20).context("invalid date")?,
        ),
        (
            "STEM Futures Award",
            "leo.tran@uplift.org",
            "approved",
            NaiveDate::from_ymd_opt(2026, 3, 28).context("invalid date")?,
        ),
        (
            "Community Leader Award",
            "nia.okafor@uplift.org",
            "submitted",
            NaiveDate::from_ymd_opt(2026, 6, 25).context("invalid date")?,
        ),
    ];

    for (scholarship, email, status, submitted_at) in applications {
        let scholarship_id: Uuid =
            sqlx::query("SELECT id FROM impact_analytics.scholarships WHERE name = $1")
                .bind(scholarship)
                .fetch_one(pool)
                .await?
                .get("id");
        let user_id: Uuid =
            sqlx::query("SELECT id FROM impact_analytics.users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO impact_analytics.scholarship_applications
            (id, scholarship_id, user_id, status, submitted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (scholarship_id, user_id) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(scholarship_id)
        .bind(user_id)
        .bind(status)
        .bind(submitted_at)
        .execute(pool)
        .await?;
    }

    let donations = vec![
        (
            "seed-d001",
            "Evergreen Foundation",
            10000.0_f64,
            NaiveDate::from_ymd_opt(2026, 5, 4).context("invalid date")?,
        ),
        (
            "seed-d002",
            "Chen Family Fund",
            2500.0,
            NaiveDate::from_ymd_opt(2026, 6, 11).context("invalid date")?,
        ),
        (
            "seed-d003",
            "Anonymous",
            150.0,
            NaiveDate::from_ymd_opt(2026, 7, 2).context("invalid date")?,
        ),
        (
            "seed-d004",
            "Riverside Rotary",
            1200.0,
            NaiveDate::from_ymd_opt(2026, 7, 19).context("invalid date")?,
        ),
        (
            "seed-d005",
            "Anonymous",
            75.0,
            NaiveDate::from_ymd_opt(2026, 8, 8).context("invalid date")?,
        ),
        (
            "seed-d006",
            "Kestrel Capital Giving",
            5000.0,
            NaiveDate::from_ymd_opt(2026, 8, 22).context("invalid date")?,
        ),
    ];

    for (reference, donor_name, amount, donated_at) in donations {
        sqlx::query(
            r#"
            INSERT INTO impact_analytics.donations (id, reference, donor_name, amount, donated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (reference) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(reference)
        .bind(donor_name)
        .bind(amount)
        .bind(donated_at)
        .execute(pool)
        .await?;
    }

    let sponsors = vec![
        ("Lumen Energy", "active"),
        ("Atlas Logistics", "active"),
        ("Harborview Bank", "inactive"),
    ];

    for (name, status) in sponsors {
        sqlx::query(
            r#"
            INSERT INTO impact_analytics.sponsors (id, name, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(status)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO impact_analytics.impact_totals (id, total_lives_impacted, updated_at)
        VALUES (1, $1, now())
        ON CONFLICT (id) DO UPDATE
        SET total_lives_impacted = EXCLUDED.total_lives_impacted, updated_at = now()
        "#,
    )
    .bind(12_450_i64)
    .execute(pool)
    .await?;

    let kpis = vec![
        ("Total Students", "Students registered across all programs", "growth", 500.0_f64, "students"),
        ("Active Students", "Students currently engaged in programming", "engagement", 400.0, "students"),
        ("Total Donations", "Cumulative donation revenue", "funding", 250_000.0, "USD"),
        ("Lives Impacted", "Total beneficiaries reached", "impact", 100_000.0, "lives"),
        ("Program Completion Rate", "Share of enrollments that finish their program", "programs", 75.0, "%"),
    ];

    // Starter set only: re-seeding never clobbers monitor-owned state.
    for (name, description, category, target_value, unit) in kpis {
        sqlx::query(
            r#"
            INSERT INTO impact_analytics.kpi_targets
            (id, name, description, category, target_value, current_value, unit,
             green_threshold, yellow_threshold, red_threshold, status, trend, trend_percentage)
            VALUES ($1, $2, $3, $4, $5, 0, $6, 90, 70, 50, 'green', 'stable', 0)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(category)
        .bind(target_value)
        .bind(unit)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Upserts KPI definitions from a CSV file, returning the number of
/// rows applied. Monitor-owned fields (current value, status, trend,
/// last checked) are left untouched on update.
pub async fn import_kpis(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        description: String,
        category: String,
        target_value: f64,
        unit: String,
        green: f64,
        yellow: f64,
        red: f64,
        metric_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut applied = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let metric_key = row.metric_key.filter(|key| !key.is_empty());

        sqlx::query(
            r#"
            INSERT INTO impact_analytics.kpi_targets
            (id, name, description, category, target_value, current_value, unit,
             green_threshold, yellow_threshold, red_threshold, status, trend,
             trend_percentage, metric_key)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8, $9, 'green', 'stable', 0, $10)
            ON CONFLICT (name) DO UPDATE
            SET description = EXCLUDED.description,
                category = EXCLUDED.category,
                target_value = EXCLUDED.target_value,
                unit = EXCLUDED.unit,
                green_threshold = EXCLUDED.green_threshold,
                yellow_threshold = EXCLUDED.yellow_threshold,
                red_threshold = EXCLUDED.red_threshold,
                metric_key = EXCLUDED.metric_key
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.category)
        .bind(row.target_value)
        .bind(&row.unit)
        .bind(row.green)
        .bind(row.yellow)
        .bind(row.red)
        .bind(metric_key)
        .execute(pool)
        .await?;

        applied += 1;
    }

    Ok(applied)
}
