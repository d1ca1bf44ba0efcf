use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

mod db;
mod engine;
mod error;
mod insight;
mod kpi;
mod metrics;
mod models;
mod snapshot;
mod source;
mod store;

use engine::{Engine, Trigger};
use error::{EngineError, ErrorCode};
use models::SnapshotFrequency;

/// Roles admitted to manual batch triggers.
const BATCH_ROLES: &[&str] = &["admin"];
/// Roles admitted to dismissing insights.
const DISMISS_ROLES: &[&str] = &["admin", "manager"];

#[derive(Parser)]
#[command(name = "impact-analytics")]
#[command(about = "Metrics aggregation and insight engine for Uplift Scholars", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import KPI definitions from a CSV file
    ImportKpis {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a metrics snapshot for one frequency timeline
    Snapshot {
        #[arg(long)]
        frequency: String,
        /// Email of the manual-trigger caller; omit for scheduled runs
        #[arg(long)]
        actor: Option<String>,
        /// Print the stored snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate KPI targets and Flight Plan 2030 milestones
    CheckKpis {
        /// Email of the manual-trigger caller; omit for scheduled runs
        #[arg(long)]
        actor: Option<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run insight rules over recent snapshots
    Insights {
        /// Email of the manual-trigger caller; omit for scheduled runs
        #[arg(long)]
        actor: Option<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dismiss an active insight
    DismissInsight {
        #[arg(long)]
        id: Uuid,
        /// Mark the insight actioned instead of dismissed
        #[arg(long)]
        actioned: bool,
        /// Email of the caller
        #[arg(long)]
        actor: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("started with verbosity level {}", cli.verbose);

    if let Err(err) = run(cli).await {
        let code = error_code(&err);
        error!(code = code.as_str(), "command failed: {err:#}");
        eprintln!("error ({}): {err:#}", code.as_str());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportKpis { csv } => {
            let applied = db::import_kpis(&pool, &csv).await?;
            println!("Applied {applied} KPI definitions from {}.", csv.display());
        }
        Commands::Snapshot {
            frequency,
            actor,
            json,
        } => {
            let frequency = SnapshotFrequency::parse(&frequency).ok_or_else(|| {
                EngineError::InvalidArgument(format!("unknown frequency: {frequency}"))
            })?;
            let trigger = resolve_trigger(&pool, actor, BATCH_ROLES).await?;
            let snapshot = build_engine(&pool).generate_snapshot(frequency, trigger).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!(
                    "Snapshot {} recorded on the {} timeline.",
                    snapshot.id,
                    frequency.as_str()
                );
                for (group, direction) in &snapshot.trends {
                    println!("- {}: {}", group.as_str(), direction.as_str());
                }
            }
        }
        Commands::CheckKpis { actor, json } => {
            if let Some(actor) = &actor {
                authorize(&pool, actor, BATCH_ROLES).await?;
            }
            let engine = build_engine(&pool);
            let outcome = engine.check_all_kpi_targets().await?;
            let check = engine.check_flight_plan_milestones().await?;
            if json {
                let combined = serde_json::json!({ "kpis": outcome, "flight_plan": check });
                println!("{}", serde_json::to_string_pretty(&combined)?);
            } else {
                println!(
                    "Checked {} KPIs ({} skipped), {} alerts raised.",
                    outcome.checked,
                    outcome.skipped,
                    outcome.alerts.len()
                );
                for alert in &outcome.alerts {
                    println!("- [{}] {}", alert.severity.as_str(), alert.title);
                }
                println!(
                    "Flight Plan 2030: {:.1}% complete, {}.",
                    check.percent_complete,
                    if check.on_track { "on track" } else { "behind schedule" }
                );
            }
        }
        Commands::Insights { actor, json } => {
            if let Some(actor) = &actor {
                authorize(&pool, actor, BATCH_ROLES).await?;
            }
            let outcome = build_engine(&pool).generate_all_insights().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!(
                    "Generated {} insights, dismissed {} stale.",
                    outcome.generated.len(),
                    outcome.dismissed
                );
                for insight in &outcome.generated {
                    println!("- [{}] {}", insight.kind.as_str(), insight.title);
                }
            }
        }
        Commands::DismissInsight { id, actioned, actor } => {
            let actor = actor.ok_or(EngineError::Unauthenticated)?;
            authorize(&pool, &actor, DISMISS_ROLES).await?;
            let insight = build_engine(&pool).dismiss_insight(id, actioned, &actor).await?;
            println!("Insight \"{}\" marked {}.", insight.title, insight.status.as_str());
        }
    }

    Ok(())
}

fn build_engine(pool: &PgPool) -> Engine {
    Engine::new(
        Arc::new(db::PgMetricSource::new(pool.clone())),
        Arc::new(db::PgAnalyticsStore::new(pool.clone())),
    )
}

/// Manual triggers carry an authorized actor; an omitted actor is the
/// scheduled (cron) path.
async fn resolve_trigger(
    pool: &PgPool,
    actor: Option<String>,
    admitted: &[&str],
) -> anyhow::Result<Trigger> {
    match actor {
        Some(actor) => {
            authorize(pool, &actor, admitted).await?;
            Ok(Trigger::Manual { actor })
        }
        None => Ok(Trigger::Scheduled),
    }
}

async fn authorize(pool: &PgPool, actor: &str, admitted: &[&str]) -> anyhow::Result<()> {
    let role = db::lookup_role(pool, actor)
        .await?
        .ok_or_else(|| EngineError::PermissionDenied(format!("no such user: {actor}")))?;
    if !admitted.contains(&role.as_str()) {
        return Err(
            EngineError::PermissionDenied(format!("role {role} may not run this command")).into(),
        );
    }
    Ok(())
}

/// Stable code for the failure, found anywhere in the context chain.
fn error_code(err: &anyhow::Error) -> ErrorCode {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<EngineError>())
        .map(EngineError::code)
        .unwrap_or(ErrorCode::Internal)
}
