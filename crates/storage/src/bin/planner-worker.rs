//! planner-worker — periodic scheduling sweep over active rules.
//!
//! Each tick the worker plans the configured horizon for every active rule:
//! candidates are generated, conflict-checked against the team calendar, and
//! accepted ones are materialized as appointments. Conflicts are never
//! auto-resolved; they are logged and left for manual handling. Already
//! materialized slots show up as conflicts on the next sweep, so repeated
//! sweeps never double-book.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};

use sweeply_core::Config;
use sweeply_recurrence::conflict::CandidateOutcome;
use sweeply_recurrence::schema::RuleStatus;
use sweeply_recurrence::service::RecurrenceService;
use sweeply_recurrence::traits::{AppointmentFactory, Page, RuleFilter};
use sweeply_storage::{InMemoryTeamCalendar, ScheduleStore};

const PAGE_SIZE: usize = 100;

// ── CLI ─────────────────────────────────────────────────────────────

/// Sweeply planner worker — materializes upcoming visits from active rules.
#[derive(Parser, Debug)]
#[command(name = "planner-worker", version, about)]
struct Cli {
    /// Override PLANNER_TICK_SECS from the environment.
    #[arg(long)]
    tick_secs: Option<u64>,

    /// Override PLANNER_HORIZON_DAYS from the environment.
    #[arg(long)]
    horizon_days: Option<u32>,

    /// Run a single sweep and exit (for cron-style invocation).
    #[arg(long, default_value_t = false)]
    once: bool,
}

// ── Sweep ───────────────────────────────────────────────────────────

async fn sweep(
    service: &RecurrenceService,
    factory: &Arc<InMemoryTeamCalendar>,
    horizon_days: u32,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let window_end = now + chrono::Duration::days(horizon_days as i64);
    let mut offset = 0;
    let mut planned_rules = 0;

    loop {
        let batch = service
            .list(
                &RuleFilter::with_status(RuleStatus::Active),
                Page {
                    offset,
                    limit: PAGE_SIZE,
                },
            )
            .await
            .context("listing active rules")?;
        if batch.is_empty() {
            break;
        }

        for rule in &batch {
            match service.plan_window(rule.id, now, window_end).await {
                Ok(planned) => {
                    let mut booked = 0usize;
                    let mut conflicts = 0usize;
                    for visit in &planned {
                        match &visit.outcome {
                            CandidateOutcome::Accepted => {
                                match factory.materialize(rule, &visit.occurrence).await {
                                    Ok(_) => booked += 1,
                                    Err(e) => warn!(
                                        rule_id = %rule.id,
                                        start = %visit.occurrence.scheduled_start,
                                        error = %e,
                                        "failed to materialize occurrence"
                                    ),
                                }
                            }
                            CandidateOutcome::Conflict { with } => {
                                conflicts += 1;
                                warn!(
                                    rule_id = %rule.id,
                                    team_id = %rule.team_id,
                                    candidate = %visit.occurrence.scheduled_start,
                                    busy_from = %with.start,
                                    busy_until = %with.end,
                                    "conflict left for manual handling"
                                );
                            }
                        }
                    }
                    if booked > 0 || conflicts > 0 {
                        info!(rule_id = %rule.id, booked, conflicts, "rule planned");
                    }
                }
                Err(e) => error!(rule_id = %rule.id, error = %e, "planning failed"),
            }
            planned_rules += 1;
        }

        if batch.len() < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }

    info!(rules = planned_rules, horizon_days, "sweep complete");
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    sweeply_core::config::load_dotenv();
    let mut config = Config::from_env();
    if let Some(tick) = cli.tick_secs {
        config.planner.tick_interval_secs = tick;
    }
    if let Some(horizon) = cli.horizon_days {
        config.planner.horizon_days = horizon;
    }
    config.log_summary();

    let store = ScheduleStore::from_config(&config).context("initializing storage")?;
    let service = Arc::new(
        RecurrenceService::new(store.repository.clone(), store.calendar.clone())
            .with_snapshot_retries(config.planner.snapshot_retries),
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.planner.tick_interval_secs));
    info!("planner-worker starting");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = sweep(&service, &store.calendar, config.planner.horizon_days).await {
                    error!(error = %e, "sweep failed");
                }
                if cli.once {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!("planner-worker exited cleanly");
    Ok(())
}
