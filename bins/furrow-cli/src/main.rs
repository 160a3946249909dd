//! furrow: command-line driver for the Furrow reward engine.
//!
//! Previews emission schedules, replays scripted farm calls against an
//! in-memory ledger, and inspects saved engine state.

mod script;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use furrow_core::types::{Amount, BlockHeight, Pool, PoolId};
use furrow_engine::{persist, EmissionController, FarmConfig, FarmState, FarmStats};

use crate::script::{Simulation, Step};

#[derive(Parser)]
#[command(name = "furrow")]
#[command(version, about = "Multi-pool staking reward engine")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the emission rate and halving stage over a block range.
    Schedule(ScheduleArgs),
    /// Replay a JSON script of farm calls and print a report.
    Simulate(SimulateArgs),
    /// Summarise a saved engine state file.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ScheduleArgs {
    /// Farm config file (TOML, JSON or YAML).
    #[arg(short, long)]
    config: PathBuf,

    /// First block.
    #[arg(long, default_value_t = 0)]
    from: BlockHeight,

    /// Last block (exclusive).
    #[arg(long)]
    to: BlockHeight,

    /// Blocks between printed rows.
    #[arg(long, default_value_t = 1_000)]
    step: u64,
}

#[derive(Args)]
struct SimulateArgs {
    /// Farm config file (TOML, JSON or YAML).
    #[arg(short, long)]
    config: PathBuf,

    /// JSON script of steps.
    #[arg(short, long)]
    script: PathBuf,

    /// Block the farm and its configured pools are created at.
    #[arg(long, default_value_t = 0)]
    genesis_block: BlockHeight,

    /// Block the final report is taken at. Defaults to the last step's block.
    #[arg(long)]
    report_block: Option<BlockHeight>,

    /// Write the final engine state here.
    #[arg(long)]
    state_out: Option<PathBuf>,
}

#[derive(Args)]
struct InspectArgs {
    /// Engine state file written by `simulate --state-out`.
    #[arg(short, long)]
    state: PathBuf,
}

#[derive(Serialize)]
struct ScheduleRow {
    block: BlockHeight,
    rate: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<u64>,
}

#[derive(Serialize)]
struct ScheduleReport {
    kind: &'static str,
    start_block: BlockHeight,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_block: Option<BlockHeight>,
    total_emission: Amount,
    rows: Vec<ScheduleRow>,
}

#[derive(Serialize)]
struct PoolSummary<'a> {
    pid: PoolId,
    participants: usize,
    #[serde(flatten)]
    pool: &'a Pool,
}

#[derive(Serialize)]
struct StateSummary<'a> {
    owner: String,
    custody: String,
    reward_asset: String,
    fee_address: String,
    schedule: &'static str,
    reward_source: String,
    referral_bonus_bps: u64,
    referrers_bound: usize,
    remaining_budget: Option<Amount>,
    reward_reserve: Amount,
    total_weight: u64,
    stats: FarmStats,
    pools: Vec<PoolSummary<'a>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Schedule(args) => cmd_schedule(args),
        Commands::Simulate(args) => cmd_simulate(args),
        Commands::Inspect(args) => cmd_inspect(args),
    }
}

fn load_config(path: &Path) -> Result<FarmConfig> {
    FarmConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("encoding report")?;
    println!("{text}");
    Ok(())
}

fn cmd_schedule(args: ScheduleArgs) -> Result<()> {
    if args.to <= args.from {
        bail!("--to must be greater than --from");
    }
    if args.step == 0 {
        bail!("--step must be positive");
    }
    let config = load_config(&args.config)?;
    let schedule = config.emission.to_schedule();
    let emission = EmissionController::new(schedule.clone()).context("invalid schedule")?;
    let halving = schedule.kind() == "staged_halving";

    let mut rows = Vec::new();
    let mut block = args.from;
    while block < args.to {
        rows.push(ScheduleRow {
            block,
            rate: emission.rate_at(block),
            stage: halving.then(|| emission.stage_at(block)),
        });
        block = match block.checked_add(args.step) {
            Some(next) => next,
            None => break,
        };
    }

    let report = ScheduleReport {
        kind: schedule.kind(),
        start_block: schedule.start_block(),
        end_block: schedule.end_block(),
        total_emission: emission.emission_between(args.from, args.to)?,
        rows,
    };
    print_json(&report)
}

fn cmd_simulate(args: SimulateArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&text).context("parsing script")?;

    let mut sim = Simulation::new(&config, args.genesis_block)?;
    info!(steps = steps.len(), schedule = config.emission.to_schedule().kind(), "sim: starting");
    let outcomes = sim.run(&steps);
    let rejected = outcomes.iter().filter(|o| !o.ok).count();

    let last = steps.last().map_or(args.genesis_block, |s| s.block);
    let report = sim.report(args.report_block.unwrap_or(last), outcomes)?;
    info!(rejected, "sim: finished");

    if let Some(path) = &args.state_out {
        persist::save_state(path, sim.state())
            .with_context(|| format!("writing state {}", path.display()))?;
        info!(path = %path.display(), "sim: state saved");
    }
    print_json(&report)
}

fn cmd_inspect(args: InspectArgs) -> Result<()> {
    let state = persist::load_state(&args.state)
        .with_context(|| format!("reading state {}", args.state.display()))?;
    print_json(&summarize(&state))
}

fn summarize(state: &FarmState) -> StateSummary<'_> {
    let pools = state
        .registry
        .iter()
        .map(|(pid, pool)| PoolSummary {
            pid,
            participants: state.positions.participants(pid).count(),
            pool,
        })
        .collect();
    StateSummary {
        owner: state.owner.to_string(),
        custody: state.custody.to_string(),
        reward_asset: state.reward_asset.to_string(),
        fee_address: state.fees.fee_address().to_string(),
        schedule: state.emission.schedule().kind(),
        reward_source: format!("{:?}", state.reward_source),
        referral_bonus_bps: state.referrals.bonus_bps(),
        referrers_bound: state.referrals.len(),
        remaining_budget: state.emission.remaining_budget(),
        reward_reserve: state.reward_reserve,
        total_weight: state.registry.total_weight(),
        stats: state.stats,
        pools,
    }
}

/// Initialise the tracing subscriber. `RUST_LOG` overrides `level_str`.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
            .init();
    }
}
