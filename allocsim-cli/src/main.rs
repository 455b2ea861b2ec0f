//! allocsim CLI: replay a run file, or print a rebalance schedule.
//!
//! Commands:
//! - `run`: replay a TOML run file against CSV prices and print statistics
//! - `schedule`: list the rebalance instants for a date range

mod logging;

use std::path::{Path, PathBuf};

use allocsim_core::schedule::{self, MarketAnchor, RebalancePeriod};
use allocsim_runner::{allocation_frame, equity_frame, render_summary, run_file, RunOutcome};
use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc, Weekday};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "allocsim", about = "allocsim: static allocation backtest replay")]
struct Cli {
    /// Log level for allocsim crates (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a TOML run file and print its statistics.
    Run {
        /// Path to the run file.
        #[arg(long)]
        config: PathBuf,

        /// Print the final holdings table.
        #[arg(long, default_value_t = false)]
        holdings: bool,

        /// Print the full outcome as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Also print the last N rows of the equity curve and allocation table.
        #[arg(long)]
        tail: Option<usize>,
    },
    /// List the rebalance instants between two dates.
    Schedule {
        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: String,

        #[arg(long, value_enum, default_value_t = PeriodArg::Weekly)]
        period: PeriodArg,

        /// Weekday for weekly schedules (e.g. Wed).
        #[arg(long, value_parser = parse_weekday)]
        weekday: Option<Weekday>,

        #[arg(long, value_enum, default_value_t = AnchorArg::Close)]
        anchor: AnchorArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PeriodArg {
    Daily,
    Weekly,
    Monthly,
    Never,
}

impl From<PeriodArg> for RebalancePeriod {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Daily => RebalancePeriod::Daily,
            PeriodArg::Weekly => RebalancePeriod::Weekly,
            PeriodArg::Monthly => RebalancePeriod::Monthly,
            PeriodArg::Never => RebalancePeriod::Never,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnchorArg {
    Open,
    Close,
}

impl From<AnchorArg> for MarketAnchor {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::Open => MarketAnchor::Open,
            AnchorArg::Close => MarketAnchor::Close,
        }
    }
}

fn parse_weekday(s: &str) -> Result<Weekday, String> {
    s.parse::<Weekday>()
        .map_err(|_| format!("'{s}' is not a weekday (try Mon, Tue, Wed, Thu or Fri)"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            holdings,
            json,
            tail,
        } => run_cmd(&config, holdings, json, tail),
        Commands::Schedule {
            start,
            end,
            period,
            weekday,
            anchor,
        } => schedule_cmd(&start, &end, period.into(), weekday, anchor.into()),
    }
}

fn run_cmd(config: &Path, holdings: bool, json: bool, tail: Option<usize>) -> Result<()> {
    let outcome = run_file(config, holdings)?;

    if json {
        let text = serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?;
        println!("{text}");
        return Ok(());
    }

    print!(
        "{}",
        render_summary(&outcome.strategy, &outcome.summary, &outcome.metrics)
    );
    if let Some(n) = tail {
        print_tables(&outcome, n)?;
    }
    Ok(())
}

fn print_tables(outcome: &RunOutcome, n: usize) -> Result<()> {
    let equity = equity_frame(&outcome.equity_curve).context("Failed to build equity frame")?;
    let weights =
        allocation_frame(&outcome.allocation_table).context("Failed to build allocation frame")?;
    println!();
    println!("{}", equity.tail(Some(n)));
    println!("{}", weights.tail(Some(n)));
    Ok(())
}

fn schedule_cmd(
    start: &str,
    end: &str,
    period: RebalancePeriod,
    weekday: Option<Weekday>,
    anchor: MarketAnchor,
) -> Result<()> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    let schedule = schedule::generate(
        &Utc.from_utc_datetime(&start.and_time(chrono::NaiveTime::MIN)),
        &Utc.from_utc_datetime(&end.and_time(chrono::NaiveTime::MIN)),
        period,
        weekday,
        anchor,
    )
    .context("Failed to generate rebalance schedule")?;

    for ts in schedule.iter() {
        println!("{}", ts.to_rfc3339());
    }
    tracing::info!(instants = schedule.len(), "schedule generated");
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Invalid date '{s}'"))
}
