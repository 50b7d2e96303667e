//! CLI entry point for the rebal portfolio rebalancer.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input};

use rebal::asset::{self, Asset};
use rebal::config::EngineConfig;
use rebal::error::Error;
use rebal::immediate;
use rebal::lump_sum;
use rebal::periodic::{FixedHorizon, FixedInstallment, PlanningStrategy};
use rebal::snapshot::PortfolioSnapshot;
use rebal::store;

#[derive(Parser)]
#[command(name = "rebal")]
#[command(about = "Portfolio rebalancing: immediate trades, lump sums, and contribution plans")]
#[command(version)]
struct Cli {
    /// Path to an optional engine config (TOML); defaults apply if absent
    #[arg(long, default_value = "rebal.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the portfolio summary (values, percentages, gaps)
    Show {
        /// Path to the portfolio JSON file
        portfolio: PathBuf,
    },

    /// Compute the buy/sell trades that hit every target right now
    Now {
        portfolio: PathBuf,
    },

    /// Allocate a one-time contribution; solves for the minimum if no
    /// amount is given
    LumpSum {
        portfolio: PathBuf,

        /// Fixed contribution amount (no selling); omit to solve for the
        /// minimum that reaches exact balance
        #[arg(long)]
        amount: Option<f64>,
    },

    /// Build a periodic contribution plan
    Plan {
        portfolio: PathBuf,

        /// Fixed installment size; the period count is solved for
        #[arg(long, conflicts_with_all = ["periods", "max_per_period"])]
        amount: Option<f64>,

        /// Fixed number of periods (requires --max-per-period)
        #[arg(long, requires = "max_per_period")]
        periods: Option<u32>,

        /// Per-period budget cap for the fixed-period plan
        #[arg(long)]
        max_per_period: Option<f64>,
    },

    /// Interactively create a portfolio file
    New {
        /// Output path for the portfolio JSON file
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match EngineConfig::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Show { portfolio } => show(&portfolio, &config),
        Command::Now { portfolio } => now(&portfolio, &config),
        Command::LumpSum { portfolio, amount } => lump(&portfolio, amount, &config),
        Command::Plan {
            portfolio,
            amount,
            periods,
            max_per_period,
        } => plan(&portfolio, amount, periods, max_per_period, &config),
        Command::New { output } => new_portfolio(&output, &config),
    };

    if let Err(e) = result {
        match e.downcast_ref::<Error>() {
            Some(Error::InvalidTargetSum { .. }) => {
                eprintln!("\nAborted: {e}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        }
    }
}

/// Load a portfolio file and build the validated snapshot.
fn load_snapshot(path: &PathBuf, config: &EngineConfig) -> anyhow::Result<PortfolioSnapshot> {
    let (name, assets) = store::load_file(path)?;
    let snapshot = PortfolioSnapshot::build_checked(&assets, config)?;
    if !name.is_empty() {
        println!("Portfolio: {name}");
    }
    Ok(snapshot)
}

fn show(path: &PathBuf, config: &EngineConfig) -> anyhow::Result<()> {
    let snapshot = load_snapshot(path, config)?;
    print!("{snapshot}");
    Ok(())
}

fn now(path: &PathBuf, config: &EngineConfig) -> anyhow::Result<()> {
    let snapshot = load_snapshot(path, config)?;
    let plan = immediate::rebalance_now(&snapshot, config);
    print!("{plan}");
    Ok(())
}

fn lump(path: &PathBuf, amount: Option<f64>, config: &EngineConfig) -> anyhow::Result<()> {
    let snapshot = load_snapshot(path, config)?;
    let plan = match amount {
        Some(amount) => lump_sum::allocate_fixed(&snapshot, amount, config)?,
        None => lump_sum::solve_minimum(&snapshot, config),
    };
    print!("{plan}");
    Ok(())
}

fn plan(
    path: &PathBuf,
    amount: Option<f64>,
    periods: Option<u32>,
    max_per_period: Option<f64>,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let snapshot = load_snapshot(path, config)?;

    let plan = match (amount, periods, max_per_period) {
        (Some(amount), None, None) => FixedInstallment { amount }.plan(&snapshot, config)?,
        (None, Some(periods), Some(max_per_period)) => FixedHorizon {
            periods,
            max_per_period,
        }
        .plan(&snapshot, config)?,
        _ => anyhow::bail!("pass either --amount, or --periods with --max-per-period"),
    };

    print!("{plan}");
    Ok(())
}

/// Interactive portfolio entry, replacing hand-edited JSON.
fn new_portfolio(output: &PathBuf, config: &EngineConfig) -> anyhow::Result<()> {
    if output.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists, overwrite?", output.display()))
            .default(false)
            .interact()
            .context("confirmation prompt failed")?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    let name: String = Input::new()
        .with_prompt("Portfolio name")
        .interact_text()
        .context("name prompt failed")?;

    let mut assets: Vec<Asset> = Vec::new();
    for i in 1..=config.max_assets {
        let asset_name: String = Input::new()
            .with_prompt(format!("Asset {i} name (empty to finish)"))
            .allow_empty(true)
            .interact_text()?;
        if asset_name.is_empty() {
            break;
        }
        let current_value: f64 = Input::new()
            .with_prompt("Current value")
            .validate_with(|v: &f64| {
                if *v >= 0.0 {
                    Ok(())
                } else {
                    Err("value must be >= 0")
                }
            })
            .interact_text()?;
        let target_pct: f64 = Input::new()
            .with_prompt("Target %")
            .validate_with(|v: &f64| {
                if (0.0..=100.0).contains(v) {
                    Ok(())
                } else {
                    Err("target must be in [0, 100]")
                }
            })
            .interact_text()?;
        assets.push(Asset::new(asset_name, current_value, target_pct));
    }

    let total = asset::validate_target_sum(&assets, config.cent_tolerance)?;
    println!("Target sum: {total:.1}%");

    store::save_file(output, &name, &assets)?;
    println!("Saved {}", output.display());
    Ok(())
}
