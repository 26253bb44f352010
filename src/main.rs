mod config;
mod engine;
mod error;
mod export;
mod ledger;
mod manager;
mod model;
mod monte_carlo;
mod prices;
mod stats;
mod thermal;
mod thermostat;

use crate::manager::{Manager, SimOverrides};
use crate::model::Column;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new Monte Carlo batch.
    Create {
        #[arg(long)]
        smart_thermostat: Option<bool>,

        #[arg(long)]
        smart_price_max: Option<f64>,
    },

    /// Add samples to an existing batch.
    Resume {
        #[arg(long)]
        batch_idx: usize,
    },

    /// Simulate a single month and export every period.
    Month,

    /// Compute running averages over every batch.
    Analyze {
        #[arg(long, value_enum, num_args = 1.., default_values_t = [Column::KwhCost, Column::Temperature])]
        columns: Vec<Column>,
    },

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Create {
            smart_thermostat,
            smart_price_max,
        } => mgr.create_batch(&SimOverrides {
            smart_thermostat,
            smart_price_max,
        })?,
        Command::Resume { batch_idx } => mgr.resume_batch(batch_idx)?,
        Command::Month => mgr.simulate_month()?,
        Command::Analyze { columns } => mgr.analyze_batches(&columns)?,
        Command::Clean => mgr.clean_sim()?,
    }

    Ok(())
}
