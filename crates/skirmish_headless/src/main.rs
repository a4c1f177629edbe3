//! Headless skirmish runner.
//!
//! Runs a scripted scenario without graphics and prints a JSON summary.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario for 600 ticks (30 s of game time)
//! cargo run -p skirmish_headless -- run --catalog data/catalog.json \
//!     --scenario data/scenarios/duel.ron --ticks 600
//!
//! # Check a catalog for inconsistencies
//! cargo run -p skirmish_headless -- validate --catalog data/catalog.json
//! ```
//!
//! Output (stdout): JSON summary
//! Logs (stderr): human-readable, filtered by `RUST_LOG`

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_core::config::SimConfig;
use skirmish_headless::{
    load_catalog, load_config, Result, RunSummary, Scenario, ScenarioRunner, TracingSink,
};

/// Run length when neither the command line nor the scenario gives one.
const DEFAULT_TICKS: u64 = 1200;

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless skirmish runner for scripted scenarios and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print its summary
    Run {
        /// Item catalog (JSON, or RON with a .ron extension)
        #[arg(short, long)]
        catalog: PathBuf,

        /// Scenario file (RON)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Simulation settings (RON); defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of ticks to run
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Check a catalog and list every issue found
    Validate {
        /// Item catalog (JSON, or RON with a .ron extension)
        #[arg(short, long)]
        catalog: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only JSON.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            catalog,
            scenario,
            config,
            ticks,
        } => cmd_run(catalog, scenario, config, ticks),
        Commands::Validate { catalog } => cmd_validate(catalog),
    }
}

/// Run a single scenario
fn cmd_run(
    catalog: PathBuf,
    scenario: PathBuf,
    config: Option<PathBuf>,
    ticks: Option<u64>,
) -> ExitCode {
    let summary = run_scenario(&catalog, &scenario, config.as_deref(), ticks)
        .and_then(|summary| Ok(serde_json::to_string_pretty(&summary)?));

    match summary {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, scenario = %scenario.display(), "Run failed");
            eprintln!("FATAL: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_scenario(
    catalog: &Path,
    scenario: &Path,
    config: Option<&Path>,
    ticks: Option<u64>,
) -> Result<RunSummary> {
    let catalog = load_catalog(catalog)?;
    let config = match config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    let scenario = Scenario::load(scenario)?;
    let ticks = ticks.or(scenario.ticks).unwrap_or(DEFAULT_TICKS);

    let mut runner = ScenarioRunner::new(&scenario, catalog, config, TracingSink)?;
    Ok(runner.run(ticks))
}

/// Validate a catalog
fn cmd_validate(catalog: PathBuf) -> ExitCode {
    let loaded = match load_catalog(&catalog) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, path = %catalog.display(), "Failed to load catalog");
            eprintln!("FATAL: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let issues = loaded.validate();
    let report = serde_json::json!({
        "catalog": catalog.display().to_string(),
        "items": loaded.len(),
        "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    println!("{}", report);

    if issues.is_empty() {
        tracing::info!("{} items, no issues", loaded.len());
        ExitCode::SUCCESS
    } else {
        for issue in &issues {
            tracing::warn!("{}", issue);
        }
        ExitCode::FAILURE
    }
}
