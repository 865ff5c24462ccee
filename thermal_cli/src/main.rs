//! # Thermal Budget CLI
//!
//! Command line front end for `thermal_core`: load a conductivity table and
//! a bundle, run a calculation pass and print the per-stage heat loads.
//!
//! ```bash
//! thermal calc --materials tables/conductivity.csv --bundle fridge.json --out fridge.json
//! thermal materials --materials tables/conductivity.csv
//! thermal stages
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use thermal_core::calculations::RecomputeReport;
use thermal_core::file_io::{load_bundle, save_model, FileLock};
use thermal_core::materials::load_library;
use thermal_core::model::ThermalModel;
use thermal_core::settings::EngineSettings;
use thermal_core::stages::StageLadder;

const LOCK_HOLDER: &str = "thermal-cli";

#[derive(Parser)]
#[clap(author, version, about = "Cryogenic conductive heat-load budget", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a calculation pass and print per-stage loads
    Calc {
        /// Conductivity integral table (csv: material,temperature_k,integral_w_per_m)
        #[clap(long, value_parser)]
        materials: PathBuf,
        /// Bundle to compute (json); the default ladder with no components if omitted
        #[clap(long, value_parser)]
        bundle: Option<PathBuf>,
        /// Write the computed bundle here
        #[clap(long, value_parser)]
        out: Option<PathBuf>,
        /// Engine settings (toml)
        #[clap(long, value_parser)]
        config: Option<PathBuf>,
        /// Print the report as JSON instead of a table
        #[clap(long, action)]
        json: bool,
    },
    /// List materials and the temperature span of their tables
    Materials {
        #[clap(long, value_parser)]
        materials: PathBuf,
    },
    /// Print the default stage ladder
    Stages,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Calc {
            materials,
            bundle,
            out,
            config,
            json,
        } => run_calc(materials, bundle, out, config, json),
        Command::Materials { materials } => run_materials(materials),
        Command::Stages => {
            print_ladder(&StageLadder::default());
            Ok(())
        }
    }
}

fn run_calc(
    materials: PathBuf,
    bundle: Option<PathBuf>,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let settings = match &config {
        Some(path) => EngineSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };
    let library = load_library(&materials)
        .with_context(|| format!("loading conductivity table {}", materials.display()))?;

    let mut model = match &bundle {
        Some(path) => load_bundle(path)
            .and_then(|b| b.into_model(settings))
            .with_context(|| format!("loading bundle {}", path.display()))?,
        None => {
            let mut model = ThermalModel::default();
            model.settings = settings;
            model
        }
    };

    let report = model.recompute(&library).context("calculation pass aborted")?;
    if !report.is_clean() {
        warn!(failures = report.failures.len(), "some components were left out of the totals");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&model, &report);
    }

    if let Some(path) = out {
        let _lock = FileLock::acquire(&path, LOCK_HOLDER)
            .with_context(|| format!("locking {}", path.display()))?;
        save_model(&model, &path).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "bundle written");
    }
    Ok(())
}

fn run_materials(materials: PathBuf) -> Result<()> {
    let library = load_library(&materials)
        .with_context(|| format!("loading conductivity table {}", materials.display()))?;

    println!("{:<20} {:>10} {:>10} {:>8}", "Material", "T min (K)", "T max (K)", "Points");
    for table in library.tables() {
        let (min_k, max_k) = table.span();
        println!(
            "{:<20} {:>10.3} {:>10.3} {:>8}",
            table.material(),
            min_k,
            max_k,
            table.samples().len()
        );
    }
    Ok(())
}

fn print_ladder(ladder: &StageLadder) {
    println!("{:<12} {:>10} {:>10} {:>10}", "Stage", "Low (K)", "High (K)", "ΔT (K)");
    for stage in ladder.stages() {
        println!(
            "{:<12} {:>10.3} {:>10.3} {:>10.3}",
            stage.name,
            stage.low_k,
            stage.high_k,
            stage.delta_k()
        );
    }
}

fn print_report(model: &ThermalModel, report: &RecomputeReport) {
    println!("═══════════════════════════════════════════════");
    println!("  STAGE HEAT LOADS");
    println!("═══════════════════════════════════════════════");

    for load in &report.load.stages {
        let Some(stage) = model.stages().get(&load.stage) else {
            continue;
        };
        println!();
        println!(
            "{} ({:.3} K → {:.3} K, ΔT {:.3} K): {:.4e} W {}",
            load.stage,
            stage.high_k,
            stage.low_k,
            stage.delta_k(),
            load.total_w,
            status_icon(load.failed.is_empty())
        );
        for component in model.components().stage_components(&load.stage) {
            let power = component.power();
            println!(
                "  {:<24} {:<10} x{:<5} {:>12.4e} W/part {:>12.4e} W",
                component.name(),
                component.kind().record_type(),
                component.count(),
                power.per_part_w,
                power.total_w
            );
        }
    }

    if !report.failures.is_empty() {
        println!();
        println!("Excluded from totals:");
        for failure in &report.failures {
            println!("  {}", failure);
        }
    }

    println!();
    println!("═══════════════════════════════════════════════");
    println!("  TOTAL: {:.4e} W", report.load.grand_total_w);
    println!("═══════════════════════════════════════════════");
}

fn status_icon(clean: bool) -> &'static str {
    if clean { "[OK]" } else { "[PARTIAL]" }
}
