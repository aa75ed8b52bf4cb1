//! IAP runner.
//!
//! Usage:
//!   iap run --scenario scenario.json --output results.json
//!   iap demo --seed 7 --grants 40 --peers 2

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use iap_cli::demo::{self, DemoParams};
use iap_cli::scenario::{write_reports, EntityReport};
use iap_cli::{Config, Scenario};
use iap_core::{FreeSpaceModel, IapEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Iterative Allocation Process runner")]
struct Args {
    /// Upper bound on grid worker threads (overrides IAP_WORKERS)
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run IAP over a JSON scenario file
    Run {
        #[arg(long)]
        scenario: PathBuf,

        /// Write per-entity results here as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate a seeded scenario around a demo site and run it
    Demo {
        #[arg(long, default_value_t = 7)]
        seed: u64,

        #[arg(long, default_value_t = 40)]
        grants: usize,

        /// Number of peer authorities sharing the budget
        #[arg(long, default_value_t = 2)]
        peers: usize,
    },
}

fn init_tracing(json: bool) -> Result<()> {
    let filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive("iap_core=info".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

fn print_summary(reports: &[EntityReport]) {
    println!("{:<12} {:<14} {:>7} {:>22}", "ENTITY", "KIND", "POINTS", "MIN ALLOWED (dBm)");
    for report in reports {
        match &report.result {
            Some(result) => {
                let min_mw = result
                    .iter()
                    .flat_map(|(_, _, allowed)| allowed.iter().copied())
                    .fold(f64::INFINITY, f64::min);
                let min_dbm = if min_mw.is_finite() && min_mw > 0.0 {
                    format!("{:.2}", iap_core::units::linear_to_db(min_mw))
                } else {
                    "-".to_string()
                };
                println!(
                    "{:<12} {:<14} {:>7} {:>22}",
                    report.id,
                    report.kind.to_string(),
                    result.point_count(),
                    min_dbm
                );
            }
            None => println!(
                "{:<12} {:<14} {:>7} {:>22}",
                report.id,
                report.kind.to_string(),
                "-",
                "not protected"
            ),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env().with_workers(args.workers);
    init_tracing(config.log_json)?;

    let engine =
        IapEngine::new(Arc::new(FreeSpaceModel::default())).with_max_workers(config.workers);

    match args.command {
        Command::Run { scenario, output } => {
            let scenario = Scenario::load(&scenario)?;
            let engine = scenario.configure(engine)?;
            let reports = scenario.run(&engine)?;
            print_summary(&reports);
            if let Some(path) = output {
                write_reports(&path, &reports)?;
                println!("Results written to {}", path.display());
            }
        }
        Command::Demo {
            seed,
            grants,
            peers,
        } => {
            tracing::info!(seed, grants, peers, "generating demo scenario");
            let scenario = demo::generate(DemoParams {
                seed,
                grants,
                peers,
            });
            let reports = scenario.run(&engine)?;
            print_summary(&reports);
        }
    }

    Ok(())
}
