//! paperbench command-line driver.
//!
//! Connects to PostgreSQL, MongoDB and Redis, runs the requested action and
//! prints a summary of what was loaded and measured.

mod summary;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paperbench::{Action, BenchConfig, Driver};

/// Compare PostgreSQL, MongoDB and Redis on a paper metadata corpus
#[derive(Parser, Debug)]
#[command(name = "paperbench")]
#[command(version, about = "Compare PostgreSQL, MongoDB and Redis on a paper metadata corpus")]
pub struct Args {
    /// Action to perform
    #[arg(long, value_enum)]
    pub action: Action,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paperbench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = BenchConfig::from_env()?;

    tracing::info!(
        action = %args.action,
        data_file = %config.data_file.display(),
        record_limit = ?config.record_limit,
        "Starting paperbench"
    );

    let results_path = config.results_path.clone();
    let report = Driver::connect(config)?.run(args.action)?;

    if !report.loads.is_empty() {
        println!("{}", summary::loads_table(&report.loads));
    }
    if !report.results.is_empty() {
        println!("{}", summary::results_table(&report.results));
        println!(
            "{} result(s) appended to {}",
            report.results.len(),
            results_path.display()
        );
    }

    Ok(())
}
