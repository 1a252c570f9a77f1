//! Samples a 32-bit tick source, extends it to a 63-bit counter and prints the
//! wide values, aborting on any inconsistency.

mod driver;
mod source;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use strata_config::DriverConfig;
use strata_wrap::{WrapConfig, WrapWriter};
use tracing::info;

use crate::driver::{Driver, ReaderPool};

#[derive(Parser, Debug)]
#[command(
    name = "strata-clock",
    about = "Extends a wrapping 32-bit tick counter into a monotonic 63-bit clock",
    version
)]
struct Args {
    /// Path to a driver configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Loop iterations (overrides config; 0 = forever).
    #[arg(long, short = 'n')]
    iterations: Option<u64>,

    /// Log level (overrides config).
    #[arg(long, short = 'l')]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DriverConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => DriverConfig::default(),
    };
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level);
    info!(?config, "configuration loaded");

    let mut source = source::from_kind(config.source);
    if let Some(revolution) = source::check_cadence(source.as_mut(), config.interval()) {
        info!(source = source.name(), ?revolution, "tick source ready");
    }

    let writer = WrapWriter::<u32>::with_config(WrapConfig::new(config.liveness_check))?;
    let mut driver = Driver::new(writer, source, config.interval(), config.iterations);

    let pool = match config.readers {
        0 => None,
        n => Some(ReaderPool::spawn(&driver.reader(), n)?),
    };

    let completed = driver.run(&mut std::io::stdout().lock())?;

    if let Some(pool) = pool {
        let report = pool.join()?;
        info!(reads = report.reads, "readers stopped");
        anyhow::ensure!(
            report.regressions == 0,
            "readers observed {} decreasing values",
            report.regressions
        );
    }

    info!(iterations = completed, "done");
    Ok(())
}

fn init_logging(level: &str) {
    let filter = format!("strata_clock={level},strata_wrap={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();
}
