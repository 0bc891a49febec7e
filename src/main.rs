//! capring - harness capture producer/consumer
//!
//! Satu thread producer mengisi queue dari source sintetis (ukuran acak,
//! running byte counter), satu thread consumer men-drain dan memvalidasi
//! setiap byte. Throughput dilaporkan lewat tracing.
//!
//! Usage:
//!   cargo run --release -- --records 10000000
//!   cargo run --release -- --config capring.toml --log-level debug

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use capring::capture;
use capring::HarnessConfig;

/// Lock-free capture queue harness
#[derive(Parser, Debug)]
#[command(name = "capring", version, about, long_about = None)]
struct Cli {
    /// TOML config file; flags below override its values
    #[arg(short, long, env = "CAPRING_CONFIG")]
    config: Option<PathBuf>,

    /// Number of records to produce
    #[arg(short = 'n', long)]
    records: Option<u64>,

    /// Slot count (power of two)
    #[arg(long)]
    slots: Option<usize>,

    /// Arena size in MiB
    #[arg(long)]
    arena_mib: Option<usize>,

    /// Maximum record payload in bytes
    #[arg(long)]
    max_record: Option<usize>,

    /// Seed for the synthetic record source
    #[arg(long)]
    seed: Option<u64>,

    /// Disable the occasional source stall
    #[arg(long)]
    no_stall: bool,

    /// Lock the arena in memory (mlock)
    #[arg(long)]
    lock_memory: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn harness_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(records) = self.records {
            config.records = records;
        }
        if let Some(slots) = self.slots {
            config.queue.slot_count = slots;
        }
        if let Some(mib) = self.arena_mib {
            config.queue.arena_bytes = mib * 1024 * 1024;
        }
        if let Some(max_record) = self.max_record {
            config.queue.max_record_bytes = max_record;
        }
        if let Some(seed) = self.seed {
            config.source.seed = Some(seed);
        }
        if self.no_stall {
            config.source.stall_one_in = 0;
        }
        if self.lock_memory {
            config.queue.lock_memory = true;
        }

        Ok(config)
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_thread_names(true).with_target(false))
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = cli.harness_config()?;
    info!(?config, "starting lock-free capture test");

    let report = capture::run(&config).context("capture run failed")?;
    report.log();

    Ok(report.is_clean())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("capture run finished with validation errors");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
