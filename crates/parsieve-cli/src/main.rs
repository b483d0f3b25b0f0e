#![doc = include_str!("../README.md")]

mod cli;

use clap::Parser;
use cli::config::{CliArgs, SieveConfig};
use cli::output::{Report, write_header, write_json, write_results};
use cli::telemetry::init_telemetry;
use parsieve::ParallelSieve;
use std::io::Write;

// Using mimalloc for the per-chunk segment and sieving-prime allocations made
// by every worker thread.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    init_telemetry()?;
    let config = SieveConfig::try_from(args)?;

    let sieve = ParallelSieve::new(config.sieve.clone());
    let threads = sieve.num_threads(config.range);
    log_startup_info(&config, threads);

    let mut stdout = std::io::stdout().lock();
    if !config.quiet && !config.json && !config.prints() {
        write_header(&mut stdout, &config, threads)?;
        stdout.flush()?;
    }
    // The engine locks stdout itself while printing.
    drop(stdout);

    let outcome = sieve.run(config.range)?;

    let mut stdout = std::io::stdout().lock();
    if config.json {
        write_json(&mut stdout, &Report::new(&config, threads, &outcome))?;
    } else if !config.prints() || !config.counted.is_empty() {
        write_results(&mut stdout, &config, &outcome)?;
    }
    stdout.flush()?;
    Ok(())
}

fn log_startup_info(config: &SieveConfig, threads: usize) {
    if cfg!(debug_assertions) {
        tracing::info!("Sieving {:?} with full config: {:#?}", config.range, config);
    } else {
        tracing::info!(
            start = config.range.start(),
            stop = config.range.stop(),
            threads,
            "Sieving"
        );
    }
}
