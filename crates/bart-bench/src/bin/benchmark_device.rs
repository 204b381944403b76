// SPDX-License-Identifier: AGPL-3.0-only

//! Device scaling benchmark: BART MCMC time against dataset size.
//!
//! Sweeps n = 100 … 100,000,000 (1-2-5 steps), times one vectorized
//! multi-chain MCMC call per device, prints progress and a markdown table,
//! and writes `benchmark-device.svg` to the working directory.
//!
//! Memory grows with n; on small hosts cap the sweep with `--max-n`.
//!
//! Usage:
//!   cargo run --release --bin benchmark_device
//!   cargo run --release --bin benchmark_device -- --max-n 100000

use anyhow::Result;
use bart_bench::{run_benchmark, BenchmarkConfig, ConsoleProgress, Report, ReportOptions};
use bart_runtime::DeviceManager;
use tracing_subscriber::EnvFilter;

const OUTPUT: &str = "benchmark-device.svg";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = BenchmarkConfig::default();
    if let Some(max_n) = parse_arg(&args, "--max-n") {
        config = config.with_max_n(max_n);
    }

    println!("BART device scaling benchmark");
    println!("=============================");
    println!(
        "Sizes          : {} (n ≤ {})",
        config.sizes.len(),
        config.sizes.last().copied().unwrap_or(0)
    );
    println!("Devices        : {}", config.devices.join(", "));
    println!("Trees          : {}", config.ntree);
    println!("Chains         : {}", config.nchains);
    println!("MCMC iterations: {}", config.mcmc_iterations);
    println!();

    let manager = DeviceManager::discover()?;
    let table = run_benchmark(config.clone(), &manager, &mut ConsoleProgress)?;

    let figure = Report::render(&table, &config, &ReportOptions::default());
    figure.save(OUTPUT)?;

    println!();
    println!("{}", table.to_markdown());
    println!("Plot written to {OUTPUT}");
    Ok(())
}

fn parse_arg(args: &[String], flag: &str) -> Option<usize> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
}
