// SPDX-License-Identifier: AGPL-3.0-only

//! `bart`: command-line interface for the BART device-scaling benchmark.
//!
//! ```text
//! USAGE:
//!   bart enumerate                   List compute devices
//!   bart bench [options]             Run the size × device sweep
//! ```

use std::path::PathBuf;

use anyhow::Result;
use bart_bench::{
    format_seconds, Anchor, BenchmarkConfig, ConsoleProgress, Report, ReportOptions, Sweep,
};
use bart_runtime::DeviceManager;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bart", about = "BART sampler device-scaling benchmark", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List compute devices grouped by category.
    Enumerate,
    /// Time multi-chain MCMC across dataset sizes and devices.
    Bench(BenchArgs),
}

#[derive(clap::Args)]
struct BenchArgs {
    /// Dataset sizes, comma separated (default: 100 … 100000000).
    #[arg(long, value_delimiter = ',')]
    sizes: Option<Vec<usize>>,

    /// Drop every size above this value.
    #[arg(long)]
    max_n: Option<usize>,

    /// Trees in the ensemble.
    #[arg(long)]
    ntree: Option<usize>,

    /// Chains run in parallel per device.
    #[arg(long)]
    nchains: Option<usize>,

    /// MCMC iterations per timed call.
    #[arg(long)]
    iterations: Option<usize>,

    /// Number of covariates.
    #[arg(short)]
    p: Option<usize>,

    /// Noise standard deviation.
    #[arg(long)]
    sigma: Option<f32>,

    /// Root seed of the key stream.
    #[arg(long)]
    seed: Option<u64>,

    /// Device category to time (repeatable, e.g. `--device cpu --device serial`).
    #[arg(long = "device")]
    devices: Vec<String>,

    /// Text box position, e.g. "lower right" or "upper-left".
    #[arg(long, default_value = "lower right")]
    anchor: Anchor,

    /// Where to write the SVG report.
    #[arg(long, default_value = "benchmark-device.svg")]
    output: PathBuf,
}

impl BenchArgs {
    fn config(&self) -> BenchmarkConfig {
        let mut config = BenchmarkConfig::default();
        if let Some(sizes) = &self.sizes {
            config = config.with_sizes(sizes.iter().copied());
        }
        if let Some(max_n) = self.max_n {
            config = config.with_max_n(max_n);
        }
        if let Some(ntree) = self.ntree {
            config = config.with_ntree(ntree);
        }
        if let Some(nchains) = self.nchains {
            config = config.with_nchains(nchains);
        }
        if let Some(iterations) = self.iterations {
            config = config.with_iterations(iterations);
        }
        if let Some(p) = self.p {
            config = config.with_p(p);
        }
        if let Some(sigma) = self.sigma {
            config = config.with_sigma(sigma);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if !self.devices.is_empty() {
            config = config.with_devices(self.devices.iter().cloned());
        }
        config
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Enumerate => cmd_enumerate()?,
        Cmd::Bench(args) => cmd_bench(&args)?,
    }

    Ok(())
}

fn cmd_enumerate() -> Result<()> {
    let mgr = DeviceManager::discover()?;

    println!("Compute devices: {}", mgr.device_count());
    println!();

    for category in mgr.categories() {
        for device in mgr.devices(category)? {
            println!("[{}] {}", device.label(), device.backend_type());
            println!("     Lanes {}", device.parallelism());
        }
    }

    Ok(())
}

fn cmd_bench(args: &BenchArgs) -> Result<()> {
    let config = args.config();
    let mgr = DeviceManager::discover()?;

    println!("BART device scaling benchmark");
    println!("=============================");
    println!(
        "p = {}, ntree = {}, nchains = {}, mcmc_iterations = {}",
        config.p, config.ntree, config.nchains, config.mcmc_iterations
    );
    println!("Devices: {}", config.devices.join(", "));
    println!();

    let mut sweep = Sweep::new(config.clone(), &mgr)?;
    let outcome = sweep.run(&mut ConsoleProgress);
    let table = sweep.into_results();

    if let Err(e) = outcome {
        // Keep whatever was measured before the failure.
        println!();
        eprintln!("Sweep stopped: {e}");
        if !table.is_empty() {
            println!("{}", table.to_markdown());
        }
        return Err(e.into());
    }

    let options = ReportOptions {
        anchor: args.anchor,
        ..ReportOptions::default()
    };
    let figure = Report::render(&table, &config, &options);
    figure.save(&args.output)?;

    println!();
    println!("{}", table.to_markdown());
    if let Some(slowest) = table
        .entries()
        .iter()
        .max_by(|a, b| a.seconds.total_cmp(&b.seconds))
    {
        println!(
            "Slowest: n = {} on {} ({}s)",
            slowest.n,
            slowest.device,
            format_seconds(slowest.seconds)
        );
    }
    println!("Plot written to {}", args.output.display());
    Ok(())
}
