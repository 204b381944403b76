// SPDX-License-Identifier: AGPL-3.0-only

//! Example: fit a small regression and keep sampling
//!
//! Usage: cargo run --example fit_regression -- [n] [ntree]

use std::time::Instant;

use bart_runtime::KeyStream;
use bart_sampler::{no_callback, run_mcmc, Bart, BartConfig};
use ndarray::{Array1, Array2};
use rand::Rng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let n: usize = std::env::args().nth(1).map_or(Ok(500), |s| s.parse())?;
    let ntree: usize = std::env::args().nth(2).map_or(Ok(50), |s| s.parse())?;

    println!("🌲 BART regression, n = {n}, ntree = {ntree}\n");

    let mut keys = KeyStream::new(42);
    let [x_key, noise_key, chain_key] = keys.advance();
    let mut rng = x_key.into_rng();
    let x = Array2::from_shape_fn((3, n), |_| rng.gen_range(-2.0_f32..2.0));
    let mut rng = noise_key.into_rng();
    let y = Array1::from_shape_fn(n, |j| x[[0, j]].sin() + 0.5 * x[[1, j]] + rng.gen_range(-0.1_f32..0.1));

    println!("1️⃣  Fitting (100 burn-in, 100 draws)...");
    let start = Instant::now();
    let config = BartConfig::with_trees(ntree).with_iterations(100, 100);
    let model = Bart::fit(x.view(), y.view(), &config)?;
    println!("   ✅ {:?}, sigma = {:.4}\n", start.elapsed(), model.sigma());

    let rmse = (&model.predict() - &y).mapv(|e| e * e).mean().unwrap_or(0.0).sqrt();
    println!("   In-sample RMSE: {rmse:.4}");

    println!("2️⃣  Continuing the chain for 50 iterations...");
    let state = model.into_mcmc_state();
    let start = Instant::now();
    let next = run_mcmc(&state, 0, 50, 1, &no_callback, chain_key);
    println!(
        "   ✅ {:?}, acceptance = {:.2}, mean leaves = {:.2}",
        start.elapsed(),
        next.acceptance().rate(),
        next.forest().mean_leaves()
    );

    Ok(())
}
