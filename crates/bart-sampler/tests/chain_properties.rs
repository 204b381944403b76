// SPDX-License-Identifier: AGPL-3.0-only

//! Properties of chains driven through the public API

use anyhow::Result;
use bart_runtime::Key;
use bart_sampler::{no_callback, run_mcmc, Bart, BartConfig, SamplerState};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn cosine_data(p: usize, n: usize, seed: u64) -> (Array2<f32>, Array1<f32>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = Array2::from_shape_fn((p, n), |_| rng.gen_range(-2.0_f32..2.0));
    let y = Array1::from_shape_fn(n, |j| {
        x.column(j).iter().map(|v| (std::f32::consts::PI * v).cos()).sum::<f32>()
    });
    (x, y)
}

fn initial_state(p: usize, n: usize, ntree: usize) -> Result<SamplerState> {
    let (x, y) = cosine_data(p, n, 0);
    let config = BartConfig::with_trees(ntree).with_iterations(0, 0);
    Ok(Bart::fit(x.view(), y.view(), &config)?.into_mcmc_state())
}

#[test]
fn chains_from_split_keys_diverge() -> Result<()> {
    let state = initial_state(2, 200, 10)?;
    let [a, b] = Key::from_seed(1).split_array();
    let left = run_mcmc(&state, 0, 5, 1, &no_callback, a);
    let right = run_mcmc(&state, 0, 5, 1, &no_callback, b);
    assert_ne!(left.forest(), right.forest());
    Ok(())
}

#[test]
fn sampler_reduces_residual_error() -> Result<()> {
    let state = initial_state(2, 300, 20)?;
    let before: f32 = state.resid().iter().map(|r| r * r).sum();
    let after = run_mcmc(&state, 0, 50, 1, &no_callback, Key::from_seed(3));
    let after: f32 = after.resid().iter().map(|r| r * r).sum();
    assert!(after < before, "{after} >= {before}");
    Ok(())
}

#[test]
fn trees_respect_the_depth_limit() -> Result<()> {
    let state = initial_state(3, 150, 10)?;
    let out = run_mcmc(&state, 0, 30, 1, &no_callback, Key::from_seed(9));
    let forest = out.forest();
    for t in 0..forest.ntree() {
        for leaf in forest.leaves(t) {
            assert!(bart_sampler::forest::depth_of(leaf) < forest.max_depth());
        }
    }
    Ok(())
}

#[test]
fn fit_is_reproducible() -> Result<()> {
    let (x, y) = cosine_data(2, 100, 4);
    let config = BartConfig::with_trees(8).with_iterations(5, 5).with_seed(11);
    let a = Bart::fit(x.view(), y.view(), &config)?;
    let b = Bart::fit(x.view(), y.view(), &config)?;
    assert_eq!(a.sigma_trace(), b.sigma_trace());
    assert_eq!(a.predict(), b.predict());
    Ok(())
}
