// SPDX-License-Identifier: AGPL-3.0-only

//! Grow/prune Metropolis-within-Gibbs sampler
//!
//! One iteration visits every tree in turn:
//!
//! 1. add the tree's contribution back into the residuals
//! 2. propose growing a leaf or pruning a pair of sibling leaves, accept with
//!    the Metropolis-Hastings ratio of the marginal likelihood (leaf values
//!    integrated out), the tree prior and the proposal probabilities
//! 3. draw fresh leaf values from their conjugate normal posterior
//! 4. subtract the tree again
//!
//! and then draws the noise variance from its inverse-gamma posterior.

use std::sync::Arc;

use bart_runtime::Key;
use ndarray::{Array1, ArrayView2};
use rand::Rng;
use rand_distr::{Distribution, Gamma, StandardNormal};
use tracing::trace;

use crate::forest::depth_of;
use crate::state::SamplerState;

/// Stage of the chain an iteration belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Discarded warm-up iteration
    BurnIn,
    /// Iteration after burn-in
    Main,
}

/// Progress snapshot handed to the per-iteration callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationInfo {
    /// Iteration index within this call, starting at 0
    pub iteration: usize,
    /// Burn-in or main phase
    pub phase: Phase,
    /// True if this iteration yields a kept draw
    pub kept: bool,
    /// Noise variance after the iteration
    pub sigma2: f32,
    /// Mean leaves per tree after the iteration
    pub mean_leaves: f32,
}

/// Callback that ignores every iteration
pub fn no_callback(_: &IterationInfo) {}

/// Run `burn_in + draws * thinning` iterations starting from `state`.
///
/// The input state is left untouched; the chain evolves on a copy that
/// shares the covariates and response with the input. All randomness comes
/// from `key`, so equal inputs give equal outputs.
pub fn run_mcmc<F>(
    state: &SamplerState,
    burn_in: usize,
    draws: usize,
    thinning: usize,
    callback: &F,
    key: Key,
) -> SamplerState
where
    F: Fn(&IterationInfo) + ?Sized,
{
    let mut rng = key.into_rng();
    let mut chain = state.clone();
    let thinning = thinning.max(1);
    let total = burn_in + draws * thinning;

    for iteration in 0..total {
        step(&mut chain, &mut rng);

        let (phase, kept) = if iteration < burn_in {
            (Phase::BurnIn, false)
        } else {
            (Phase::Main, (iteration - burn_in + 1) % thinning == 0)
        };
        callback(&IterationInfo {
            iteration,
            phase,
            kept,
            sigma2: chain.sigma2,
            mean_leaves: chain.forest.mean_leaves(),
        });
    }

    trace!(
        "Ran {total} iterations, sigma2 = {:.4}, acceptance = {:.2}",
        chain.sigma2,
        chain.acceptance.rate()
    );
    chain
}

/// One full sweep over the trees followed by the noise update
pub(crate) fn step<R: Rng>(state: &mut SamplerState, rng: &mut R) {
    let x = Arc::clone(&state.x);
    let x = x.view();
    let max_split = Arc::clone(&state.max_split);
    let prior = Arc::clone(&state.prior);
    let n = state.resid.len();
    let heap = state.forest.heap_size();

    let mut leaf_of = vec![0usize; n];
    let mut count = vec![0usize; heap];
    let mut sum = vec![0f64; heap];

    for t in 0..state.forest.ntree() {
        for (j, slot) in leaf_of.iter_mut().enumerate() {
            *slot = state.forest.leaf_of(t, &x, j);
            state.resid[j] += state.forest.leaf_value(t, *slot);
        }
        node_stats(&leaf_of, &state.resid, &mut count, &mut sum);

        let moved = propose(state, t, &x, &max_split, &leaf_of, &count, &sum, rng);
        if moved {
            for (j, slot) in leaf_of.iter_mut().enumerate() {
                *slot = state.forest.leaf_of(t, &x, j);
            }
            node_stats(&leaf_of, &state.resid, &mut count, &mut sum);
        }

        let sigma2 = f64::from(state.sigma2);
        let tau2 = f64::from(prior.tau2);
        for leaf in state.forest.leaves(t) {
            #[allow(clippy::cast_precision_loss)]
            let m = count[leaf] as f64;
            let post_var = 1.0 / (1.0 / tau2 + m / sigma2);
            let mean = post_var * sum[leaf] / sigma2;
            let z: f64 = rng.sample(StandardNormal);
            #[allow(clippy::cast_possible_truncation)]
            let value = (mean + post_var.sqrt() * z) as f32;
            state.forest.set_leaf_value(t, leaf, value);
        }

        for (j, &leaf) in leaf_of.iter().enumerate() {
            state.resid[j] -= state.forest.leaf_value(t, leaf);
        }
    }

    state.sigma2 = draw_sigma2(state, rng);
    state.iteration += 1;
}

fn node_stats(leaf_of: &[usize], resid: &Array1<f32>, count: &mut [usize], sum: &mut [f64]) {
    count.fill(0);
    sum.fill(0.0);
    for (&leaf, &r) in leaf_of.iter().zip(resid) {
        count[leaf] += 1;
        sum[leaf] += f64::from(r);
    }
}

/// Log marginal likelihood of `m` residuals summing to `s` in one leaf,
/// up to terms that cancel between grow and prune.
#[allow(clippy::cast_precision_loss)]
fn leaf_loglik(m: usize, s: f64, sigma2: f64, tau2: f64) -> f64 {
    let m = m as f64;
    -0.5 * (1.0 + m * tau2 / sigma2).ln() + tau2 * s * s / (2.0 * sigma2 * (sigma2 + m * tau2))
}

/// Log prior ratio of splitting a leaf at `depth` into two leaves
fn split_log_prior(p_split: impl Fn(usize) -> f64, depth: usize) -> f64 {
    let p = p_split(depth);
    let child = p_split(depth + 1);
    p.ln() + 2.0 * (1.0 - child).ln() - (1.0 - p).ln()
}

/// Propose and maybe accept one grow or prune move on tree `t`.
#[allow(clippy::too_many_arguments, clippy::cast_precision_loss)]
fn propose<R: Rng>(
    state: &mut SamplerState,
    t: usize,
    x: &ArrayView2<'_, u16>,
    max_split: &[u16],
    leaf_of: &[usize],
    count: &[usize],
    sum: &[f64],
    rng: &mut R,
) -> bool {
    let growable = state.forest.growable(t, max_split);
    let prunable = state.forest.prunable(t);
    if growable.is_empty() && prunable.is_empty() {
        return false;
    }

    let p_grow = move_probability(!growable.is_empty(), !prunable.is_empty());
    let grow = rng.gen::<f64>() < p_grow;

    let sigma2 = f64::from(state.sigma2);
    let tau2 = f64::from(state.prior.tau2);
    let prior = Arc::clone(&state.prior);
    let p_split = |d: usize| f64::from(prior.p_split(d));

    if grow {
        let node = growable[rng.gen_range(0..growable.len())];
        let vars = state.forest.splittable_vars(t, node, max_split);
        let var = vars[rng.gen_range(0..vars.len())];
        let range = state.forest.split_range(t, node, var, max_split[var]);
        let split = rng.gen_range(range.lo..=range.hi);

        let (mut m_left, mut s_left) = (0usize, 0f64);
        for (j, (&leaf, &r)) in leaf_of.iter().zip(&state.resid).enumerate() {
            if leaf == node && x[[var, j]] < split {
                m_left += 1;
                s_left += f64::from(r);
            }
        }
        let (m_right, s_right) = (count[node] - m_left, sum[node] - s_left);

        let loglik = leaf_loglik(m_left, s_left, sigma2, tau2) + leaf_loglik(m_right, s_right, sigma2, tau2)
            - leaf_loglik(count[node], sum[node], sigma2, tau2);

        state.forest.grow(t, node, var, split);
        let prunable_after = state.forest.prunable(t).len();
        let p_prune_after = 1.0 - move_probability(!state.forest.growable(t, max_split).is_empty(), true);
        let log_proposal = (p_prune_after / prunable_after as f64).ln() - (p_grow / growable.len() as f64).ln();

        let log_ratio = loglik + split_log_prior(p_split, depth_of(node)) + log_proposal;
        state.acceptance.grow_proposed += 1;
        if rng.gen::<f64>().ln() < log_ratio {
            state.acceptance.grow_accepted += 1;
            true
        } else {
            state.forest.prune(t, node);
            false
        }
    } else {
        let node = prunable[rng.gen_range(0..prunable.len())];
        let (left, right) = (2 * node, 2 * node + 1);
        let loglik = leaf_loglik(count[left], sum[left], sigma2, tau2)
            + leaf_loglik(count[right], sum[right], sigma2, tau2)
            - leaf_loglik(count[left] + count[right], sum[left] + sum[right], sigma2, tau2);

        let var = usize::from(state.forest.var()[[t, node]]);
        let split = state.forest.split()[[t, node]];
        state.forest.prune(t, node);
        let growable_after = state.forest.growable(t, max_split).len();
        let p_grow_after = move_probability(true, !state.forest.prunable(t).is_empty());
        let log_proposal =
            (p_grow_after / growable_after as f64).ln() - ((1.0 - p_grow) / prunable.len() as f64).ln();

        let log_ratio = log_proposal - loglik - split_log_prior(p_split, depth_of(node));
        state.acceptance.prune_proposed += 1;
        if rng.gen::<f64>().ln() < log_ratio {
            state.acceptance.prune_accepted += 1;
            true
        } else {
            state.forest.grow(t, node, var, split);
            false
        }
    }
}

/// Probability of proposing a grow move given which moves are available
fn move_probability(can_grow: bool, can_prune: bool) -> f64 {
    match (can_grow, can_prune) {
        (true, true) => 0.5,
        (true, false) => 1.0,
        (false, _) => 0.0,
    }
}

fn draw_sigma2<R: Rng>(state: &SamplerState, rng: &mut R) -> f32 {
    let ssr: f64 = state.resid.iter().map(|&r| f64::from(r).powi(2)).sum();
    #[allow(clippy::cast_precision_loss)]
    let shape = f64::from(state.prior.sigma_a) + state.resid.len() as f64 / 2.0;
    let rate = f64::from(state.prior.sigma_b) + ssr / 2.0;
    match Gamma::new(shape, 1.0 / rate) {
        Ok(gamma) => {
            let precision: f64 = gamma.sample(rng);
            #[allow(clippy::cast_possible_truncation)]
            let sigma2 = (1.0 / precision) as f32;
            if sigma2.is_finite() && sigma2 > 0.0 {
                sigma2
            } else {
                state.sigma2
            }
        }
        Err(_) => state.sigma2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bart;
    use crate::BartConfig;
    use ndarray::Array2;
    use std::cell::Cell;

    fn fitted(n: usize) -> SamplerState {
        let x = Array2::from_shape_fn((2, n), |(i, j)| ((i + 1) * j % 17) as f32);
        let y = Array1::from_shape_fn(n, |j| (j as f32 * 0.3).sin());
        let cfg = BartConfig::with_trees(10).with_iterations(0, 0);
        Bart::fit(x.view(), y.view(), &cfg).unwrap().into_mcmc_state()
    }

    #[test]
    fn same_key_same_chain() {
        let s = fitted(50);
        let a = run_mcmc(&s, 0, 3, 1, &no_callback, Key::from_seed(5));
        let b = run_mcmc(&s, 0, 3, 1, &no_callback, Key::from_seed(5));
        assert_eq!(a.forest(), b.forest());
        assert_eq!(a.sigma2(), b.sigma2());
    }

    #[test]
    fn input_state_is_untouched() {
        let s = fitted(30);
        let before = s.forest().clone();
        let out = run_mcmc(&s, 1, 2, 1, &no_callback, Key::from_seed(1));
        assert_eq!(s.forest(), &before);
        assert_eq!(s.iteration(), 0);
        assert_eq!(out.iteration(), 3);
    }

    #[test]
    fn residuals_track_the_forest() {
        let s = fitted(40);
        let out = run_mcmc(&s, 0, 5, 1, &no_callback, Key::from_seed(7));
        let x = out.x();
        for j in 0..out.n() {
            let fit: f32 = (0..out.forest().ntree())
                .map(|t| out.forest().leaf_value(t, out.forest().leaf_of(t, &x, j)))
                .sum();
            assert!((out.y()[j] - out.resid()[j] - fit).abs() < 1e-4);
        }
    }

    #[test]
    fn callback_sees_every_iteration() {
        let s = fitted(20);
        let seen = Cell::new(0);
        let kept = Cell::new(0);
        let cb = |info: &IterationInfo| {
            seen.set(seen.get() + 1);
            if info.kept {
                assert_eq!(info.phase, Phase::Main);
                kept.set(kept.get() + 1);
            }
        };
        run_mcmc(&s, 2, 3, 2, &cb, Key::from_seed(0));
        assert_eq!(seen.get(), 2 + 3 * 2);
        assert_eq!(kept.get(), 3);
    }

    #[test]
    fn zero_iterations_returns_a_copy() {
        let s = fitted(10);
        let out = run_mcmc(&s, 0, 0, 1, &no_callback, Key::from_seed(0));
        assert_eq!(out.forest(), s.forest());
        assert_eq!(out.sigma2(), s.sigma2());
    }

    #[test]
    fn single_observation_runs() {
        let s = fitted(1);
        let out = run_mcmc(&s, 0, 2, 1, &no_callback, Key::from_seed(3));
        assert!(out.sigma2().is_finite() && out.sigma2() > 0.0);
    }

    #[test]
    fn leaf_loglik_of_empty_leaf_is_zero() {
        assert_eq!(leaf_loglik(0, 0.0, 1.0, 0.1), 0.0);
    }
}
