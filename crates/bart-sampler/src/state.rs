// SPDX-License-Identifier: AGPL-3.0-only

//! MCMC state of one chain

use std::sync::Arc;

use bart_runtime::{DType, DeviceBuffer, Shaped, Signature, TensorSpec, Transfer};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::binning::Binned;
use crate::config::BartConfig;
use crate::forest::Forest;

/// Noise prior scale used when the scaled response has zero variance
const FALLBACK_LAMBDA: f32 = 1.0 / 12.0;

/// Fixed prior hyperparameters derived from data and configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Prior {
    /// Split probability per node depth; zero at the deepest level
    pub p_split: Vec<f32>,
    /// Leaf variance
    pub tau2: f32,
    /// Inverse-gamma shape of the noise variance
    pub sigma_a: f32,
    /// Inverse-gamma rate of the noise variance
    pub sigma_b: f32,
}

impl Prior {
    fn new(config: &BartConfig, lambda: f32) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let p_split = (0..config.max_depth)
            .map(|d| {
                if d + 1 == config.max_depth {
                    0.0
                } else {
                    config.alpha * (1.0 + d as f32).powf(-config.beta)
                }
            })
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let tau = 0.5 / (config.k * (config.ntree as f32).sqrt());
        Self {
            p_split,
            tau2: tau * tau,
            sigma_a: config.sigma_df / 2.0,
            sigma_b: config.sigma_df * lambda / 2.0,
        }
    }

    /// Probability that a node at `depth` is split
    pub fn p_split(&self, depth: usize) -> f32 {
        self.p_split.get(depth).copied().unwrap_or(0.0)
    }
}

/// Grow/prune proposal counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Acceptance {
    /// Grow moves proposed
    pub grow_proposed: u64,
    /// Grow moves accepted
    pub grow_accepted: u64,
    /// Prune moves proposed
    pub prune_proposed: u64,
    /// Prune moves accepted
    pub prune_accepted: u64,
}

impl Acceptance {
    /// Fraction of all proposals that were accepted
    pub fn rate(&self) -> f32 {
        let proposed = self.grow_proposed + self.prune_proposed;
        if proposed == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = (self.grow_accepted + self.prune_accepted) as f32 / proposed as f32;
        rate
    }
}

/// Everything one MCMC chain carries between iterations.
///
/// Covariates and response are behind `Arc`s: chains forked from the same
/// state share them, while [`Transfer`] produces fully independent buffers.
#[derive(Debug, Clone)]
pub struct SamplerState {
    pub(crate) x: Arc<Array2<u16>>,
    pub(crate) max_split: Arc<Vec<u16>>,
    pub(crate) y: Arc<Array1<f32>>,
    pub(crate) resid: Array1<f32>,
    pub(crate) forest: Forest,
    pub(crate) sigma2: f32,
    pub(crate) prior: Arc<Prior>,
    pub(crate) iteration: usize,
    pub(crate) acceptance: Acceptance,
}

impl SamplerState {
    /// Initial state: every tree a single zero leaf, residuals equal to `y`.
    ///
    /// `y` must already be on the sampler's internal scale.
    pub(crate) fn new(binned: Binned, y: Array1<f32>, config: &BartConfig) -> Self {
        let lambda = match variance(y.view()) {
            v if v > 0.0 => v,
            _ => FALLBACK_LAMBDA,
        };
        let prior = Prior::new(config, lambda);
        Self {
            x: Arc::new(binned.x),
            max_split: Arc::new(binned.max_split),
            resid: y.clone(),
            y: Arc::new(y),
            forest: Forest::new(config.ntree, config.max_depth),
            sigma2: lambda,
            prior: Arc::new(prior),
            iteration: 0,
            acceptance: Acceptance::default(),
        }
    }

    /// Number of observations
    pub fn n(&self) -> usize {
        self.y.len()
    }

    /// Number of covariates
    pub fn p(&self) -> usize {
        self.x.nrows()
    }

    /// Binned covariates, shape (p, n)
    pub fn x(&self) -> ArrayView2<'_, u16> {
        self.x.view()
    }

    /// Cutpoint count per covariate
    pub fn max_split(&self) -> &[u16] {
        &self.max_split
    }

    /// Scaled response
    pub fn y(&self) -> ArrayView1<'_, f32> {
        self.y.view()
    }

    /// Current residuals, `y` minus the sum of all trees
    pub fn resid(&self) -> ArrayView1<'_, f32> {
        self.resid.view()
    }

    /// Current tree ensemble
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Current noise variance on the scaled response
    pub fn sigma2(&self) -> f32 {
        self.sigma2
    }

    /// Prior hyperparameters
    pub fn prior(&self) -> &Prior {
        &self.prior
    }

    /// Iterations run so far
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Grow/prune counters accumulated so far
    pub fn acceptance(&self) -> Acceptance {
        self.acceptance
    }

    /// Sum of all trees evaluated at each observation
    pub fn predict(&self) -> Array1<f32> {
        &*self.y - &self.resid
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn variance(v: ArrayView1<'_, f32>) -> f32 {
    if v.len() < 2 {
        return 0.0;
    }
    let mean = v.iter().map(|&a| f64::from(a)).sum::<f64>() / v.len() as f64;
    let ss = v.iter().map(|&a| (f64::from(a) - mean).powi(2)).sum::<f64>();
    (ss / (v.len() - 1) as f64) as f32
}

impl DeviceBuffer for SamplerState {
    fn nbytes(&self) -> usize {
        self.x.len() * std::mem::size_of::<u16>()
            + self.max_split.len() * std::mem::size_of::<u16>()
            + (self.y.len() + self.resid.len()) * std::mem::size_of::<f32>()
            + self.forest.nbytes()
            + std::mem::size_of::<f32>()
    }
}

impl Transfer for SamplerState {
    fn transfer(&self) -> Self {
        Self {
            x: Arc::new((*self.x).clone()),
            max_split: Arc::new((*self.max_split).clone()),
            y: Arc::new((*self.y).clone()),
            resid: self.resid.clone(),
            forest: self.forest.clone(),
            sigma2: self.sigma2,
            prior: Arc::new((*self.prior).clone()),
            iteration: self.iteration,
            acceptance: self.acceptance,
        }
    }
}

impl Shaped for SamplerState {
    fn signature(&self) -> Signature {
        let (p, n) = self.x.dim();
        let ntree = self.forest.ntree();
        Signature::from(vec![
            TensorSpec::new("x", DType::U16, vec![p, n]),
            TensorSpec::new("max_split", DType::U16, vec![p]),
            TensorSpec::new("y", DType::F32, vec![n]),
            TensorSpec::new("resid", DType::F32, vec![n]),
            TensorSpec::new("var_tree", DType::U16, vec![ntree, self.forest.half()]),
            TensorSpec::new("split_tree", DType::U16, vec![ntree, self.forest.half()]),
            TensorSpec::new("leaf_tree", DType::F32, vec![ntree, self.forest.heap_size()]),
            TensorSpec::new("sigma2", DType::F32, vec![]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::quantize;
    use ndarray::array;

    fn small_state() -> SamplerState {
        let x = array![[0.0_f32, 1.0, 2.0, 3.0], [1.0, 1.0, 0.0, 0.0]];
        let y = array![-0.5_f32, -0.1, 0.2, 0.5];
        SamplerState::new(quantize(x.view(), 255), y, &BartConfig::with_trees(5))
    }

    #[test]
    fn fresh_state_predicts_zero() {
        let s = small_state();
        assert_eq!(s.resid(), s.y());
        assert!(s.predict().iter().all(|&v| v == 0.0));
        assert_eq!((s.p(), s.n()), (2, 4));
    }

    #[test]
    fn prior_forbids_splits_at_max_depth() {
        let s = small_state();
        let cfg = BartConfig::default();
        assert_eq!(s.prior().p_split.len(), cfg.max_depth);
        assert_eq!(s.prior().p_split(cfg.max_depth - 1), 0.0);
        assert!((s.prior().p_split(0) - cfg.alpha).abs() < 1e-6);
    }

    #[test]
    fn transfer_shares_no_buffers() {
        let s = small_state();
        let t = s.transfer();
        assert!(!Arc::ptr_eq(&s.x, &t.x));
        assert!(!Arc::ptr_eq(&s.y, &t.y));
        assert_eq!(s.signature(), t.signature());
        assert_eq!(s.nbytes(), t.nbytes());
    }

    #[test]
    fn constant_response_uses_fallback_scale() {
        let x = array![[0.0_f32, 1.0]];
        let s = SamplerState::new(quantize(x.view(), 255), array![0.0_f32, 0.0], &BartConfig::with_trees(2));
        assert!((s.sigma2() - FALLBACK_LAMBDA).abs() < 1e-7);
    }

    #[test]
    fn signature_lists_state_tensors() {
        let s = small_state();
        let sig = s.signature();
        let names: Vec<&str> = sig.tensors().iter().map(TensorSpec::name).collect();
        assert_eq!(
            names,
            ["x", "max_split", "y", "resid", "var_tree", "split_tree", "leaf_tree", "sigma2"]
        );
    }
}
