// SPDX-License-Identifier: AGPL-3.0-only

//! Fitting entry point

use bart_runtime::Key;
use ndarray::{Array1, ArrayView1, ArrayView2};
use tracing::{debug, info};

use crate::binning::quantize;
use crate::config::BartConfig;
use crate::error::{Result, SamplerError};
use crate::forest::MAX_COVARIATES;
use crate::mcmc::{run_mcmc, IterationInfo, Phase};
use crate::state::SamplerState;

/// A fitted BART model.
///
/// Holds the last MCMC state and the affine map between the caller's
/// response scale and the sampler's internal `[-0.5, 0.5]` scale.
#[derive(Debug, Clone)]
pub struct Bart {
    state: SamplerState,
    offset: f32,
    scale: f32,
    sigma_trace: Vec<f32>,
}

impl Bart {
    /// Fit to covariates `x` of shape (p, n) and response `y` of length n.
    ///
    /// Runs `burn_in + draws * thinning` iterations. With zero burn-in and
    /// zero draws this only builds the initial state.
    ///
    /// # Errors
    ///
    /// Returns error if shapes disagree, the data is empty, any value is not
    /// finite, or the configuration is invalid.
    pub fn fit(x: ArrayView2<'_, f32>, y: ArrayView1<'_, f32>, config: &BartConfig) -> Result<Self> {
        config.validate()?;
        let (p, n) = x.dim();
        if n != y.len() {
            return Err(SamplerError::ShapeMismatch {
                x_cols: n,
                y_len: y.len(),
            });
        }
        if p == 0 || n == 0 {
            return Err(SamplerError::EmptyData { p, n });
        }
        if p > MAX_COVARIATES {
            return Err(SamplerError::TooManyCovariates {
                p,
                max: MAX_COVARIATES,
            });
        }
        if !x.iter().all(|v| v.is_finite()) {
            return Err(SamplerError::NonFinite { what: "X" });
        }
        if !y.iter().all(|v| v.is_finite()) {
            return Err(SamplerError::NonFinite { what: "y" });
        }

        let (lo, hi) = y
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let offset = (lo + hi) / 2.0;
        let scale = if hi > lo { hi - lo } else { 1.0 };
        let y_scaled: Array1<f32> = y.mapv(|v| (v - offset) / scale);

        let binned = quantize(x, config.numcut);
        let state = SamplerState::new(binned, y_scaled, config);
        debug!(
            "Initial state: ntree = {}, n = {n}, p = {p}, {} bytes",
            config.ntree,
            bart_runtime::DeviceBuffer::nbytes(&state)
        );

        let mut model = Self {
            state,
            offset,
            scale,
            sigma_trace: Vec::with_capacity(config.draws),
        };

        let iterations = config.burn_in + config.draws * config.thinning;
        if iterations > 0 {
            let kept = std::cell::RefCell::new(Vec::with_capacity(config.draws));
            let record = |info: &IterationInfo| {
                if info.phase == Phase::Main && info.kept {
                    kept.borrow_mut().push(info.sigma2.sqrt() * scale);
                }
            };
            model.state = run_mcmc(
                &model.state,
                config.burn_in,
                config.draws,
                config.thinning,
                &record,
                Key::from_seed(config.seed),
            );
            model.sigma_trace = kept.into_inner();
            info!(
                "Ran {iterations} MCMC iterations, acceptance {:.2}",
                model.state.acceptance().rate()
            );
        }
        Ok(model)
    }

    /// Current MCMC state, borrowing
    pub fn mcmc_state(&self) -> &SamplerState {
        &self.state
    }

    /// Give up the model and keep only its MCMC state
    pub fn into_mcmc_state(self) -> SamplerState {
        self.state
    }

    /// Noise standard deviation on the response scale, current state
    pub fn sigma(&self) -> f32 {
        self.state.sigma2().sqrt() * self.scale
    }

    /// Noise standard deviation at each kept draw
    pub fn sigma_trace(&self) -> &[f32] {
        &self.sigma_trace
    }

    /// In-sample prediction of the current state, on the response scale
    pub fn predict(&self) -> Array1<f32> {
        self.state.predict().mapv(|v| v * self.scale + self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn rejects_mismatched_shapes() {
        let x = Array2::<f32>::zeros((2, 5));
        let y = Array1::<f32>::zeros(4);
        let err = Bart::fit(x.view(), y.view(), &BartConfig::with_trees(3)).unwrap_err();
        assert!(matches!(err, SamplerError::ShapeMismatch { x_cols: 5, y_len: 4 }));
    }

    #[test]
    fn rejects_empty_data() {
        let x = Array2::<f32>::zeros((0, 3));
        let y = Array1::<f32>::zeros(3);
        assert!(matches!(
            Bart::fit(x.view(), y.view(), &BartConfig::with_trees(3)),
            Err(SamplerError::EmptyData { p: 0, n: 3 })
        ));
    }

    #[test]
    fn rejects_more_covariates_than_split_indices() {
        let x = Array2::<f32>::zeros((MAX_COVARIATES + 1, 2));
        let y = array![0.0_f32, 1.0];
        assert!(matches!(
            Bart::fit(x.view(), y.view(), &BartConfig::with_trees(1)),
            Err(SamplerError::TooManyCovariates { p, .. }) if p == MAX_COVARIATES + 1
        ));
    }

    #[test]
    fn rejects_nan() {
        let x = array![[0.0_f32, f32::NAN]];
        let y = array![1.0_f32, 2.0];
        assert!(matches!(
            Bart::fit(x.view(), y.view(), &BartConfig::with_trees(3)),
            Err(SamplerError::NonFinite { what: "X" })
        ));
    }

    #[test]
    fn rejects_zero_trees() {
        let x = array![[0.0_f32, 1.0]];
        let y = array![1.0_f32, 2.0];
        assert!(matches!(
            Bart::fit(x.view(), y.view(), &BartConfig::with_trees(0)),
            Err(SamplerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn zero_iterations_builds_initial_state() {
        let x = array![[0.0_f32, 1.0, 2.0]];
        let y = array![1.0_f32, 2.0, 3.0];
        let cfg = BartConfig::with_trees(4).with_iterations(0, 0);
        let model = Bart::fit(x.view(), y.view(), &cfg).unwrap();
        assert!(model.sigma_trace().is_empty());
        let state = model.into_mcmc_state();
        assert_eq!(state.iteration(), 0);
        assert_eq!(state.forest().ntree(), 4);
        assert!(state.y().iter().all(|v| (-0.5..=0.5).contains(v)));
    }

    #[test]
    fn draws_fill_the_sigma_trace() {
        let x = Array2::from_shape_fn((1, 40), |(_, j)| j as f32);
        let y = x.row(0).mapv(|v| (v / 5.0).cos());
        let cfg = BartConfig::with_trees(5).with_iterations(2, 6);
        let model = Bart::fit(x.view(), y.view(), &cfg).unwrap();
        assert_eq!(model.sigma_trace().len(), 6);
        assert_eq!(model.mcmc_state().iteration(), 8);
        assert_eq!(model.predict().len(), 40);
    }
}
