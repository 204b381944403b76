// SPDX-License-Identifier: AGPL-3.0-only

//! Sampler configuration

use crate::error::{Result, SamplerError};

/// Deepest tree the heap layout supports
pub const MAX_SUPPORTED_DEPTH: usize = 16;

/// BART model and MCMC configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BartConfig {
    /// Number of trees in the ensemble
    pub ntree: usize,

    /// Iterations run and discarded before any draw is kept
    pub burn_in: usize,

    /// Posterior draws kept
    pub draws: usize,

    /// Iterations between kept draws
    pub thinning: usize,

    /// Seed for the sampler's own key
    pub seed: u64,

    /// Maximum tree depth; the root is depth 0, leaves live at depth < `max_depth`
    pub max_depth: usize,

    /// Maximum number of cutpoints per covariate
    pub numcut: usize,

    /// Tree prior base: P(split at depth d) = alpha / (1 + d)^beta
    pub alpha: f32,

    /// Tree prior decay
    pub beta: f32,

    /// Leaf prior scale; leaf sd is 0.5 / (k·√ntree) on the scaled response
    pub k: f32,

    /// Degrees of freedom of the inverse-gamma noise prior
    pub sigma_df: f32,
}

impl Default for BartConfig {
    fn default() -> Self {
        Self {
            ntree: 200,
            burn_in: 100,
            draws: 1000,
            thinning: 1,
            seed: 0,
            max_depth: 6,
            numcut: 255,
            alpha: 0.95,
            beta: 2.0,
            k: 2.0,
            sigma_df: 3.0,
        }
    }
}

impl BartConfig {
    /// Default configuration with the given ensemble size
    pub fn with_trees(ntree: usize) -> Self {
        Self {
            ntree,
            ..Self::default()
        }
    }

    /// Set burn-in and kept draws
    #[must_use]
    pub fn with_iterations(mut self, burn_in: usize, draws: usize) -> Self {
        self.burn_in = burn_in;
        self.draws = draws;
        self
    }

    /// Set the sampler seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every field is usable.
    ///
    /// # Errors
    ///
    /// Returns `SamplerError::InvalidConfig` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.ntree == 0 {
            return Err(SamplerError::invalid_config("ntree must be positive"));
        }
        if self.thinning == 0 {
            return Err(SamplerError::invalid_config("thinning must be positive"));
        }
        if !(2..=MAX_SUPPORTED_DEPTH).contains(&self.max_depth) {
            return Err(SamplerError::invalid_config(format!(
                "max_depth {} outside 2..={MAX_SUPPORTED_DEPTH}",
                self.max_depth
            )));
        }
        if self.numcut == 0 || self.numcut >= usize::from(u16::MAX) {
            return Err(SamplerError::invalid_config(format!(
                "numcut {} outside 1..{}",
                self.numcut,
                u16::MAX
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(SamplerError::invalid_config("alpha must lie in (0, 1)"));
        }
        if !(self.beta >= 0.0 && self.k > 0.0 && self.sigma_df > 0.0) {
            return Err(SamplerError::invalid_config(
                "beta must be non-negative, k and sigma_df positive",
            ));
        }
        Ok(())
    }
}
