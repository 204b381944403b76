// SPDX-License-Identifier: AGPL-3.0-only

//! Benchmark configuration

use bart_sampler::MAX_COVARIATES;

use crate::dataset::DatasetSpec;
use crate::error::{BenchError, Result};

/// Dataset sizes swept by default, 1-2-5 steps from 100 to 10^8
pub const DEFAULT_SIZES: [usize; 19] = [
    100,
    200,
    500,
    1_000,
    2_000,
    5_000,
    10_000,
    20_000,
    50_000,
    100_000,
    200_000,
    500_000,
    1_000_000,
    2_000_000,
    5_000_000,
    10_000_000,
    20_000_000,
    50_000_000,
    100_000_000,
];

/// Root seed of the sweep's key stream
pub const DEFAULT_SEED: u64 = 202_403_241_634;

/// Everything a run needs, fixed for its whole duration
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    /// Trees in the ensemble
    pub ntree: usize,
    /// MCMC iterations per timed call
    pub mcmc_iterations: usize,
    /// Chains run side by side in one call
    pub nchains: usize,
    /// Covariates per observation
    pub p: usize,
    /// Noise standard deviation of the response
    pub sigma: f32,
    /// Dataset sizes, visited in order
    pub sizes: Vec<usize>,
    /// Device categories, visited in order for every size
    pub devices: Vec<String>,
    /// Root seed of the key stream
    pub seed: u64,
    /// Seed of the sampler's initial state, identical for every size
    pub init_seed: u64,
    /// Lower bound of the covariate interval
    pub x_low: f32,
    /// Upper bound of the covariate interval
    pub x_high: f32,
    /// Period of the cosine mean function
    pub period: f32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            ntree: 200,
            mcmc_iterations: 1,
            nchains: 8,
            p: 10,
            sigma: 0.1,
            sizes: DEFAULT_SIZES.to_vec(),
            devices: vec!["cpu".to_string()],
            seed: DEFAULT_SEED,
            init_seed: 0,
            x_low: -2.0,
            x_high: 2.0,
            period: 2.0,
        }
    }
}

impl BenchmarkConfig {
    /// Set the dataset sizes
    #[must_use]
    pub fn with_sizes(mut self, sizes: impl IntoIterator<Item = usize>) -> Self {
        self.sizes = sizes.into_iter().collect();
        self
    }

    /// Drop every size above `max_n`
    #[must_use]
    pub fn with_max_n(mut self, max_n: usize) -> Self {
        self.sizes.retain(|&n| n <= max_n);
        self
    }

    /// Set the ensemble size
    #[must_use]
    pub fn with_ntree(mut self, ntree: usize) -> Self {
        self.ntree = ntree;
        self
    }

    /// Set the number of chains
    #[must_use]
    pub fn with_nchains(mut self, nchains: usize) -> Self {
        self.nchains = nchains;
        self
    }

    /// Set MCMC iterations per timed call
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.mcmc_iterations = iterations;
        self
    }

    /// Set the covariate count
    #[must_use]
    pub fn with_p(mut self, p: usize) -> Self {
        self.p = p;
        self
    }

    /// Set the noise standard deviation
    #[must_use]
    pub fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the root seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the device categories
    #[must_use]
    pub fn with_devices<S: Into<String>>(mut self, devices: impl IntoIterator<Item = S>) -> Self {
        self.devices = devices.into_iter().map(Into::into).collect();
        self
    }

    /// Check the configuration once, before any work.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sizes.is_empty() {
            return Err(BenchError::config("no dataset sizes"));
        }
        if self.sizes.contains(&0) {
            return Err(BenchError::config("dataset sizes must be positive"));
        }
        for (name, value) in [
            ("ntree", self.ntree),
            ("mcmc_iterations", self.mcmc_iterations),
            ("nchains", self.nchains),
            ("p", self.p),
        ] {
            if value == 0 {
                return Err(BenchError::config(format!("{name} must be positive")));
            }
        }
        if self.p > MAX_COVARIATES {
            return Err(BenchError::config(format!(
                "p = {} exceeds the {MAX_COVARIATES} covariates a split can index",
                self.p
            )));
        }
        if !(self.sigma.is_finite() && self.sigma >= 0.0) {
            return Err(BenchError::config(format!(
                "sigma must be finite and non-negative, got {}",
                self.sigma
            )));
        }
        if !(self.x_low.is_finite() && self.x_high.is_finite() && self.x_low < self.x_high) {
            return Err(BenchError::config(format!(
                "empty covariate interval [{}, {}]",
                self.x_low, self.x_high
            )));
        }
        if !(self.period.is_finite() && self.period > 0.0) {
            return Err(BenchError::config("period must be finite and positive"));
        }
        if self.devices.is_empty() {
            return Err(BenchError::config("no devices"));
        }
        for (i, device) in self.devices.iter().enumerate() {
            if self.devices[..i].contains(device) {
                return Err(BenchError::config(format!("device '{device}' listed twice")));
            }
        }
        Ok(())
    }

    /// Dataset parameters for size `n`
    pub fn dataset_spec(&self, n: usize) -> DatasetSpec {
        DatasetSpec {
            p: self.p,
            n,
            sigma: self.sigma,
            low: self.x_low,
            high: self.x_high,
            period: self.period,
        }
    }

    /// Multi-line summary drawn in the report's text box
    pub fn annotation(&self) -> String {
        format!(
            "p = {}\nntree = {}\nnchains = {}\nmcmc_iterations = {}",
            self.p, self.ntree, self.nchains, self.mcmc_iterations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_run() {
        let cfg = BenchmarkConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!((cfg.ntree, cfg.mcmc_iterations, cfg.nchains, cfg.p), (200, 1, 8, 10));
        assert_eq!(cfg.sizes.first(), Some(&100));
        assert_eq!(cfg.sizes.last(), Some(&100_000_000));
        assert_eq!(cfg.devices, vec!["cpu"]);
    }

    #[test]
    fn rejects_covariate_counts_beyond_split_indices() {
        assert!(BenchmarkConfig::default().with_p(MAX_COVARIATES).validate().is_ok());
        let err = BenchmarkConfig::default().with_p(MAX_COVARIATES + 1).validate();
        assert!(matches!(err, Err(BenchError::Config { .. })));
    }

    #[test]
    fn rejects_empty_and_zero_sizes() {
        assert!(BenchmarkConfig::default().with_sizes(Vec::new()).validate().is_err());
        assert!(BenchmarkConfig::default().with_sizes([100, 0]).validate().is_err());
    }

    #[test]
    fn rejects_zero_counts() {
        let base = BenchmarkConfig::default();
        assert!(base.clone().with_nchains(0).validate().is_err());
        assert!(base.clone().with_ntree(0).validate().is_err());
        assert!(base.clone().with_iterations(0).validate().is_err());
        assert!(base.with_p(0).validate().is_err());
    }

    #[test]
    fn rejects_non_finite_sigma() {
        assert!(BenchmarkConfig::default().with_sigma(f32::NAN).validate().is_err());
        assert!(BenchmarkConfig::default().with_sigma(-1.0).validate().is_err());
    }

    #[test]
    fn rejects_duplicate_devices() {
        let cfg = BenchmarkConfig::default().with_devices(["cpu", "serial", "cpu"]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn max_n_truncates_the_sweep() {
        let cfg = BenchmarkConfig::default().with_max_n(1_000);
        assert_eq!(cfg.sizes, vec![100, 200, 500, 1_000]);
    }

    #[test]
    fn annotation_lists_run_shape() {
        let text = BenchmarkConfig::default().annotation();
        assert_eq!(text, "p = 10\nntree = 200\nnchains = 8\nmcmc_iterations = 1");
    }
}
