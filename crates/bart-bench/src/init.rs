// SPDX-License-Identifier: AGPL-3.0-only

//! Initial sampler state for one sweep point

use bart_sampler::{Bart, BartConfig, SamplerState};
use tracing::debug;

use crate::config::BenchmarkConfig;
use crate::dataset::Dataset;
use crate::error::Result;

/// Build the MCMC state with no burn-in and no kept draws.
///
/// The sampler seed is `config.init_seed`, never drawn from the sweep's key
/// stream, so the initial ensemble is built the same way at every size. The
/// dataset is consumed; only the state survives.
///
/// # Errors
///
/// Propagates the sampler's shape, empty-data and configuration errors.
pub fn initialize_state(dataset: Dataset, config: &BenchmarkConfig) -> Result<SamplerState> {
    let sampler_config = BartConfig::with_trees(config.ntree)
        .with_iterations(0, 0)
        .with_seed(config.init_seed);
    let state = Bart::fit(dataset.x(), dataset.y(), &sampler_config)?.into_mcmc_state();
    debug!(
        "Initialized state for n = {}: {} bytes",
        state.n(),
        bart_runtime::DeviceBuffer::nbytes(&state)
    );
    Ok(state)
}
