// SPDX-License-Identifier: AGPL-3.0-only
#![deny(unsafe_code)]

//! Bayesian additive regression trees
//!
//! A sum-of-trees regression model sampled with grow/prune MCMC. The crate is
//! built around two entry points:
//!
//! - [`Bart::fit`] quantizes covariates, scales the response and runs an
//!   initial chain; with zero burn-in and zero draws it only builds state
//! - [`run_mcmc`] advances a [`SamplerState`] by a number of iterations with
//!   one key; it is pure and safe to call from many lanes at once
//!
//! # Layout
//!
//! ```text
//! X (p, n) f32 ──quantize──▶ bins (p, n) u16 ─┐
//! y (n)    f32 ──scale─────▶ y ∈ [-0.5, 0.5] ─┴─▶ SamplerState ──run_mcmc──▶ SamplerState
//! ```
//!
//! # Example
//!
//! ```
//! use bart_sampler::{no_callback, run_mcmc, Bart, BartConfig};
//! use bart_runtime::Key;
//! use ndarray::{Array1, Array2};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let x = Array2::from_shape_fn((2, 50), |(i, j)| (i * j) as f32);
//! let y = Array1::from_shape_fn(50, |j| (j as f32).cos());
//!
//! let config = BartConfig::with_trees(20).with_iterations(0, 0);
//! let state = Bart::fit(x.view(), y.view(), &config)?.into_mcmc_state();
//! let next = run_mcmc(&state, 0, 5, 1, &no_callback, Key::from_seed(0));
//! assert_eq!(next.iteration(), 5);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod binning;
mod config;
mod error;
pub mod forest;
mod mcmc;
mod model;
mod state;

pub use config::{BartConfig, MAX_SUPPORTED_DEPTH};
pub use error::{Result, SamplerError};
pub use forest::{Forest, MAX_COVARIATES};
pub use mcmc::{no_callback, run_mcmc, IterationInfo, Phase};
pub use model::Bart;
pub use state::{Acceptance, Prior, SamplerState};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{no_callback, run_mcmc, Bart, BartConfig, Result, SamplerState};
}
