// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for sampler construction

use thiserror::Error;

/// Result type alias for sampler operations
pub type Result<T> = std::result::Result<T, SamplerError>;

/// Errors that can occur while building a sampler from data
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Covariate columns and response length disagree
    #[error("Shape mismatch: X has {x_cols} observations, y has {y_len}")]
    ShapeMismatch {
        /// Number of observations (columns) in X
        x_cols: usize,
        /// Length of y
        y_len: usize,
    },

    /// No observations or no covariates
    #[error("Empty data: X has shape ({p}, {n})")]
    EmptyData {
        /// Number of covariates
        p: usize,
        /// Number of observations
        n: usize,
    },

    /// More covariates than a split variable index can address
    #[error("Too many covariates: {p}, at most {max} supported")]
    TooManyCovariates {
        /// Number of covariates
        p: usize,
        /// Largest supported count
        max: usize,
    },

    /// Input contains NaN or infinity
    #[error("Non-finite value in {what}")]
    NonFinite {
        /// Which input
        what: &'static str,
    },

    /// Sampler configuration rejected
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for failure
        reason: String,
    },
}

impl SamplerError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
