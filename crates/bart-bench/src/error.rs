// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the benchmark harness

use std::path::PathBuf;

use bart_runtime::RuntimeError;
use bart_sampler::SamplerError;
use thiserror::Error;

/// Result type alias for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that abort a benchmark run
#[derive(Debug, Error)]
pub enum BenchError {
    /// Benchmark configuration rejected
    #[error("Invalid benchmark configuration: {reason}")]
    Config {
        /// Reason for failure
        reason: String,
    },

    /// Compute runtime failure (device lookup, placement, compile, dispatch)
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Sampler rejected the data or its configuration
    #[error(transparent)]
    Sampler(#[from] SamplerError),

    /// Unknown text box anchor
    #[error("Unknown anchor '{0}', expected '<lower|center|upper> <left|center|right>'")]
    Anchor(String),

    /// Writing the report failed
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl BenchError {
    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
