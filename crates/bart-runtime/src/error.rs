// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for runtime operations

use thiserror::Error;

use crate::compile::Signature;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while placing, compiling or executing work on a device
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No device registered under the requested category label
    #[error("No devices for category '{category}' (available: {available})")]
    DeviceNotFound {
        /// Category label that was requested
        category: String,
        /// Comma-separated list of known categories
        available: String,
    },

    /// Device ordinal out of range within a category
    #[error("Device index {index} out of range for '{category}' (have {count} devices)")]
    InvalidIndex {
        /// Category label
        category: String,
        /// Requested ordinal
        index: usize,
        /// Number of devices in the category
        count: usize,
    },

    /// Backend could not be brought up
    #[error("Backend initialization failed: {reason}")]
    BackendInit {
        /// Reason for failure
        reason: String,
    },

    /// An input is resident on a different device than the computation
    #[error("Input resident on {found}, computation targets {expected}")]
    DeviceMismatch {
        /// Device the computation was compiled for
        expected: String,
        /// Device the input actually lives on
        found: String,
    },

    /// Executable called with inputs whose shapes differ from the compiled signature
    #[error("Shape mismatch: compiled for {expected}, called with {found}")]
    ShapeMismatch {
        /// Signature the executable was compiled for
        expected: Signature,
        /// Signature of the arguments passed at call time
        found: Signature,
    },

    /// Batched axis is empty or otherwise unusable
    #[error("Invalid batch: {reason}")]
    InvalidBatch {
        /// Reason for failure
        reason: String,
    },

    /// A lane of a batched computation panicked or vanished before reporting
    #[error("Lane {lane} failed: {reason}")]
    LaneFailed {
        /// Lane index on the batch axis
        lane: usize,
        /// Reason for failure
        reason: String,
    },

    /// Runtime object in an invalid state
    #[error("Invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },
}

impl RuntimeError {
    /// Create a device not found error
    pub fn device_not_found(category: impl Into<String>, available: &[&str]) -> Self {
        Self::DeviceNotFound {
            category: category.into(),
            available: available.join(", "),
        }
    }

    /// Create a backend initialization error
    pub fn backend_init(reason: impl Into<String>) -> Self {
        Self::BackendInit {
            reason: reason.into(),
        }
    }

    /// Create an invalid batch error
    pub fn invalid_batch(reason: impl Into<String>) -> Self {
        Self::InvalidBatch {
            reason: reason.into(),
        }
    }

    /// Create a lane failure error
    pub fn lane_failed(lane: usize, reason: impl Into<String>) -> Self {
        Self::LaneFailed {
            lane,
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }
}
