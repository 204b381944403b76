// SPDX-License-Identifier: AGPL-3.0-only

//! Backend abstraction for compute devices
//!
//! A backend owns the execution resources of one device and knows how to run
//! a unit of work on them. Work submission is fire-and-forget: completion is
//! observed through the channel the job reports into, never through the
//! backend itself.

use crate::backends::{InlineBackend, ThreadPoolBackend};
use crate::error::Result;
use std::fmt::Debug;

/// Unit of work submitted to a backend
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Compute backend trait - unified interface for host execution strategies
pub trait ComputeBackend: Debug + Send + Sync {
    /// Bring the backend up for the given device ordinal
    ///
    /// # Errors
    ///
    /// Returns error if execution resources cannot be allocated.
    fn init(ordinal: usize) -> Result<Self>
    where
        Self: Sized;

    /// Number of lanes that can make progress at the same time
    fn parallelism(&self) -> usize;

    /// One-time preparation for a compiled computation with `lanes` lanes
    ///
    /// Called from ahead-of-time compilation, never from a timed call.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot host the requested lane count.
    fn prepare(&self, lanes: usize) -> Result<()>;

    /// Submit a job. May return before the job has run.
    fn dispatch(&self, job: Job);

    /// Get backend type for debugging
    fn backend_type(&self) -> BackendType;

    /// Check if backend is ready
    fn is_ready(&self) -> bool;
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// Dedicated rayon thread pool; dispatch is asynchronous
    ThreadPool,

    /// Runs every job on the submitting thread; dispatch is synchronous
    Inline,
}

impl BackendType {
    /// Device category label this backend is enumerated under
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::ThreadPool => "cpu",
            Self::Inline => "serial",
        }
    }

    /// All backend types in enumeration order
    pub const ALL: [BackendType; 2] = [Self::ThreadPool, Self::Inline];
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ThreadPool => write!(f, "ThreadPool (rayon)"),
            Self::Inline => write!(f, "Inline"),
        }
    }
}

/// Backend selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelection {
    /// Automatically select best available
    Auto,

    /// Force the thread-pool backend
    ThreadPool,

    /// Force the inline backend
    Inline,
}

/// Select appropriate backend based on availability
///
/// # Errors
///
/// Returns error if the selected backend cannot be initialized.
pub fn select_backend(selection: BackendSelection, ordinal: usize) -> Result<Box<dyn ComputeBackend>> {
    match selection {
        BackendSelection::Auto => {
            match ThreadPoolBackend::init(ordinal) {
                Ok(backend) => {
                    tracing::info!("Using thread-pool backend for device {ordinal}");
                    Ok(Box::new(backend))
                }
                Err(e) => {
                    tracing::info!("Thread pool unavailable ({e}), using inline backend for device {ordinal}");
                    InlineBackend::init(ordinal).map(|b| Box::new(b) as Box<dyn ComputeBackend>)
                }
            }
        }

        BackendSelection::ThreadPool => {
            ThreadPoolBackend::init(ordinal).map(|b| Box::new(b) as Box<dyn ComputeBackend>)
        }

        BackendSelection::Inline => {
            InlineBackend::init(ordinal).map(|b| Box::new(b) as Box<dyn ComputeBackend>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_unique() {
        let mut labels: Vec<_> = BackendType::ALL.iter().map(|b| b.category()).collect();
        labels.dedup();
        assert_eq!(labels.len(), BackendType::ALL.len());
    }

    #[test]
    fn forced_inline_selection() {
        let backend = select_backend(BackendSelection::Inline, 0).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Inline);
        assert!(backend.is_ready());
    }

    #[test]
    fn auto_prefers_thread_pool() {
        let backend = select_backend(BackendSelection::Auto, 0).unwrap();
        assert_eq!(backend.backend_type(), BackendType::ThreadPool);
    }
}
