// SPDX-License-Identifier: AGPL-3.0-only

//! Inline backend
//!
//! Runs every job to completion on the submitting thread. Useful as a
//! single-lane baseline next to the thread-pool device and for CI machines
//! where spawning pools is undesirable.

use crate::backend::{BackendType, ComputeBackend, Job};
use crate::error::{Result, RuntimeError};

/// Synchronous, single-lane backend.
#[derive(Debug)]
pub struct InlineBackend {
    ordinal: usize,
}

impl ComputeBackend for InlineBackend {
    fn init(ordinal: usize) -> Result<Self> {
        tracing::debug!("InlineBackend: device {ordinal}");
        Ok(Self { ordinal })
    }

    fn parallelism(&self) -> usize {
        1
    }

    fn prepare(&self, lanes: usize) -> Result<()> {
        if lanes == 0 {
            return Err(RuntimeError::invalid_batch("zero lanes"));
        }
        tracing::debug!("InlineBackend: device {} will run {lanes} lanes in sequence", self.ordinal);
        Ok(())
    }

    fn dispatch(&self, job: Job) {
        job();
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Inline
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn dispatch_completes_before_returning() {
        let backend = InlineBackend::init(0).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            backend.dispatch(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn single_lane() {
        let backend = InlineBackend::init(0).unwrap();
        assert_eq!(backend.parallelism(), 1);
        assert!(backend.is_ready());
    }
}
