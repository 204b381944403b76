// SPDX-License-Identifier: AGPL-3.0-only

//! Thread-pool backend
//!
//! Each device owns its own rayon pool, so lanes of one compiled call never
//! compete with work queued on another device or on the global pool. Jobs are
//! spawned onto the pool and `dispatch` returns immediately; the caller
//! observes completion through the lane channel (see [`crate::Pending`]).

use crate::backend::{BackendType, ComputeBackend, Job};
use crate::error::{Result, RuntimeError};
use tracing::{debug, info};

/// Rayon thread-pool backend.
#[derive(Debug)]
pub struct ThreadPoolBackend {
    ordinal: usize,
    pool: rayon::ThreadPool,
}

impl ThreadPoolBackend {
    /// Create a backend with an explicit worker count.
    ///
    /// # Errors
    ///
    /// Returns error if the pool cannot be built (thread spawn failure) or
    /// `threads` is zero.
    pub fn with_threads(ordinal: usize, threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(RuntimeError::backend_init("thread pool needs at least one worker"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("bart-cpu{ordinal}-{i}"))
            .build()
            .map_err(|e| RuntimeError::backend_init(format!("rayon pool: {e}")))?;

        info!("ThreadPoolBackend: device {ordinal} with {threads} workers");
        Ok(Self { ordinal, pool })
    }

    /// Device ordinal this pool serves.
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }
}

impl ComputeBackend for ThreadPoolBackend {
    fn init(ordinal: usize) -> Result<Self> {
        Self::with_threads(ordinal, super::host_parallelism())
    }

    fn parallelism(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn prepare(&self, lanes: usize) -> Result<()> {
        if lanes == 0 {
            return Err(RuntimeError::invalid_batch("zero lanes"));
        }
        // Touch every worker so thread start-up never lands in a timed call.
        let started = self.pool.broadcast(|ctx| ctx.index()).len();
        debug!(
            "ThreadPoolBackend: device {} prepared for {lanes} lanes on {started} workers",
            self.ordinal
        );
        Ok(())
    }

    fn dispatch(&self, job: Job) {
        self.pool.spawn(job);
    }

    fn backend_type(&self) -> BackendType {
        BackendType::ThreadPool
    }

    fn is_ready(&self) -> bool {
        self.pool.current_num_threads() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn zero_threads_rejected() {
        assert!(ThreadPoolBackend::with_threads(0, 0).is_err());
    }

    #[test]
    fn dispatch_runs_on_pool_thread() {
        let backend = ThreadPoolBackend::with_threads(3, 2).unwrap();
        let (tx, rx) = mpsc::channel();
        backend.dispatch(Box::new(move || {
            let name = std::thread::current().name().map(str::to_owned);
            tx.send(name).unwrap();
        }));
        let name = rx.recv().unwrap().unwrap();
        assert!(name.starts_with("bart-cpu3-"), "unexpected worker name {name}");
    }

    #[test]
    fn prepare_rejects_empty_batch() {
        let backend = ThreadPoolBackend::with_threads(0, 1).unwrap();
        assert!(backend.prepare(0).is_err());
        assert!(backend.prepare(4).is_ok());
    }

    #[test]
    fn reports_worker_count() {
        let backend = ThreadPoolBackend::with_threads(0, 2).unwrap();
        assert_eq!(backend.parallelism(), 2);
        assert_eq!(backend.backend_type(), BackendType::ThreadPool);
    }
}
