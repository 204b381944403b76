// SPDX-License-Identifier: AGPL-3.0-only

//! Wall-clock timing with a synchronization barrier
//!
//! Dispatch is asynchronous, so stopping the clock when the call returns
//! would measure only the launch. [`Timer::measure`] forces the result
//! through [`Materialize::block_until_ready`] before taking the end time.

use std::time::{Duration, Instant};

use bart_runtime::Materialize;
use tracing::debug;

use crate::error::Result;

/// A materialized value and the wall time it took
#[derive(Debug)]
pub struct Timed<T> {
    /// Fully computed value
    pub value: T,
    /// Start of the scope to the end of the barrier
    pub elapsed: Duration,
}

impl<T> Timed<T> {
    /// Elapsed time in seconds
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Open timing scope. Closed by [`stop`](Self::stop) or, on any other exit
/// path, by `Drop`, which records nothing.
#[derive(Debug)]
pub struct TimerGuard {
    label: String,
    start: Instant,
    stopped: bool,
}

impl TimerGuard {
    /// Take the start timestamp
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
            stopped: false,
        }
    }

    /// Time since start, without closing the scope
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Take the end timestamp and close the scope
    pub fn stop(mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.stopped = true;
        elapsed
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        if !self.stopped {
            debug!(
                "Timer '{}' abandoned after {:.2?}, nothing recorded",
                self.label,
                self.start.elapsed()
            );
        }
    }
}

/// Scoped wall-clock measurement
pub struct Timer;

impl Timer {
    /// Time `launch` plus the barrier on what it returns.
    ///
    /// # Errors
    ///
    /// Propagates errors from `launch` and from the barrier unchanged; no
    /// duration is produced in that case.
    pub fn measure<F, M>(label: impl Into<String>, launch: F) -> Result<Timed<M::Output>>
    where
        F: FnOnce() -> Result<M>,
        M: Materialize,
    {
        let guard = TimerGuard::start(label);
        let pending = launch()?;
        let value = pending.block_until_ready()?;
        let elapsed = guard.stop();
        Ok(Timed { value, elapsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use bart_runtime::Ready;

    struct Sleepy(Duration);

    impl Materialize for Sleepy {
        type Output = ();

        fn block_until_ready(self) -> bart_runtime::Result<()> {
            std::thread::sleep(self.0);
            Ok(())
        }
    }

    #[test]
    fn barrier_time_is_included() {
        let timed = Timer::measure("sleepy", || Ok(Sleepy(Duration::from_millis(20)))).unwrap();
        assert!(timed.elapsed >= Duration::from_millis(20));
    }

    #[test]
    fn ready_values_pass_through() {
        let timed = Timer::measure("ready", || Ok(Ready(7))).unwrap();
        assert_eq!(timed.value, 7);
        assert!(timed.seconds() >= 0.0);
    }

    #[test]
    fn launch_error_propagates() {
        let out = Timer::measure("failing", || -> Result<Ready<()>> { Err(BenchError::config("boom")) });
        assert!(matches!(out, Err(BenchError::Config { .. })));
    }

    #[test]
    fn guard_measures_while_open() {
        let guard = TimerGuard::start("open");
        std::thread::sleep(Duration::from_millis(2));
        assert!(guard.elapsed() >= Duration::from_millis(2));
        assert!(guard.stop() >= Duration::from_millis(2));
    }
}
