// SPDX-License-Identifier: AGPL-3.0-only
#![deny(unsafe_code)]

//! Device-scaling benchmark for the BART sampler
//!
//! For every dataset size the harness generates a synthetic regression
//! problem, builds an initial sampler state once, and then times a vectorized
//! multi-chain MCMC run on each requested device. Timings land in a
//! [`ResultsTable`] which renders as markdown or as a log-log SVG report.
//!
//! ```text
//! for n in sizes:
//!     data(n) ─▶ initial state ─┬─▶ cpu    : put ▶ compile ▶ launch ▶ barrier ─▶ t
//!                               └─▶ serial : put ▶ compile ▶ launch ▶ barrier ─▶ t
//! ```
//!
//! Only launch-to-barrier is timed. Data generation, state construction,
//! transfer and compilation are excluded.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod config;
mod dataset;
mod error;
mod init;
pub mod report;
mod results;
mod sweep;
mod task;
mod timer;

pub use config::{BenchmarkConfig, DEFAULT_SEED, DEFAULT_SIZES};
pub use dataset::{Dataset, DatasetSpec};
pub use error::{BenchError, Result};
pub use init::initialize_state;
pub use report::{Anchor, Figure, Report, ReportOptions};
pub use results::{format_seconds, ResultsTable, TimingResult};
pub use sweep::{run_benchmark, ConsoleProgress, Phase, Silent, Sweep, SweepObserver};
pub use task::{build_task, Completed, DeviceTask, Launch};
pub use timer::{Timed, Timer, TimerGuard};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        run_benchmark, BenchmarkConfig, ConsoleProgress, Report, ReportOptions, ResultsTable,
        Sweep,
    };
}
