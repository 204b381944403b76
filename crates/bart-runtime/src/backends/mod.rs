// SPDX-License-Identifier: AGPL-3.0-only

//! Compute backend implementations
//!
//! Two backends available:
//! - **ThreadPool**: dedicated rayon pool per device, asynchronous dispatch
//!   (category `cpu`)
//! - **Inline**: runs lanes on the caller thread, synchronous dispatch
//!   (category `serial`)

pub mod inline;
pub mod threaded;

pub use inline::InlineBackend;
pub use threaded::ThreadPoolBackend;

/// Host parallelism, falling back to one lane when it cannot be queried.
pub(crate) fn host_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
