// SPDX-License-Identifier: AGPL-3.0-only

//! Array-compute runtime for the BART device-scaling benchmark.
//!
//! Provides the pieces a benchmark needs from a compute runtime, and
//! nothing more:
//!
//! - splittable pseudo-random [`Key`]s
//! - device enumeration by category label ([`DeviceManager`])
//! - explicit host → device placement ([`Device::put`], [`Device::commit`])
//! - a two-stage build: [`vmap`] over a batch axis, then ahead-of-time
//!   compile for concrete shapes
//! - asynchronous dispatch with a blocking barrier ([`Materialize`])
//!
//! # Backend hierarchy
//!
//! ```text
//! cpu     ThreadPoolBackend: dedicated rayon pool, asynchronous dispatch
//! serial  InlineBackend:     caller thread, synchronous dispatch
//! ```
//!
//! # Quick start
//!
//! ```
//! use bart_runtime::{vmap, DeviceManager, Key, Materialize};
//! # use bart_runtime::{DeviceBuffer, Transfer, Shaped, Signature, TensorSpec, DType};
//! # #[derive(Clone)] struct Table(Vec<f32>);
//! # impl DeviceBuffer for Table { fn nbytes(&self) -> usize { self.0.len() * 4 } }
//! # impl Transfer for Table { fn transfer(&self) -> Self { self.clone() } }
//! # impl Shaped for Table {
//! #     fn signature(&self) -> Signature {
//! #         Signature::from(vec![TensorSpec::new("t", DType::F32, vec![self.0.len()])])
//! #     }
//! # }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = DeviceManager::discover()?.first("cpu")?;
//! let table = device.put(&Table(vec![1.0, 2.0]))?;
//! let keys = device.commit(Key::from_seed(0).split(4))?;
//!
//! let exe = vmap(|t: &Table, _k: Key| t.clone())
//!     .lower(&table, &keys)?
//!     .compile()?;
//! let out = exe.call(&table, keys)?.block_until_ready()?;
//! assert_eq!(out.get().len(), 4);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod backend;
pub mod backends;
mod compile;
mod device;
mod discovery;
mod error;
mod pending;
pub mod random;

pub use backend::{select_backend, BackendSelection, BackendType, ComputeBackend, Job};
pub use backends::{InlineBackend, ThreadPoolBackend};
pub use compile::{vmap, Batched, DType, Executable, Lowered, Shaped, Signature, TensorSpec};
pub use device::{Device, DeviceBuffer, DeviceId, MemoryLedger, Resident, Transfer};
pub use discovery::{DeviceInfo, DeviceManager};
pub use error::{Result, RuntimeError};
pub use pending::{Materialize, Pending, Ready};
pub use random::{Key, KeyStream};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        vmap, Device, DeviceBuffer, DeviceManager, Executable, Key, KeyStream, Materialize,
        Resident, Result, RuntimeError, Shaped, Signature, Transfer,
    };
}
