// SPDX-License-Identifier: AGPL-3.0-only

//! Batched computations and ahead-of-time compilation
//!
//! Building a device computation is two explicit stages:
//!
//! ```text
//! vmap(f)                      single-lane fn(&S, K) -> O  →  Batched
//!   .lower(&state, &keys)?     bind to concrete shapes     →  Lowered
//!   .compile()?                prepare the device          →  Executable
//! ```
//!
//! The shared argument `S` is broadcast to every lane; the batched argument
//! is a `Vec<K>` whose length is the lane count. Lowering records the shape
//! [`Signature`] of both arguments and the device they live on. Compiling
//! prepares the device for that many lanes. An [`Executable`] only accepts
//! arguments with the same signature on the same device, and [`Executable::call`]
//! returns as soon as the lanes are dispatched.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::device::{Device, DeviceBuffer, Resident};
use crate::error::{Result, RuntimeError};
use crate::pending::Pending;

/// Element type of a tensor in a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit float
    F32,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// Pseudo-random key
    Key,
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::F32 => write!(f, "f32"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::Key => write!(f, "key"),
        }
    }
}

/// Name, element type and dimensions of one buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorSpec {
    name: String,
    dtype: DType,
    dims: Vec<usize>,
}

impl TensorSpec {
    /// Create a tensor spec
    pub fn new(name: impl Into<String>, dtype: DType, dims: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            dtype,
            dims,
        }
    }

    /// Buffer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    /// Dimensions
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }
}

impl std::fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(ToString::to_string).collect();
        write!(f, "{}: {}[{}]", self.name, self.dtype, dims.join(","))
    }
}

/// Ordered shapes of every buffer a computation reads
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature(Vec<TensorSpec>);

impl Signature {
    /// Tensors in argument order
    pub fn tensors(&self) -> &[TensorSpec] {
        &self.0
    }

    /// Append another argument's tensors
    #[must_use]
    pub fn concat(mut self, other: Signature) -> Self {
        self.0.extend(other.0);
        self
    }
}

impl From<Vec<TensorSpec>> for Signature {
    fn from(tensors: Vec<TensorSpec>) -> Self {
        Self(tensors)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Values whose buffer shapes can be described without reading their data
pub trait Shaped {
    /// Shape signature
    fn signature(&self) -> Signature;
}

type LaneFn<S, K, O> = dyn Fn(&S, K) -> O + Send + Sync;

/// Map a single-lane function over the batch axis of its second argument.
pub fn vmap<S, K, O, F>(f: F) -> Batched<S, K, O>
where
    F: Fn(&S, K) -> O + Send + Sync + 'static,
{
    Batched { f: Arc::new(f) }
}

/// Batched computation, not yet bound to shapes or a device
pub struct Batched<S, K, O> {
    f: Arc<LaneFn<S, K, O>>,
}

impl<S, K, O> Batched<S, K, O>
where
    S: Shaped + DeviceBuffer,
    K: DeviceBuffer,
    Vec<K>: Shaped,
{
    /// Bind to the shapes and device of concrete arguments.
    ///
    /// # Errors
    ///
    /// Returns error if the arguments live on different devices or the batch
    /// axis is empty.
    pub fn lower(&self, shared: &Resident<S>, batched: &Resident<Vec<K>>) -> Result<Lowered<S, K, O>> {
        let device = shared.device().clone();
        check_placement(&device, batched.device())?;

        let lanes = batched.get().len();
        if lanes == 0 {
            return Err(RuntimeError::invalid_batch("batched argument has no lanes"));
        }

        let signature = shared.get().signature().concat(batched.get().signature());
        debug!("Lowered for {}: {signature}", device.label());
        Ok(Lowered {
            f: Arc::clone(&self.f),
            device,
            lanes,
            signature,
        })
    }
}

/// Computation bound to a signature and a device
pub struct Lowered<S, K, O> {
    f: Arc<LaneFn<S, K, O>>,
    device: Device,
    lanes: usize,
    signature: Signature,
}

impl<S, K, O> Lowered<S, K, O> {
    /// Signature the computation is specialized to
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Compile for the target device.
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot host the lane count.
    pub fn compile(self) -> Result<Executable<S, K, O>> {
        let t0 = Instant::now();
        self.device.backend().prepare(self.lanes)?;
        let compile_time = t0.elapsed();
        info!(
            "Compiled {}-lane computation for {} in {:.2?}",
            self.lanes,
            self.device.label(),
            compile_time
        );
        Ok(Executable {
            f: self.f,
            device: self.device,
            lanes: self.lanes,
            signature: self.signature,
            compile_time,
        })
    }
}

/// Compiled, directly callable batched computation
pub struct Executable<S, K, O> {
    f: Arc<LaneFn<S, K, O>>,
    device: Device,
    lanes: usize,
    signature: Signature,
    compile_time: Duration,
}

impl<S, K, O> Executable<S, K, O>
where
    S: Shaped + DeviceBuffer,
    K: DeviceBuffer,
    O: DeviceBuffer,
    Vec<K>: Shaped,
{
    /// Dispatch every lane and return without waiting.
    ///
    /// The batched argument is consumed: each lane takes ownership of its
    /// element. Outputs are collected by [`Pending`].
    ///
    /// # Errors
    ///
    /// Returns error on device or signature mismatch.
    pub fn call(&self, shared: &Resident<S>, batched: Resident<Vec<K>>) -> Result<Pending<O>> {
        check_placement(&self.device, shared.device())?;
        check_placement(&self.device, batched.device())?;

        let found = shared.get().signature().concat(batched.get().signature());
        if found != self.signature {
            return Err(RuntimeError::ShapeMismatch {
                expected: self.signature.clone(),
                found,
            });
        }

        let state = shared.share();
        let inputs = batched.into_inner()?;
        let (tx, rx) = mpsc::channel();
        for (lane, input) in inputs.into_iter().enumerate() {
            let f = Arc::clone(&self.f);
            let state = Arc::clone(&state);
            let tx = tx.clone();
            self.device.backend().dispatch(Box::new(move || {
                let out = catch_unwind(AssertUnwindSafe(|| f(&state, input)));
                // Receiver gone means the caller abandoned the call.
                let _ = tx.send((lane, out));
            }));
        }
        Ok(Pending::new(rx, self.lanes, self.device.clone()))
    }
}

impl<S, K, O> Executable<S, K, O> {
    /// Device the executable was compiled for
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Lane count
    pub const fn lanes(&self) -> usize {
        self.lanes
    }

    /// Compiled signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Wall time spent in compilation
    pub const fn compile_time(&self) -> Duration {
        self.compile_time
    }
}

fn check_placement(expected: &Device, found: &Device) -> Result<()> {
    if expected.id() == found.id() {
        Ok(())
    } else {
        Err(RuntimeError::DeviceMismatch {
            expected: expected.label().to_string(),
            found: found.label().to_string(),
        })
    }
}
