// SPDX-License-Identifier: AGPL-3.0-only

//! Devices and device-resident values
//!
//! A [`Device`] pairs a backend with a memory ledger. Values reach a device
//! only through [`Device::put`] (copy from host) or [`Device::commit`] (hand
//! over ownership); both return a [`Resident`] tagged with the device. Every
//! compiled computation checks those tags, so nothing moves between devices
//! implicitly.
//!
//! The ledger counts bytes held by live `Resident` values. Dropping a
//! resident value releases its bytes; [`Device::reclaim`] reports what is
//! still held after a caller believes everything was released.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend::{BackendType, ComputeBackend};
use crate::discovery::DeviceInfo;
use crate::error::Result;

/// Byte footprint of a value held in device memory
pub trait DeviceBuffer: Send + Sync + 'static {
    /// Bytes occupied by the value's buffers
    fn nbytes(&self) -> usize;
}

/// Values that can be copied from host memory into a device's memory
pub trait Transfer: DeviceBuffer + Sized {
    /// Deep copy with no buffers shared with `self`
    #[must_use]
    fn transfer(&self) -> Self;
}

impl<T: DeviceBuffer> DeviceBuffer for Vec<T> {
    fn nbytes(&self) -> usize {
        self.iter().map(DeviceBuffer::nbytes).sum()
    }
}

impl<T: Transfer> Transfer for Vec<T> {
    fn transfer(&self) -> Self {
        self.iter().map(Transfer::transfer).collect()
    }
}

/// Stable identifier of a device within one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u32);

impl DeviceId {
    /// Create a device id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get raw id
    pub const fn id(&self) -> u32 {
        self.0
    }
}

/// Bytes resident on one device
#[derive(Debug, Default)]
pub struct MemoryLedger {
    resident: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryLedger {
    fn reserve(self: &Arc<Self>, bytes: usize) -> Lease {
        let now = self.resident.fetch_add(bytes, Ordering::SeqCst) + bytes;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Lease {
            ledger: Arc::clone(self),
            bytes,
        }
    }

    /// Bytes currently resident
    pub fn resident(&self) -> usize {
        self.resident.load(Ordering::SeqCst)
    }

    /// Highest resident byte count observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Registration of a resident buffer; releases its bytes on drop
#[derive(Debug)]
struct Lease {
    ledger: Arc<MemoryLedger>,
    bytes: usize,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.ledger.resident.fetch_sub(self.bytes, Ordering::SeqCst);
    }
}

/// Compute device handle
///
/// Cheap to clone; clones refer to the same backend and ledger.
#[derive(Debug, Clone)]
pub struct Device {
    info: DeviceInfo,
    backend: Arc<dyn ComputeBackend>,
    ledger: Arc<MemoryLedger>,
}

impl Device {
    pub(crate) fn new(info: DeviceInfo, backend: Box<dyn ComputeBackend>) -> Self {
        Self {
            info,
            backend: Arc::from(backend),
            ledger: Arc::new(MemoryLedger::default()),
        }
    }

    /// Get device id
    #[must_use]
    pub const fn id(&self) -> DeviceId {
        self.info.id
    }

    /// Human-readable label, e.g. `cpu:0`
    #[must_use]
    pub fn label(&self) -> &str {
        &self.info.label
    }

    /// Category label the device was enumerated under
    #[must_use]
    pub fn category(&self) -> &'static str {
        self.info.backend.category()
    }

    /// Get device information
    #[must_use]
    pub const fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Backend type
    #[must_use]
    pub fn backend_type(&self) -> BackendType {
        self.backend.backend_type()
    }

    /// Lanes the backend can run at once
    #[must_use]
    pub fn parallelism(&self) -> usize {
        self.backend.parallelism()
    }

    pub(crate) fn backend(&self) -> &dyn ComputeBackend {
        self.backend.as_ref()
    }

    /// Copy a host value into device memory.
    ///
    /// # Errors
    ///
    /// Returns error if the device backend is not ready.
    pub fn put<T: Transfer>(&self, host: &T) -> Result<Resident<T>> {
        self.ensure_ready()?;
        let value = host.transfer();
        Ok(self.adopt(value))
    }

    /// Move a value into device memory without copying.
    ///
    /// Used for single-use inputs such as keys, which cannot be duplicated.
    ///
    /// # Errors
    ///
    /// Returns error if the device backend is not ready.
    pub fn commit<T: DeviceBuffer>(&self, value: T) -> Result<Resident<T>> {
        self.ensure_ready()?;
        Ok(self.adopt(value))
    }

    pub(crate) fn adopt<T: DeviceBuffer>(&self, value: T) -> Resident<T> {
        let bytes = value.nbytes();
        tracing::debug!("{}: +{bytes} bytes resident", self.label());
        Resident {
            value: Arc::new(value),
            device: self.clone(),
            _lease: self.ledger.reserve(bytes),
        }
    }

    /// Bytes currently resident on this device
    #[must_use]
    pub fn memory_in_use(&self) -> usize {
        self.ledger.resident()
    }

    /// Peak resident bytes since the device was discovered
    #[must_use]
    pub fn peak_memory(&self) -> usize {
        self.ledger.peak()
    }

    /// Reclamation pass: report bytes still resident after a release.
    ///
    /// Returns the resident byte count; a non-zero value means some
    /// `Resident` outlived the caller's scope.
    pub fn reclaim(&self) -> usize {
        let left = self.ledger.resident();
        if left == 0 {
            tracing::debug!("{}: reclaimed, nothing resident", self.label());
        } else {
            tracing::warn!("{}: {left} bytes still resident after reclaim", self.label());
        }
        left
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.backend.is_ready() {
            Ok(())
        } else {
            Err(crate::RuntimeError::invalid_state(format!(
                "{} backend not ready",
                self.label()
            )))
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.info.label, self.backend.backend_type())
    }
}

/// Value living in a device's memory
///
/// Not `Clone`: there is exactly one handle per placement. Dropping it
/// releases the bytes from the device ledger.
#[derive(Debug)]
pub struct Resident<T> {
    value: Arc<T>,
    device: Device,
    _lease: Lease,
}

impl<T> Resident<T> {
    /// Device holding the value
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Borrow the value
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Share the buffer with in-flight lanes of a computation
    pub(crate) fn share(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }

    /// Take the value out for consumption by a computation
    ///
    /// # Errors
    ///
    /// Returns error if the buffer is still shared with running lanes.
    pub(crate) fn into_inner(self) -> Result<T> {
        let Self { value, device, .. } = self;
        Arc::try_unwrap(value).map_err(|_| {
            crate::RuntimeError::invalid_state(format!(
                "buffer on {} still shared with running lanes",
                device.label()
            ))
        })
    }
}
