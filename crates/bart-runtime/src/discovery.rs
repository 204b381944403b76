// SPDX-License-Identifier: AGPL-3.0-only

//! Runtime device discovery
//!
//! Enumerates the devices this process can run computations on, grouped by
//! category label (`cpu`, `serial`). Enumeration order within a category is
//! stable, so `first("cpu")` always names the same device.

use crate::backend::{select_backend, BackendSelection, BackendType};
use crate::device::{Device, DeviceId};
use crate::error::{Result, RuntimeError};

/// Device manager for runtime discovery and access
#[derive(Debug)]
pub struct DeviceManager {
    devices: Vec<Device>,
}

/// Information about a discovered device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Process-unique device id
    pub id: DeviceId,

    /// Ordinal within its category (0, 1, 2, ...)
    pub ordinal: usize,

    /// Display label (`cpu:0`, `serial:0`, ...)
    pub label: String,

    /// Backend serving the device
    pub backend: BackendType,
}

impl DeviceManager {
    /// Discover all devices available to this process
    ///
    /// # Errors
    ///
    /// Returns error if a backend fails to initialize.
    pub fn discover() -> Result<Self> {
        tracing::info!("Discovering compute devices...");

        let mut devices = Vec::with_capacity(BackendType::ALL.len());
        for backend_type in BackendType::ALL {
            let selection = match backend_type {
                BackendType::ThreadPool => BackendSelection::ThreadPool,
                BackendType::Inline => BackendSelection::Inline,
            };
            let backend = select_backend(selection, 0)?;
            let info = DeviceInfo {
                id: next_device_id(),
                ordinal: 0,
                label: format!("{}:0", backend_type.category()),
                backend: backend_type,
            };
            tracing::info!(
                "Device {}: {} ({} lanes)",
                info.label,
                backend_type,
                backend.parallelism()
            );
            devices.push(Device::new(info, backend));
        }

        tracing::info!("Discovered {} device(s)", devices.len());
        Ok(Self { devices })
    }

    /// Get number of discovered devices
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Get slice of all devices
    #[must_use]
    pub fn all(&self) -> &[Device] {
        &self.devices
    }

    /// Known category labels, in enumeration order
    #[must_use]
    pub fn categories(&self) -> Vec<&'static str> {
        let mut labels: Vec<&'static str> = Vec::new();
        for device in &self.devices {
            if !labels.contains(&device.category()) {
                labels.push(device.category());
            }
        }
        labels
    }

    /// Devices in one category
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::DeviceNotFound` if the category has no devices.
    pub fn devices(&self, category: &str) -> Result<Vec<Device>> {
        let found: Vec<Device> = self
            .devices
            .iter()
            .filter(|d| d.category() == category)
            .cloned()
            .collect();
        if found.is_empty() {
            return Err(RuntimeError::device_not_found(category, &self.categories()));
        }
        Ok(found)
    }

    /// Device by category and ordinal
    ///
    /// # Errors
    ///
    /// Returns an error if the category is unknown or the ordinal out of range.
    pub fn device(&self, category: &str, index: usize) -> Result<Device> {
        let devices = self.devices(category)?;
        let count = devices.len();
        devices
            .into_iter()
            .nth(index)
            .ok_or_else(|| RuntimeError::InvalidIndex {
                category: category.to_string(),
                index,
                count,
            })
    }

    /// First device of a category
    ///
    /// # Errors
    ///
    /// Returns an error if the category is unknown.
    pub fn first(&self, category: &str) -> Result<Device> {
        self.device(category, 0)
    }
}

fn next_device_id() -> DeviceId {
    use std::sync::atomic::{AtomicU32, Ordering};
    static NEXT: AtomicU32 = AtomicU32::new(0);
    DeviceId::new(NEXT.fetch_add(1, Ordering::Relaxed))
}

impl DeviceInfo {
    /// Get device ordinal
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Get device label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}
