// SPDX-License-Identifier: AGPL-3.0-only

//! Enumerate all compute devices visible to the runtime
//!
//! This example demonstrates runtime device discovery.

use bart_runtime::{DeviceManager, Result};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("bart_runtime=debug")
        .init();

    println!("Compute device enumeration\n");

    let manager = DeviceManager::discover()?;

    println!("Found {} device(s):\n", manager.device_count());

    for device in manager.all() {
        println!("Device {}:", device.label());
        println!("   Category:   {}", device.category());
        println!("   Backend:    {}", device.backend_type());
        println!("   Lanes:      {}", device.parallelism());
        println!("   Resident:   {} bytes", device.memory_in_use());
        println!();
    }

    println!("Discovery complete");

    Ok(())
}
