// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests for the two host backends
//!
//! The thread-pool and inline devices must produce identical lane outputs for
//! identical keys; only scheduling differs.

use anyhow::Result;
use bart_runtime::{
    vmap, DType, DeviceBuffer, DeviceManager, Key, Materialize, Shaped, Signature, TensorSpec,
    Transfer,
};
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
struct Walk {
    steps: Vec<f32>,
}

impl DeviceBuffer for Walk {
    fn nbytes(&self) -> usize {
        self.steps.len() * std::mem::size_of::<f32>()
    }
}

impl Transfer for Walk {
    fn transfer(&self) -> Self {
        self.clone()
    }
}

impl Shaped for Walk {
    fn signature(&self) -> Signature {
        Signature::from(vec![TensorSpec::new("steps", DType::F32, vec![self.steps.len()])])
    }
}

/// One random-walk lane: perturb every step with the lane's own stream.
fn perturb(walk: &Walk, key: Key) -> Walk {
    let mut rng = key.into_rng();
    Walk {
        steps: walk.steps.iter().map(|s| s + rng.gen_range(-1.0_f32..1.0)).collect(),
    }
}

fn run_on(category: &str, seed: u64) -> Result<Vec<Walk>> {
    let device = DeviceManager::discover()?.first(category)?;
    let walk = device.put(&Walk { steps: vec![0.0; 64] })?;
    let keys = device.commit(Key::from_seed(seed).split(6))?;
    let exe = vmap(perturb).lower(&walk, &keys)?.compile()?;
    let out = exe.call(&walk, keys)?.block_until_ready()?;
    Ok(out.get().clone())
}

#[test]
fn test_backend_output_parity() -> Result<()> {
    let pool = run_on("cpu", 42)?;
    let inline = run_on("serial", 42)?;
    assert_eq!(pool, inline, "lane outputs differ between backends");
    Ok(())
}

#[test]
fn test_lanes_are_independent() -> Result<()> {
    let out = run_on("cpu", 42)?;
    assert_eq!(out.len(), 6);
    assert_ne!(out[0], out[1], "two lanes drew the same randomness");
    Ok(())
}

#[test]
fn test_placed_key_copies_drive_identical_lanes() -> Result<()> {
    let manager = DeviceManager::discover()?;
    let host_keys = Key::from_seed(9).split(4);
    let mut outputs = Vec::new();
    for category in ["cpu", "serial"] {
        let device = manager.first(category)?;
        let walk = device.put(&Walk { steps: vec![0.0; 16] })?;
        let keys = device.put(&host_keys)?;
        assert_eq!(keys.get(), &host_keys);
        let exe = vmap(perturb).lower(&walk, &keys)?.compile()?;
        outputs.push(exe.call(&walk, keys)?.block_until_ready()?.get().clone());
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(host_keys, Key::from_seed(9).split(4));
    Ok(())
}

#[test]
fn test_outputs_and_inputs_leave_no_residue() -> Result<()> {
    let device = DeviceManager::discover()?.first("cpu")?;
    {
        let walk = device.put(&Walk { steps: vec![1.0; 32] })?;
        let keys = device.commit(Key::from_seed(0).split(4))?;
        let exe = vmap(perturb).lower(&walk, &keys)?.compile()?;
        let out = exe.call(&walk, keys)?.block_until_ready()?;
        assert!(device.memory_in_use() >= 5 * 32 * 4);
        drop(out);
        drop(walk);
    }
    assert_eq!(device.reclaim(), 0);
    Ok(())
}

#[test]
fn test_recompile_for_new_shapes() -> Result<()> {
    let device = DeviceManager::discover()?.first("cpu")?;
    for n in [1usize, 10, 100] {
        let walk = device.put(&Walk { steps: vec![0.0; n] })?;
        let keys = device.commit(Key::from_seed(n as u64).split(2))?;
        let exe = vmap(perturb).lower(&walk, &keys)?.compile()?;
        assert_eq!(exe.signature().tensors()[0].dims(), &[n]);
        let out = exe.call(&walk, keys)?.block_until_ready()?;
        assert!(out.get().iter().all(|w| w.steps.len() == n));
    }
    Ok(())
}
