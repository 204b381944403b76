// SPDX-License-Identifier: AGPL-3.0-only

//! Compiled multi-chain sampler step bound to one device

use bart_runtime::{
    vmap, Device, Executable, Key, Materialize, Pending, Resident, Signature,
};
use bart_sampler::{no_callback, run_mcmc, SamplerState};
use tracing::debug;

use crate::config::BenchmarkConfig;
use crate::error::Result;

type StepExecutable = Executable<SamplerState, Key, SamplerState>;

/// Inputs placed on a device together with the executable compiled for them
pub struct DeviceTask {
    state: Resident<SamplerState>,
    keys: Resident<Vec<Key>>,
    exe: StepExecutable,
}

/// Place the state and chain keys on `device` and compile the batched step.
///
/// Both the state and the keys are copied, so the same host keys can be
/// placed on every device and each device runs the same chains. Each lane runs
/// `config.mcmc_iterations` iterations with no burn-in from the shared state
/// with its own key. Compilation happens here, before any timer starts.
///
/// # Errors
///
/// Returns error if placement or compilation fails.
#[allow(clippy::ptr_arg)]
pub fn build_task(
    device: &Device,
    host_state: &SamplerState,
    chain_keys: &Vec<Key>,
    config: &BenchmarkConfig,
) -> Result<DeviceTask> {
    let state = device.put(host_state)?;
    let keys = device.put(chain_keys)?;

    let iterations = config.mcmc_iterations;
    let exe = vmap(move |state: &SamplerState, key: Key| {
        run_mcmc(state, 0, iterations, 1, &no_callback, key)
    })
    .lower(&state, &keys)?
    .compile()?;

    debug!(
        "{}: task ready, {} lanes, compiled in {:.2?}",
        device.label(),
        exe.lanes(),
        exe.compile_time()
    );
    Ok(DeviceTask { state, keys, exe })
}

impl DeviceTask {
    /// Device the task is bound to
    pub fn device(&self) -> &Device {
        self.exe.device()
    }

    /// Signature the executable was compiled for
    pub fn signature(&self) -> &Signature {
        self.exe.signature()
    }

    /// Number of chains
    pub fn lanes(&self) -> usize {
        self.exe.lanes()
    }

    /// Dispatch every chain and return without waiting.
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects the call.
    pub fn launch(self) -> Result<Launch> {
        let pending = self.exe.call(&self.state, self.keys)?;
        Ok(Launch {
            state: self.state,
            pending,
        })
    }
}

/// A dispatched task; the device copy of the state is held until the barrier.
pub struct Launch {
    state: Resident<SamplerState>,
    pending: Pending<SamplerState>,
}

impl Materialize for Launch {
    type Output = Completed;

    fn block_until_ready(self) -> bart_runtime::Result<Completed> {
        let outputs = self.pending.block_until_ready()?;
        Ok(Completed {
            outputs,
            input: self.state,
        })
    }
}

/// Chain outputs together with the device copy of the input state.
///
/// Both stay resident until this value is dropped, which lets a caller
/// release them after the timer has stopped.
pub struct Completed {
    outputs: Resident<Vec<SamplerState>>,
    input: Resident<SamplerState>,
}

impl Completed {
    /// Final state of every chain, in lane order
    pub fn outputs(&self) -> &[SamplerState] {
        self.outputs.get()
    }

    /// Device copy of the state every chain started from
    pub fn input(&self) -> &SamplerState {
        self.input.get()
    }
}
