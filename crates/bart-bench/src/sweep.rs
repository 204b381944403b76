// SPDX-License-Identifier: AGPL-3.0-only

//! Sweep over dataset sizes and devices
//!
//! The sweep is an explicit state machine:
//!
//! ```text
//! Init ──▶ PerSize(n₀) ──▶ PerDevice(n₀, d₀) ──▶ PerDevice(n₀, d₁) ──▶ …
//!            ▲                                                     │
//!            └──────────────── PerSize(n₁) ◀──────────────────────┘
//!                                   …                  ──▶ Done
//! ```
//!
//! `PerSize` draws keys, generates the dataset and builds the host sampler
//! state. Each `PerDevice` places that state on one device, compiles, times
//! one call and records the result. Any error stops the machine where it is;
//! the results recorded so far stay readable.

use std::io::Write as _;

use bart_runtime::{Device, DeviceManager, Key, KeyStream};
use bart_sampler::SamplerState;
use tracing::{debug, info};

use crate::config::BenchmarkConfig;
use crate::dataset::Dataset;
use crate::error::{BenchError, Result};
use crate::init::initialize_state;
use crate::results::{format_seconds, ResultsTable};
use crate::task::build_task;
use crate::timer::Timer;

/// Where the sweep currently is; the phase named is the next one to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Configuration validated, key stream seeded
    Init,
    /// About to prepare dataset size `n`
    PerSize {
        /// Dataset size
        n: usize,
    },
    /// About to time `device` at size `n`
    PerDevice {
        /// Dataset size
        n: usize,
        /// Device label
        device: String,
    },
    /// Every pair measured
    Done,
}

/// Progress events emitted while the sweep runs
pub trait SweepObserver {
    /// A dataset size is about to be prepared
    fn size_started(&mut self, _n: usize) {}

    /// One `(n, device)` pair was measured
    fn device_finished(&mut self, _n: usize, _device: &str, _seconds: f64) {}

    /// Every device was measured at size `n`
    fn size_finished(&mut self, _n: usize) {}
}

/// Observer that ignores every event
#[derive(Debug, Default)]
pub struct Silent;

impl SweepObserver for Silent {}

/// Prints `n = 100, cpu: 0.0021s` lines to stdout as results arrive
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl SweepObserver for ConsoleProgress {
    fn size_started(&mut self, n: usize) {
        print!("n = {n}");
        let _ = std::io::stdout().flush();
    }

    fn device_finished(&mut self, _n: usize, device: &str, seconds: f64) {
        print!(", {device}: {}s", format_seconds(seconds));
        let _ = std::io::stdout().flush();
    }

    fn size_finished(&mut self, _n: usize) {
        println!();
    }
}

/// Inputs shared by every device at one size
struct SizeState {
    state: SamplerState,
    chain_keys: Vec<Key>,
}

/// The benchmark driver
pub struct Sweep {
    config: BenchmarkConfig,
    devices: Vec<(String, Device)>,
    keys: KeyStream,
    phase: Phase,
    size_index: usize,
    device_index: usize,
    current: Option<SizeState>,
    results: ResultsTable,
}

impl Sweep {
    /// Validate the configuration, resolve devices and seed the key stream.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or a device category is
    /// unknown to `manager`.
    pub fn new(config: BenchmarkConfig, manager: &DeviceManager) -> Result<Self> {
        config.validate()?;
        let devices = config
            .devices
            .iter()
            .map(|category| -> Result<(String, Device)> {
                Ok((category.clone(), manager.first(category)?))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Sweep: {} sizes × {} devices, ntree = {}, nchains = {}, iterations = {}",
            config.sizes.len(),
            devices.len(),
            config.ntree,
            config.nchains,
            config.mcmc_iterations
        );
        let keys = KeyStream::new(config.seed);
        Ok(Self {
            config,
            devices,
            keys,
            phase: Phase::Init,
            size_index: 0,
            device_index: 0,
            current: None,
            results: ResultsTable::new(),
        })
    }

    /// Next phase to run
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Results recorded so far
    pub fn results(&self) -> &ResultsTable {
        &self.results
    }

    /// Configuration the sweep runs with
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Give up the sweep and keep its results
    pub fn into_results(self) -> ResultsTable {
        self.results
    }

    /// Run phases until `Done`.
    ///
    /// # Errors
    ///
    /// Returns the first error; the sweep stays in the failing phase.
    pub fn run(&mut self, observer: &mut dyn SweepObserver) -> Result<()> {
        while self.phase != Phase::Done {
            self.step(observer)?;
        }
        Ok(())
    }

    /// Run the current phase and move to the next.
    ///
    /// # Errors
    ///
    /// Returns error from data generation, state construction, placement,
    /// compilation or the timed call.
    pub fn step(&mut self, observer: &mut dyn SweepObserver) -> Result<&Phase> {
        let next = match self.phase.clone() {
            Phase::Init => self.size_phase(0),
            Phase::PerSize { n } => {
                observer.size_started(n);
                self.prepare_size(n)?;
                self.device_phase(n, 0)
            }
            Phase::PerDevice { n, device } => {
                let seconds = self.time_device(n, &device)?;
                observer.device_finished(n, &device, seconds);
                if self.device_index + 1 < self.devices.len() {
                    self.device_phase(n, self.device_index + 1)
                } else {
                    self.current = None;
                    observer.size_finished(n);
                    self.size_phase(self.size_index + 1)
                }
            }
            Phase::Done => Phase::Done,
        };
        self.phase = next;
        Ok(&self.phase)
    }

    fn size_phase(&mut self, index: usize) -> Phase {
        self.size_index = index;
        match self.config.sizes.get(index) {
            Some(&n) => Phase::PerSize { n },
            None => {
                info!("Sweep done, {} results", self.results.len());
                Phase::Done
            }
        }
    }

    fn device_phase(&mut self, n: usize, index: usize) -> Phase {
        self.device_index = index;
        Phase::PerDevice {
            n,
            device: self.devices[index].0.clone(),
        }
    }

    fn prepare_size(&mut self, n: usize) -> Result<()> {
        let [x_key, noise_key, chain_root] = self.keys.advance();

        let dataset = Dataset::generate(x_key, noise_key, &self.config.dataset_spec(n));
        debug!("n = {n}: dataset {} bytes", dataset.nbytes());
        let state = initialize_state(dataset, &self.config)?;

        for (_, device) in &self.devices {
            device.reclaim();
        }
        self.current = Some(SizeState {
            state,
            chain_keys: chain_root.split(self.config.nchains),
        });
        Ok(())
    }

    fn time_device(&mut self, n: usize, label: &str) -> Result<f64> {
        let device = self.devices[self.device_index].1.clone();
        let current = self
            .current
            .as_ref()
            .ok_or_else(|| BenchError::config(format!("no state prepared for n = {n}")))?;

        let task = build_task(&device, &current.state, &current.chain_keys, &self.config)?;
        let timed = Timer::measure(label, || task.launch())?;
        let seconds = timed.seconds();
        drop(timed);

        let left = device.reclaim();
        info!("n = {n}, {label}: {seconds:.6}s ({left} bytes left resident)");
        self.results.record(n, label, seconds);
        Ok(seconds)
    }
}

/// Run a whole sweep and return its results.
///
/// # Errors
///
/// Returns the first error; partial results are dropped. Use [`Sweep`]
/// directly to keep them.
pub fn run_benchmark(
    config: BenchmarkConfig,
    manager: &DeviceManager,
    observer: &mut dyn SweepObserver,
) -> Result<ResultsTable> {
    let mut sweep = Sweep::new(config, manager)?;
    sweep.run(observer)?;
    Ok(sweep.into_results())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> BenchmarkConfig {
        BenchmarkConfig::default()
            .with_sizes([20, 40])
            .with_p(2)
            .with_ntree(3)
            .with_nchains(2)
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl SweepObserver for Recorder {
        fn size_started(&mut self, n: usize) {
            self.0.push(format!("start {n}"));
        }
        fn device_finished(&mut self, n: usize, device: &str, _seconds: f64) {
            self.0.push(format!("{device} {n}"));
        }
        fn size_finished(&mut self, n: usize) {
            self.0.push(format!("end {n}"));
        }
    }

    #[test]
    fn phases_follow_the_machine() {
        let manager = DeviceManager::discover().unwrap();
        let config = tiny().with_sizes([20]).with_devices(["cpu", "serial"]);
        let mut sweep = Sweep::new(config, &manager).unwrap();
        let mut obs = Silent;
        assert_eq!(sweep.phase(), &Phase::Init);
        assert_eq!(sweep.step(&mut obs).unwrap(), &Phase::PerSize { n: 20 });
        assert_eq!(
            sweep.step(&mut obs).unwrap(),
            &Phase::PerDevice { n: 20, device: "cpu".into() }
        );
        assert_eq!(
            sweep.step(&mut obs).unwrap(),
            &Phase::PerDevice { n: 20, device: "serial".into() }
        );
        assert_eq!(sweep.step(&mut obs).unwrap(), &Phase::Done);
        assert_eq!(sweep.step(&mut obs).unwrap(), &Phase::Done);
        assert_eq!(sweep.results().len(), 2);
    }

    #[test]
    fn every_device_gets_the_split_of_the_chain_root() {
        let manager = DeviceManager::discover().unwrap();
        let config = tiny().with_sizes([20]).with_devices(["cpu", "serial"]);
        let mut sweep = Sweep::new(config.clone(), &manager).unwrap();
        let mut obs = Silent;

        let [_, _, chain_root] = KeyStream::new(config.seed).advance();
        let expected = chain_root.split(config.nchains);

        for _ in 0..2 {
            sweep.step(&mut obs).unwrap();
        }
        assert_eq!(sweep.phase(), &Phase::PerDevice { n: 20, device: "cpu".into() });
        assert_eq!(sweep.current.as_ref().unwrap().chain_keys, expected);

        sweep.step(&mut obs).unwrap();
        assert_eq!(sweep.phase(), &Phase::PerDevice { n: 20, device: "serial".into() });
        assert_eq!(sweep.current.as_ref().unwrap().chain_keys, expected);
    }

    #[test]
    fn observer_sees_events_in_order() {
        let manager = DeviceManager::discover().unwrap();
        let mut obs = Recorder::default();
        run_benchmark(tiny(), &manager, &mut obs).unwrap();
        assert_eq!(obs.0, ["start 20", "cpu 20", "end 20", "start 40", "cpu 40", "end 40"]);
    }

    #[test]
    fn unknown_device_fails_at_init() {
        let manager = DeviceManager::discover().unwrap();
        let err = Sweep::new(tiny().with_devices(["tpu"]), &manager).err();
        assert!(matches!(err, Some(BenchError::Runtime(_))));
    }

    #[test]
    fn invalid_config_fails_at_init() {
        let manager = DeviceManager::discover().unwrap();
        assert!(Sweep::new(tiny().with_nchains(0), &manager).is_err());
    }

    #[test]
    fn results_readable_mid_sweep() {
        let manager = DeviceManager::discover().unwrap();
        let mut sweep = Sweep::new(tiny().with_sizes([20, 30]), &manager).unwrap();
        let mut obs = Silent;
        for _ in 0..3 {
            sweep.step(&mut obs).unwrap();
        }
        assert_eq!(sweep.results().len(), 1);
        assert_eq!(sweep.phase(), &Phase::PerSize { n: 30 });
    }
}
