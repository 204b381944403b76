// SPDX-License-Identifier: AGPL-3.0-only

//! Repeated timed calls of one compiled step on identical inputs

use anyhow::Result;
use bart_bench::{initialize_state, BenchmarkConfig, Dataset, Timer};
use bart_runtime::{vmap, DeviceManager, Key, Materialize};
use bart_sampler::{no_callback, run_mcmc, SamplerState};

const REPEATS: usize = 5;
const CHAINS: usize = 4;

fn repeated_seconds(category: &str) -> Result<Vec<f64>> {
    let config = BenchmarkConfig::default().with_p(2).with_ntree(20).with_iterations(3);
    let data = Dataset::generate(Key::from_seed(1), Key::from_seed(2), &config.dataset_spec(500));
    let host = initialize_state(data, &config)?;

    let device = DeviceManager::discover()?.first(category)?;
    let state = device.put(&host)?;
    let keys = device.put(&Key::from_seed(7).split(CHAINS))?;
    let iterations = config.mcmc_iterations;
    let exe = vmap(move |s: &SamplerState, k: Key| run_mcmc(s, 0, iterations, 1, &no_callback, k))
        .lower(&state, &keys)?
        .compile()?;

    // Warm-up call so pool start-up is not in the first sample.
    exe.call(&state, keys)?.block_until_ready()?;

    let mut seconds = Vec::with_capacity(REPEATS);
    for _ in 0..REPEATS {
        let keys = device.put(&Key::from_seed(7).split(CHAINS))?;
        let timed = Timer::measure(category, || Ok(exe.call(&state, keys)?))?;
        assert_eq!(timed.value.get().len(), CHAINS);
        seconds.push(timed.seconds());
    }
    Ok(seconds)
}

fn assert_same_order_of_magnitude(seconds: &[f64]) {
    assert!(seconds.iter().all(|&s| s > 0.0), "{seconds:?}");
    let max = seconds.iter().copied().fold(f64::MIN, f64::max);
    let min = seconds.iter().copied().fold(f64::MAX, f64::min);
    assert!(max / min < 10.0, "{seconds:?}");
}

#[test]
fn repeated_calls_on_cpu_stay_within_a_decade() -> Result<()> {
    assert_same_order_of_magnitude(&repeated_seconds("cpu")?);
    Ok(())
}

#[test]
fn repeated_calls_on_serial_stay_within_a_decade() -> Result<()> {
    assert_same_order_of_magnitude(&repeated_seconds("serial")?);
    Ok(())
}
