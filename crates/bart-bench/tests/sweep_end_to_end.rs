// SPDX-License-Identifier: AGPL-3.0-only

//! Full sweeps on small sizes, through the public API

use anyhow::Result;
use bart_bench::{
    run_benchmark, BenchmarkConfig, Dataset, Phase, Report, ReportOptions, Silent, Sweep,
};
use bart_runtime::{DeviceManager, Key, KeyStream};

fn small() -> BenchmarkConfig {
    BenchmarkConfig::default()
        .with_sizes([100, 1000])
        .with_p(2)
        .with_ntree(10)
        .with_nchains(2)
        .with_iterations(1)
}

#[test]
fn two_sizes_one_device() -> Result<()> {
    let manager = DeviceManager::discover()?;
    let table = run_benchmark(small(), &manager, &mut Silent)?;

    assert_eq!(table.len(), 2);
    assert_eq!(table.sizes(), vec![100, 1000]);
    for entry in table.entries() {
        assert_eq!(entry.device, "cpu");
        assert!(entry.seconds > 0.0 && entry.seconds.is_finite());
    }
    Ok(())
}

#[test]
fn entries_follow_sweep_order() -> Result<()> {
    let manager = DeviceManager::discover()?;
    let config = small().with_sizes([50, 80, 120]).with_devices(["cpu", "serial"]);
    let table = run_benchmark(config, &manager, &mut Silent)?;

    let order: Vec<(usize, &str)> = table
        .entries()
        .iter()
        .map(|e| (e.n, e.device.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            (50, "cpu"),
            (50, "serial"),
            (80, "cpu"),
            (80, "serial"),
            (120, "cpu"),
            (120, "serial"),
        ]
    );
    Ok(())
}

#[test]
fn dataset_at_first_size_has_expected_shapes() {
    let config = small();
    let [x_key, noise_key, _chains] = KeyStream::new(config.seed).advance();
    let data = Dataset::generate(x_key, noise_key, &config.dataset_spec(100));
    assert_eq!(data.x().dim(), (2, 100));
    assert_eq!(data.y().len(), 100);
    assert!(data.x().iter().all(|v| (-2.0..=2.0).contains(v)));
}

#[test]
fn data_is_a_function_of_the_seed() {
    let spec = small().dataset_spec(64);
    let a = Dataset::generate(Key::from_seed(5), Key::from_seed(6), &spec);
    let b = Dataset::generate(Key::from_seed(5), Key::from_seed(6), &spec);
    let c = Dataset::generate(Key::from_seed(5), Key::from_seed(7), &spec);
    assert_eq!(a.x(), b.x());
    assert_eq!(a.y(), b.y());
    assert_eq!(a.x(), c.x());
    assert_ne!(a.y(), c.y());
}

#[test]
fn stepping_ends_in_done() -> Result<()> {
    let manager = DeviceManager::discover()?;
    let mut sweep = Sweep::new(small().with_sizes([30]), &manager)?;
    let mut steps = 0;
    while *sweep.step(&mut Silent)? != Phase::Done {
        steps += 1;
        assert!(steps < 10);
    }
    assert_eq!(sweep.results().len(), 1);
    Ok(())
}

#[test]
fn report_renders_and_saves() -> Result<()> {
    let manager = DeviceManager::discover()?;
    let config = small();
    let table = run_benchmark(config.clone(), &manager, &mut Silent)?;

    let options = ReportOptions {
        anchor: "upper right".parse()?,
        ..ReportOptions::default()
    };
    let first = Report::render(&table, &config, &options);
    let second = Report::render(&table, &config, &options);
    assert_eq!(first.svg(), second.svg());

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("benchmark-device.svg");
    first.save(&path)?;
    assert_eq!(std::fs::read_to_string(&path)?, first.svg());
    Ok(())
}

#[test]
fn save_into_missing_directory_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let figure = Report::render(
        &bart_bench::ResultsTable::new(),
        &small(),
        &ReportOptions::default(),
    );
    let err = figure
        .save(dir.path().join("missing").join("plot.svg"))
        .unwrap_err();
    assert!(err.to_string().contains("plot.svg"));
    Ok(())
}
