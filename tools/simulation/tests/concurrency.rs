//! Concurrency test
//!
//! Independent chains share no state, so runs on separate threads must
//! match the same runs done one after another.

use settlement_sim::metrics::SimMetrics;
use settlement_sim::scenarios::{run, ScenarioConfig, ScenarioKind};
use std::thread;

fn config(seed: u64) -> ScenarioConfig {
    ScenarioConfig {
        traders: 4,
        ticks: 50,
        seed,
        ..ScenarioConfig::default()
    }
}

fn run_metrics(seed: u64) -> SimMetrics {
    let (result, chain) = run(ScenarioKind::RandomFlow, &config(seed)).unwrap();
    assert!(result.passed, "seed {seed}: {}", result.details);
    let mut metrics = SimMetrics::new();
    metrics.ingest_events(&chain.events);
    metrics
}

#[test]
fn test_parallel_chains_match_sequential() {
    let seeds = vec![1u64, 2, 3, 4];

    let handles: Vec<_> = seeds
        .iter()
        .map(|&seed| thread::spawn(move || run_metrics(seed)))
        .collect();
    let parallel: Vec<SimMetrics> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let sequential: Vec<SimMetrics> = seeds.iter().map(|&seed| run_metrics(seed)).collect();
    assert_eq!(parallel, sequential);
}
