use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use settlement_sim::export::{build_export, export_json, write_to_file};
use settlement_sim::metrics::SimMetrics;
use settlement_sim::scenarios::{self, ScenarioConfig, ScenarioKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(author, version, about = "Fee token market simulator", long_about = None)]
struct Args {
    /// Scenario to run: random_flow, sell_pressure or hostile_charity
    #[arg(long, default_value = "random_flow")]
    scenario: String,

    /// JSON scenario config; defaults are used for missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the config seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the config tick count
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the config trader count
    #[arg(long)]
    traders: Option<u64>,

    /// Write the JSON export here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let kind: ScenarioKind = args.scenario.parse()?;
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::from_path(path)
            .with_context(|| format!("loading scenario config {}", path.display()))?,
        None => ScenarioConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        config.ticks = ticks;
    }
    if let Some(traders) = args.traders {
        config.traders = traders;
    }

    tracing::info!(
        scenario = kind.name(),
        seed = config.seed,
        ticks = config.ticks,
        traders = config.traders,
        "starting simulation"
    );

    let started = Instant::now();
    let (result, chain) = scenarios::run(kind, &config)?;
    let mut metrics = SimMetrics::new();
    metrics.ingest_events(&chain.events);
    metrics.set_elapsed(started.elapsed().as_nanos() as u64);

    tracing::info!("{}", metrics.summary());
    let passed = result.passed;
    let details = result.details.clone();

    let export = build_export(&chain, result, &metrics, config.seed)?;
    match &args.out {
        Some(path) => {
            write_to_file(&export, path)
                .with_context(|| format!("writing export to {}", path.display()))?;
            tracing::info!(path = %path.display(), run_id = %export.run_id, "export written");
        }
        None => println!("{}", export_json(&export)?),
    }

    if !passed {
        bail!("scenario {} failed: {}", kind.name(), details);
    }
    tracing::info!(scenario = kind.name(), "{details}");
    Ok(())
}
