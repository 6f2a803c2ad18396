//! Age Interpolation CLI
//!
//! `run` interpolates a dataset file; `bench` times a pass over a
//! synthetic dataset and checks the filled ages against the truth.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use interpolation::model::Age;
use interpolation::synthetic::{self, SyntheticConfig};
use interpolation::{Dataset, DateIndex, InterpolationConfig, InterpolationPass, PassStats};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "interpolate-ages")]
#[command(about = "Fill in missing lifter ages from their other results")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interpolate ages in a dataset file
    Run {
        /// Dataset JSON with `events` and `entries` tables
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the interpolated entry table
        #[arg(short, long)]
        output: PathBuf,

        /// Pass configuration JSON
        #[arg(short, long, env = "INTERPOLATE_AGES_CONFIG")]
        config: Option<PathBuf>,

        /// Process lifters on one thread
        #[arg(long)]
        sequential: bool,

        /// Print pass statistics as JSON
        #[arg(long)]
        stats: bool,
    },
    /// Time a pass over a synthetic dataset
    Bench {
        #[arg(long, default_value_t = 100_000)]
        lifters: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Mean extra observations per lifter
        #[arg(long, default_value_t = 3.0)]
        mean_observations: f64,

        #[arg(long)]
        threads: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Args::parse().command {
        Command::Run {
            input,
            output,
            config,
            sequential,
            stats,
        } => run(input, output, config, sequential, stats),
        Command::Bench {
            lifters,
            seed,
            mean_observations,
            threads,
        } => bench(lifters, seed, mean_observations, threads),
    }
}

fn run(
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    sequential: bool,
    print_stats: bool,
) -> Result<()> {
    let mut config = match config {
        Some(path) => InterpolationConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => InterpolationConfig::default(),
    };
    if sequential {
        config.parallel = false;
    }

    let dataset = Dataset::load(&input)
        .with_context(|| format!("Failed to load dataset {}", input.display()))?;
    info!(
        "Loaded {} entries and {} events from {}",
        dataset.entries.len(),
        dataset.events.len(),
        input.display()
    );

    let pass = InterpolationPass::new(config)?;
    let start = Instant::now();
    let result = pass.run(&dataset).context("Interpolation pass failed")?;
    info!("Pass finished in {:?}", start.elapsed());

    let stats = result.stats;
    let saved = result
        .into_dataset()
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(
        "Wrote {} rows ({} bytes) to {}",
        saved.rows,
        saved.file_bytes,
        output.display()
    );

    if print_stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}

fn bench(lifters: usize, seed: u64, mean_observations: f64, threads: Option<usize>) -> Result<()> {
    info!("Generating {} synthetic lifters (seed {})...", lifters, seed);
    let data = synthetic::generate(&SyntheticConfig {
        lifters,
        seed,
        mean_observations,
        ..SyntheticConfig::default()
    })?;
    info!(
        "Generated {} entries over {} events",
        data.dataset.entries.len(),
        data.dataset.events.len()
    );

    let pass = InterpolationPass::new(InterpolationConfig {
        threads,
        ..InterpolationConfig::default()
    })?;

    let start = Instant::now();
    let result = pass.run(&data.dataset)?;
    let elapsed = start.elapsed();
    log_stats(&result.stats);
    info!(
        "Benchmark complete: {:?} total, {:?} per lifter",
        elapsed,
        elapsed / lifters.max(1) as u32
    );

    if let Some(usage) = memory_stats::memory_stats() {
        info!("Physical memory: {} MiB", usage.physical_mem / (1024 * 1024));
    }

    // Synthetic data is truthful, so every filled age must match
    let dates = DateIndex::from_events(&data.dataset.events)?;
    let mut wrong = 0usize;
    for (entry, row) in data.dataset.entries.iter().zip(&result.entries) {
        let (Some(date), Some(birthdate)) = (
            dates.get(entry.event_id),
            data.birthdates.get(&entry.lifter_id),
        ) else {
            continue;
        };
        let truth = synthetic::age_on(*birthdate, date);
        let matches = match Age::parse(&row.age) {
            Some(Age::Exact(age)) => age == truth,
            Some(Age::Uncertain(age)) => age == truth || age + 1 == truth,
            Some(Age::None) => true,
            None => false,
        };
        if !matches {
            warn!(
                lifter = %entry.lifter_id,
                event = %entry.event_id,
                "Age {} disagrees with true age {}",
                row.age,
                truth
            );
            wrong += 1;
        }
    }
    if wrong > 0 || result.stats.inconsistent > 0 {
        bail!(
            "{} wrong ages and {} rejected lifters in truthful data",
            wrong,
            result.stats.inconsistent
        );
    }
    Ok(())
}

fn log_stats(stats: &PassStats) {
    info!(
        "{} lifters: {} by birthday window, {} by birth year, {} by bounds only, \
         {} with too few results",
        stats.lifters,
        stats.window_resolved,
        stats.birth_year_resolved,
        stats.bounds_only,
        stats.too_few_observations
    );
    info!(
        "Filled {} exact and {} uncertain ages, tightened {} bounds",
        stats.filled_exact, stats.filled_uncertain, stats.bounds_tightened
    );
}
