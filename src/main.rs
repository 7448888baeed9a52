use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use thresher::{io, BatchRunner, FileRunner, ModelDescriptor, SqliteStore};

/// Synthetic batches are reproducible across runs.
const SYNTHETIC_SEED: u64 = 7;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML model file
    #[arg(long, default_value = "./models/v0/model.yaml")]
    model: PathBuf,

    /// Optional CSV input with at least a 'data' column
    #[arg(long)]
    input_csv: Option<PathBuf>,

    /// Where to save predictions
    #[arg(long, default_value = "predictions.csv")]
    output_csv: PathBuf,

    /// If no CSV, generate N synthetic samples
    #[arg(long, default_value_t = 40)]
    sample_n: usize,

    /// Run one processing cycle against the SQLite record store at this
    /// path instead of scoring a file batch
    #[arg(long)]
    db: Option<PathBuf>,

    /// Insert N synthetic observations into the store before the cycle
    #[arg(long, requires = "db")]
    seed_n: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let descriptor = ModelDescriptor::load(&args.model)
        .with_context(|| format!("loading model file {}", args.model.display()))?;
    println!(
        "model_used={} theta_low={} theta_high={:?}",
        descriptor.identity(),
        descriptor.theta_low(),
        descriptor.theta_high()
    );

    match &args.db {
        Some(db) => run_store_cycle(db, &args, descriptor),
        None => run_file_batch(&args, descriptor),
    }
}

fn run_file_batch(args: &Args, descriptor: ModelDescriptor) -> Result<()> {
    let records = match &args.input_csv {
        Some(path) => {
            let records = io::read_records(path)
                .with_context(|| format!("reading input CSV {}", path.display()))?;
            println!("Loaded {} rows from {}", records.len(), path.display());
            records
        }
        None => {
            let records = io::synthetic_records(args.sample_n, SYNTHETIC_SEED);
            println!("Generated {} synthetic rows (uniform [0,1))", records.len());
            records
        }
    };

    let runner = FileRunner::new(descriptor);
    let results = runner.run(records);

    io::write_predictions(&args.output_csv, &results)
        .with_context(|| format!("writing predictions to {}", args.output_csv.display()))?;
    println!(
        "Wrote {} predictions to {}",
        results.len(),
        args.output_csv.display()
    );
    Ok(())
}

fn run_store_cycle(db: &Path, args: &Args, descriptor: ModelDescriptor) -> Result<()> {
    let mut store = SqliteStore::new(db);

    if let Some(n) = args.seed_n {
        let mut rng = StdRng::seed_from_u64(SYNTHETIC_SEED);
        for _ in 0..n {
            store.insert_observation(rng.gen_range(0.0..100.0))?;
        }
        println!("Inserted {} synthetic observations", n);
    }
    info!("{} records pending", store.unprocessed_count()?);

    let mut runner = BatchRunner::new(store, descriptor);
    let processed = runner.run_cycle()?;
    println!("Processed {} records", processed);
    Ok(())
}
