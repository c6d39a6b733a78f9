//! kmeanspp: k-means++ seeding over two inner-joined data files
//!
//! This is the main entrypoint: it sets up logging, interprets the positional
//! arguments and hands off to the library pipeline. Results go to stdout,
//! logs to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use kmeanspp::{run_pipeline, Args, Outcome, PipelineOptions};
use std::io;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<ExitCode> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    let invocation = args.invocation().context("An Error Has Occurred")?;
    let options = PipelineOptions {
        weighting: args.weighting,
        seed: args.seed,
        refiner: None,
    }
    .with_refine_mode(args.refine);

    let start_time = Instant::now();
    let stdout = io::stdout();
    let outcome = run_pipeline(&invocation, &options, &mut stdout.lock())
        .context("An Error Has Occurred")?;

    let elapsed = start_time.elapsed();
    match outcome {
        Outcome::Completed(report) => {
            info!(
                n_points = report.n_points,
                k = report.seeded.len(),
                refined = report.refined.is_some(),
                elapsed_ms = elapsed.as_millis() as u64,
                "pipeline complete"
            );
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Rejected(_) => Ok(ExitCode::FAILURE),
    }
}

/// Setup logging based on verbosity; without `-v` honour `RUST_LOG`
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}
