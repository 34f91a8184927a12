use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use marksheet::{build_standard_pipeline, AnswerKey, BatchError, BatchRunner, MarksheetConfig};

#[derive(Parser)]
#[command(name = "marksheet")]
#[command(about = "Decode scanned mark sheets and score them against an answer key")]
struct Cli {
    /// Directory containing the scanned sheets
    #[arg(short, long, value_name = "DIR")]
    input: PathBuf,

    /// CSV file to write `number,score` rows to
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Answer key CSV (header row, then one row per question)
    #[arg(short, long, value_name = "FILE")]
    answer: PathBuf,

    /// Binarization threshold for both the marker and the bubble pass
    #[arg(short, long)]
    thresh: Option<u8>,

    /// Threshold for the marker pass only (overrides --thresh)
    #[arg(long)]
    marker_thresh: Option<u8>,

    /// Accepted file extensions
    #[arg(short, long, num_args = 1..)]
    ext: Option<Vec<String>>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write an annotated copy of each sheet to this directory
    #[arg(long, value_name = "DIR")]
    preview_dir: Option<PathBuf>,

    /// Save intermediate images of every step to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let mut config = MarksheetConfig::load(args.config.as_deref())?;
    if let Some(thresh) = args.thresh {
        config.thresholds.marker = thresh;
        config.thresholds.answer = thresh;
    }
    if let Some(thresh) = args.marker_thresh {
        config.thresholds.marker = thresh;
    }
    if let Some(ext) = args.ext {
        config.batch.extensions = ext;
    }

    // A bad key stops everything before any sheet is touched
    let key = AnswerKey::from_path(&args.answer, &config.layout)
        .map_err(BatchError::from)
        .with_context(|| format!("Answer key {}", args.answer.display()))?;
    let key = Arc::new(key);

    let mut pipeline = build_standard_pipeline(&config, key.clone());
    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let mut runner = BatchRunner::new(&config, key).with_pipeline(pipeline);
    if let Some(dir) = args.preview_dir {
        runner = runner.with_preview_dir(dir);
    }

    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Stop requested; finishing sheets in progress");
            cancel.cancel();
        }
    });

    let report = runner.run(&args.input).await?;

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    marksheet::batch::write_results_csv(BufWriter::new(file), &report.results)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("\n=== Mark Sheet Results ===");
    println!("{}", report.summary());
    if !report.failures.is_empty() {
        println!("\nFailed sheets:");
        for failure in &report.failures {
            println!("  {}", failure);
        }
    }
    println!("\nResults written to {}", args.output.display());

    Ok(())
}
