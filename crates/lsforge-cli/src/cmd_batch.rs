use std::path::PathBuf;
use std::sync::Arc;

use lsforge_pipeline::{BatchDriver, BatchRequest, BatchStatus};

use crate::Context;
use crate::exit_codes;
use crate::progress::printing_sink;

/// Arguments for `lsforge batch`.
///
/// Every source converts independently against the external converter
/// over a bounded worker pool; the batch succeeds overall when at least
/// one file converted.
#[derive(clap::Args)]
pub struct BatchArgs {
    /// Source files to convert.
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Target format (lsf, lsx, lsj, ...).
    #[arg(long)]
    pub to: String,

    /// Directory for converted files. Defaults to each source's
    /// directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Worker pool size. Defaults to the configured worker count.
    #[arg(long)]
    pub jobs: Option<usize>,
}

pub async fn run(args: &BatchArgs, ctx: &Context) -> anyhow::Result<i32> {
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let converter = Arc::new(ctx.converter()?);
    let driver = BatchDriver::new(converter).with_workers(args.jobs.unwrap_or(ctx.config.workers()));

    let requests: Vec<BatchRequest> = args
        .sources
        .iter()
        .map(|source| BatchRequest {
            source: source.clone(),
            target_format: args.to.to_ascii_lowercase(),
        })
        .collect();

    let (sink, printer) = printing_sink();
    let results = driver
        .run(requests, args.output_dir.as_deref(), &sink, &ctx.cancel)
        .await;
    drop(sink);
    let _ = printer.await;

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut cancelled = 0usize;
    for result in &results {
        match result.status {
            BatchStatus::Succeeded => {
                succeeded += 1;
                println!(
                    "ok      {} -> {}",
                    result.source.display(),
                    result.target.display()
                );
            }
            BatchStatus::Cancelled => {
                cancelled += 1;
                println!("skip    {} (cancelled)", result.source.display());
            }
            _ => {
                failed += 1;
                println!("failed  {}", result.source.display());
                eprintln!("  {}", result.output);
            }
        }
    }
    println!("{succeeded} succeeded, {failed} failed, {cancelled} cancelled");

    if ctx.cancel.is_cancelled() {
        return Ok(exit_codes::CANCELLED);
    }
    if succeeded > 0 || results.is_empty() {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::FAILURE)
    }
}
