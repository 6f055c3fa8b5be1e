use std::path::PathBuf;

use lsforge_pipeline::{Orchestrator, PipelineError};

use crate::Context;
use crate::exit_codes;
use crate::progress::printing_sink;

/// Arguments for `lsforge prepare`.
///
/// Stages a source workspace: composite-named files
/// (`foo.lsf.lsx` and friends) are converted to their binary targets in
/// a temporary copy; the source tree is never modified. Optionally
/// packages the staged result.
#[derive(clap::Args)]
pub struct PrepareArgs {
    /// Workspace to prepare.
    pub source: PathBuf,

    /// Keep the staging directory instead of removing it, and print its
    /// path.
    #[arg(long)]
    pub keep: bool,

    /// Create a package archive from the prepared workspace.
    #[arg(long)]
    pub pack: Option<PathBuf>,
}

pub async fn run(args: &PrepareArgs, ctx: &Context) -> anyhow::Result<i32> {
    let converter = ctx.converter()?;
    let orchestrator = Orchestrator::new(&converter);

    let (sink, printer) = printing_sink();
    let prep = match orchestrator
        .prepare_workspace(&args.source, &sink, &ctx.cancel)
        .await
    {
        Ok(prep) => prep,
        Err(PipelineError::Cancelled) => {
            eprintln!("preparation cancelled");
            return Ok(exit_codes::CANCELLED);
        }
        Err(e) => return Err(e.into()),
    };
    drop(sink);
    let _ = printer.await;

    for conversion in &prep.conversions {
        let mark = if conversion.success { "ok" } else { "failed" };
        println!("{mark:6}  {}", conversion.target.display());
    }
    for error in &prep.errors {
        eprintln!("error: {error}");
    }

    let total = prep.conversions.len();
    let succeeded = prep.succeeded();
    if total > 0 {
        println!("Converted {succeeded}/{total} files");
    } else {
        println!("No pending conversions; workspace is ready as-is");
    }

    if let Some(package) = &args.pack {
        let (sink, printer) = printing_sink();
        let outcome = converter
            .create_package(&prep.staging_root, package, &sink, &ctx.cancel)
            .await?;
        drop(sink);
        let _ = printer.await;
        if outcome.success() {
            println!("Created {}", package.display());
        } else {
            eprintln!("packaging failed: {}", outcome.output());
            let _ = prep.cleanup();
            return Ok(if ctx.cancel.is_cancelled() {
                exit_codes::CANCELLED
            } else {
                exit_codes::FAILURE
            });
        }
    }

    let owns_staging = prep.owns_staging;
    if args.keep && owns_staging {
        let staging = prep.persist();
        println!("Staging kept at {}", staging.display());
    } else {
        prep.cleanup()?;
    }

    if ctx.cancel.is_cancelled() {
        Ok(exit_codes::CANCELLED)
    } else if total > 0 && succeeded == 0 {
        Ok(exit_codes::FAILURE)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}
