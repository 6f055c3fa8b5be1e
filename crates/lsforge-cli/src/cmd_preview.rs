use std::path::PathBuf;
use std::sync::Arc;

use lsforge_preview::{PreviewEngine, PreviewManager};
use lsforge_runner::ProgressSink;

use crate::Context;
use crate::exit_codes;
use crate::progress::printing_sink;

/// Arguments for `lsforge preview`.
///
/// Previews degrade gracefully without a converter: binary trees and
/// localization tables fall back to raw-bytes analysis instead of
/// converted structure.
#[derive(clap::Args)]
pub struct PreviewArgs {
    /// Files to preview.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Emit records as JSON instead of the text body.
    #[arg(long)]
    pub json: bool,

    /// Bypass the preview cache.
    #[arg(long)]
    pub no_cache: bool,
}

pub async fn run(args: &PreviewArgs, ctx: &Context) -> anyhow::Result<i32> {
    // The converter is optional here; previews that need it degrade.
    let engine = match ctx.converter() {
        Ok(converter) => PreviewEngine::new().with_converter(Arc::new(converter)),
        Err(_) => PreviewEngine::new(),
    };
    let manager = PreviewManager::new(engine, ctx.config.cache_capacity());

    let mut any_ok = false;
    let mut records = Vec::new();
    for path in &args.paths {
        let (sink, printer) = if ctx.verbose {
            let (sink, printer) = printing_sink();
            (sink, Some(printer))
        } else {
            (ProgressSink::disabled(), None)
        };

        let record = manager
            .get_preview(path, !args.no_cache, &sink, &ctx.cancel)
            .await;
        drop(sink);
        if let Some(printer) = printer {
            let _ = printer.await;
        }

        any_ok |= !record.is_error();
        if args.json {
            records.push(record);
        } else {
            println!("{}", record.content);
            if let Some(error) = &record.error {
                eprintln!("preview error: {error}");
            }
            println!();
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    if ctx.cancel.is_cancelled() {
        Ok(exit_codes::CANCELLED)
    } else if any_ok {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::FAILURE)
    }
}
