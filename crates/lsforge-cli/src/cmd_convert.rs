use std::path::{Path, PathBuf};

use anyhow::Context as _;
use lsforge_codec::{lsj, lsx};
use lsforge_formats::{Dialect, FileFormat, from_extension};
use lsforge_runner::RunStatus;

use crate::Context;
use crate::exit_codes;
use crate::progress::printing_sink;

/// Arguments for `lsforge convert`.
///
/// Formats are inferred from the file extensions; `--input-format` /
/// `--output-format` override the inference. Conversions between the
/// textual and JSON dialects run in-process; anything touching a binary
/// format goes through the external converter.
#[derive(clap::Args)]
pub struct ConvertArgs {
    /// Source file.
    pub source: PathBuf,

    /// Destination file; its extension selects the target format.
    pub destination: PathBuf,

    /// Override the detected source format (lsx, lsj, lsf, loca, ...).
    #[arg(long)]
    pub input_format: Option<String>,

    /// Override the target format implied by the destination extension.
    #[arg(long)]
    pub output_format: Option<String>,
}

pub async fn run(args: &ConvertArgs, ctx: &Context) -> anyhow::Result<i32> {
    let from = format_name(&args.source, args.input_format.as_deref());
    let to = format_name(&args.destination, args.output_format.as_deref());

    // Text-dialect pairs need no external tooling.
    if let (Some(from_dialect), Some(to_dialect)) = (local_dialect(&from), local_dialect(&to)) {
        return convert_locally(args, from_dialect, to_dialect);
    }

    let converter = ctx.converter()?;
    let (sink, printer) = printing_sink();
    let outcome = converter
        .convert_resource(&args.source, &args.destination, &from, &to, &sink, &ctx.cancel)
        .await?;
    drop(sink);
    let _ = printer.await;

    match outcome.status {
        RunStatus::Completed => {
            println!(
                "Converted {} -> {}",
                args.source.display(),
                args.destination.display()
            );
            Ok(exit_codes::SUCCESS)
        }
        RunStatus::Cancelled => {
            eprintln!("conversion cancelled");
            Ok(exit_codes::CANCELLED)
        }
        _ => {
            eprintln!("conversion failed: {}", outcome.output());
            let detail = outcome.merged();
            if !detail.is_empty() {
                eprintln!("{detail}");
            }
            Ok(exit_codes::FAILURE)
        }
    }
}

fn convert_locally(args: &ConvertArgs, from: Dialect, to: Dialect) -> anyhow::Result<i32> {
    let text = std::fs::read_to_string(&args.source)
        .with_context(|| format!("reading {}", args.source.display()))?;

    let doc = match from {
        Dialect::Json => lsj::parse(&text)?,
        _ => lsx::parse(&text)?,
    };

    let emitted = match to {
        Dialect::Json => lsj::emit(&doc)?,
        _ => lsx::emit(&doc),
    };

    std::fs::write(&args.destination, emitted)
        .with_context(|| format!("writing {}", args.destination.display()))?;
    println!(
        "Converted {} -> {}",
        args.source.display(),
        args.destination.display()
    );
    Ok(exit_codes::SUCCESS)
}

/// Format name from an override or the file extension.
fn format_name(path: &Path, explicit: Option<&str>) -> String {
    if let Some(name) = explicit {
        return name.to_ascii_lowercase();
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map_or_else(|| "lsx".to_string(), str::to_ascii_lowercase)
}

/// The in-process dialect for a format name, if conversion does not need
/// the external tool.
fn local_dialect(format: &str) -> Option<Dialect> {
    match from_extension(format).and_then(FileFormat::dialect) {
        Some(dialect @ (Dialect::Textual | Dialect::Json)) => Some(dialect),
        _ => None,
    }
}
