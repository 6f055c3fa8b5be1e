use std::path::PathBuf;

use anyhow::bail;
use clap::Subcommand;
use lsforge_runner::{RunOutcome, RunStatus};

use crate::Context;
use crate::exit_codes;
use crate::progress::printing_sink;

/// Arguments for `lsforge model`.
///
/// Model transcoding is entirely the external converter's work; this
/// command only shapes the invocation. Formats are taken from the file
/// extensions (`.gr2`, `.dae`, ...).
#[derive(clap::Args)]
pub struct ModelArgs {
    #[command(subcommand)]
    pub command: ModelCommand,
}

/// Named option bundles for the common model workflows.
///
/// ```text
/// ┌───────────────┬─────────────┬──────────────────────────────────┐
/// │ Preset        │ Direction   │ Options                          │
/// ├───────────────┼─────────────┼──────────────────────────────────┤
/// │ bg3-export    │ gr2 → dae   │ normals/tangents/uvs/colors,     │
/// │               │             │ flip-uvs, y-up-skeletons         │
/// │ bg3-import    │ dae → gr2   │ dedup vertices, compact tris,    │
/// │               │             │ dummy skeleton, basis transforms │
/// │ modern-export │ gr2 → gltf  │ normals/tangents/uvs/colors      │
/// └───────────────┴─────────────┴──────────────────────────────────┘
/// ```
const PRESETS: [(&str, &[(&str, &str)]); 3] = [
    (
        "bg3-export",
        &[
            ("input-format", "gr2"),
            ("output-format", "dae"),
            ("export-normals", "true"),
            ("export-tangents", "true"),
            ("export-uvs", "true"),
            ("export-colors", "true"),
            ("flip-uvs", "true"),
            ("y-up-skeletons", "true"),
        ],
    ),
    (
        "bg3-import",
        &[
            ("input-format", "dae"),
            ("output-format", "gr2"),
            ("deduplicate-vertices", "true"),
            ("compact-tris", "true"),
            ("build-dummy-skeleton", "true"),
            ("apply-basis-transforms", "true"),
        ],
    ),
    (
        "modern-export",
        &[
            ("input-format", "gr2"),
            ("output-format", "gltf"),
            ("export-normals", "true"),
            ("export-tangents", "true"),
            ("export-uvs", "true"),
            ("export-colors", "true"),
        ],
    ),
];

#[derive(Subcommand)]
pub enum ModelCommand {
    /// Convert one model file.
    Convert {
        source: PathBuf,
        destination: PathBuf,
        /// Apply a named option bundle: bg3-export, bg3-import, or
        /// modern-export.
        #[arg(long)]
        preset: Option<String>,
        /// Extra converter flags as `key=value` pairs
        /// (e.g. `conform-path=Z:\...`). Applied after any preset.
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
    /// Convert every model of one format under a directory.
    ConvertAll {
        source_dir: PathBuf,
        destination_dir: PathBuf,
        /// Input model format (e.g. gr2).
        #[arg(long)]
        from: String,
        /// Output model format (e.g. dae).
        #[arg(long)]
        to: String,
    },
}

pub async fn run(args: &ModelArgs, ctx: &Context) -> anyhow::Result<i32> {
    let converter = ctx.converter()?;
    let (sink, printer) = printing_sink();

    let outcome = match &args.command {
        ModelCommand::Convert {
            source,
            destination,
            preset,
            options,
        } => {
            let mut all_options = Vec::new();
            if let Some(name) = preset {
                let Some((_, bundle)) = PRESETS.iter().find(|(p, _)| *p == name.as_str()) else {
                    let known: Vec<&str> = PRESETS.iter().map(|(p, _)| *p).collect();
                    bail!("unknown preset {name:?}; available: {}", known.join(", "));
                };
                all_options.extend(
                    bundle
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
                );
            }
            all_options.extend(parse_options(options)?);
            converter
                .convert_model(source, destination, &all_options, &sink, &ctx.cancel)
                .await?
        }
        ModelCommand::ConvertAll {
            source_dir,
            destination_dir,
            from,
            to,
        } => {
            std::fs::create_dir_all(destination_dir)?;
            converter
                .convert_models(source_dir, destination_dir, from, to, &sink, &ctx.cancel)
                .await?
        }
    };
    drop(sink);
    let _ = printer.await;

    report(&outcome)
}

fn parse_options(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    let mut options = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("option must be key=value, got {entry:?}");
        };
        options.push((key.to_string(), value.to_string()));
    }
    Ok(options)
}

fn report(outcome: &RunOutcome) -> anyhow::Result<i32> {
    match outcome.status {
        RunStatus::Completed => {
            println!("Done");
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
