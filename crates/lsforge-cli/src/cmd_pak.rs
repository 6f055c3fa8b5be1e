use std::path::PathBuf;

use anyhow::bail;
use clap::Subcommand;
use lsforge_pipeline::{Compression, PackageOptions, PakFilter, PakOperations};
use lsforge_runner::{RunOutcome, RunStatus};

use crate::Context;
use crate::exit_codes;
use crate::progress::printing_sink;

/// Arguments for `lsforge pak`.
///
/// All package operations delegate to the external converter; the
/// archive format itself is opaque to this toolkit. Filters are passed
/// through to the converter as glob (default) or regex expressions over
/// packaged paths.
#[derive(clap::Args)]
pub struct PakArgs {
    #[command(subcommand)]
    pub command: PakCommand,
}

#[derive(Subcommand)]
pub enum PakCommand {
    /// Extract a package into a directory.
    Extract {
        package: PathBuf,
        destination: PathBuf,
        /// Only extract entries matching this expression.
        #[arg(long)]
        expression: Option<String>,
        /// Treat the expression as a regex instead of a glob.
        #[arg(long)]
        use_regex: bool,
    },
    /// Create a package from a directory.
    Create {
        source: PathBuf,
        package: PathBuf,
        /// Compression method: none, zlib, zlibfast, lz4, lz4hc.
        #[arg(long, default_value = "lz4hc")]
        compression: String,
        /// Load priority recorded in the package (0 = default).
        #[arg(long, default_value_t = 0)]
        priority: u8,
        /// Derive the root folder name from the package name.
        #[arg(long)]
        use_package_name: bool,
    },
    /// List a package's contents.
    List {
        package: PathBuf,
        #[arg(long)]
        expression: Option<String>,
        #[arg(long)]
        use_regex: bool,
    },
    /// Extract one file from a package by its packaged path.
    ExtractFile {
        package: PathBuf,
        packaged_path: String,
        output: PathBuf,
    },
    /// Extract every .pak under a directory, one subdirectory each.
    ExtractAll {
        pak_dir: PathBuf,
        output_base: PathBuf,
        #[arg(long)]
        expression: Option<String>,
    },
    /// Print on-disk facts about a package.
    Info { package: PathBuf },
}

fn filter_from(expression: Option<&String>, use_regex: bool) -> Option<PakFilter> {
    expression.map(|expression| PakFilter {
        expression: expression.clone(),
        use_regex,
    })
}

pub async fn run(args: &PakArgs, ctx: &Context) -> anyhow::Result<i32> {
    // Info is pure stat work; no converter required.
    if let PakCommand::Info { package } = &args.command {
        let info = PakOperations::info(package)?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(exit_codes::SUCCESS);
    }

    let converter = ctx.converter()?;
    let operations = PakOperations::new(&converter);
    let (sink, printer) = printing_sink();

    let outcome = match &args.command {
        PakCommand::Extract {
            package,
            destination,
            expression,
            use_regex,
        } => {
            let filter = filter_from(expression.as_ref(), *use_regex);
            operations
                .extract(package, destination, filter.as_ref(), &sink, &ctx.cancel)
                .await?
        }
        PakCommand::Create {
            source,
            package,
            compression,
            priority,
            use_package_name,
        } => {
            let Some(compression) = Compression::from_name(compression) else {
                bail!(
                    "invalid compression method {compression:?}; available: {}",
                    Compression::names().join(", ")
                );
            };
            let options = PackageOptions {
                compression,
                priority: *priority,
                use_package_name: *use_package_name,
            };
            operations
                .create(source, package, &options, &sink, &ctx.cancel)
                .await?
        }
        PakCommand::List {
            package,
            expression,
            use_regex,
        } => {
            let filter = filter_from(expression.as_ref(), *use_regex);
            let (entries, outcome) = operations
                .list(package, filter.as_ref(), &sink, &ctx.cancel)
                .await?;
            for entry in &entries {
                println!("{entry}");
            }
            outcome
        }
        PakCommand::ExtractFile {
            package,
            packaged_path,
            output,
        } => {
            converter
                .extract_single_file(package, packaged_path, output, &sink, &ctx.cancel)
                .await?
        }
        PakCommand::ExtractAll {
            pak_dir,
            output_base,
            expression,
        } => {
            let filter = filter_from(expression.as_ref(), false);
            let results = operations
                .extract_all(pak_dir, output_base, filter.as_ref(), &sink, &ctx.cancel)
                .await?;
            drop(sink);
            let _ = printer.await;

            let succeeded = results.iter().filter(|r| r.success).count();
            for result in &results {
                let mark = if result.success { "ok" } else { "failed" };
                println!("{mark:6}  {}", result.package.display());
                if !result.success {
                    eprintln!("  {}", result.output);
                }
            }
            println!("{succeeded}/{} packages extracted", results.len());
            return Ok(if succeeded > 0 || results.is_empty() {
                exit_codes::SUCCESS
            } else {
                exit_codes::FAILURE
            });
        }
        PakCommand::Info { .. } => unreachable!("handled above"),
    };
    drop(sink);
    let _ = printer.await;

    report(&outcome)
}

fn report(outcome: &RunOutcome) -> anyhow::Result<i32> {
    match outcome.status {
        RunStatus::Completed => {
            println!("Done");
            Ok(exit_codes::SUCCESS)
        }
        RunStatus::Cancelled => {
            eprintln!("operation cancelled");
            Ok(exit_codes::CANCELLED)
        }
        _ => {
            eprintln!("operation failed: {}", outcome.output());
            let detail = outcome.merged();
            if !detail.is_empty() {
                eprintln!("{detail}");
            }
            Ok(exit_codes::FAILURE)
        }
    }
}
