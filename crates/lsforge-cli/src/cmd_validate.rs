use std::path::PathBuf;

use lsforge_pipeline::{get_mod_summary, validate_mod_structure};

use crate::Context;
use crate::exit_codes;

/// Arguments for `lsforge validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Mod directory to validate.
    pub directory: PathBuf,

    /// Emit the full report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print a one-screen summary instead of the full report.
    #[arg(long)]
    pub summary: bool,
}

pub fn run(args: &ValidateArgs, _ctx: &Context) -> anyhow::Result<i32> {
    if args.summary {
        let summary = get_mod_summary(&args.directory);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            let status = if summary.valid { "Valid" } else { "Invalid" };
            println!("{status}: {}", summary.description);
            println!(
                "{} structural elements, {} warnings, {} errors",
                summary.structure_count, summary.warning_count, summary.error_count
            );
        }
        return Ok(if summary.valid {
            exit_codes::SUCCESS
        } else {
            exit_codes::FAILURE
        });
    }

    let report = validate_mod_structure(&args.directory);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in &report.structure {
            println!("  {line}");
        }
        for warning in &report.warnings {
            println!("warning: {warning}");
        }
        for error in &report.errors {
            eprintln!("error: {error}");
        }
        for (folder, metadata) in &report.metadata {
            println!("metadata [{folder}]:");
            for (field, value) in metadata {
                println!("  {field} = {value}");
            }
        }
        println!("{}", if report.valid { "VALID" } else { "INVALID" });
    }

    Ok(if report.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::FAILURE
    })
}
