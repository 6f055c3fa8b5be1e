/// lsforge — cross-format asset toolkit for BG3 modding.
///
/// # Command overview
///
/// ```text
/// lsforge <COMMAND> [OPTIONS]
///
/// Commands:
///   convert    Convert one resource file between dialects
///   batch      Convert many files over a bounded worker pool
///   preview    Print a structured preview of a file
///   validate   Validate a mod directory's structure
///   prepare    Stage a workspace, performing pending conversions
///   detect     Classify files by extension/magic/content
///   model      3D-model transcoding via the external converter
///   pak        Package operations via the external converter
///   doctor     Check converter/emulator/prefix health
///
/// Global options:
///   --config <FILE>      TOML config (default: ./lsforge.toml)
///   --converter <FILE>   External converter executable
///   -v, --verbose        Verbose output and debug logging
/// ```
///
/// # Exit codes
///
/// | Code | Meaning               |
/// |------|-----------------------|
/// | 0    | Success               |
/// | 1    | Generic failure       |
/// | 2    | Invalid arguments     |
/// | 3    | Missing external tool |
/// | 4    | Cancelled             |
///
/// Errors go to stderr so stdout stays pipeable.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use lsforge_runner::{CancelFlag, Converter, RunnerError};
use tracing_subscriber::EnvFilter;

mod cmd_batch;
mod cmd_convert;
mod cmd_detect;
mod cmd_doctor;
mod cmd_model;
mod cmd_pak;
mod cmd_prepare;
mod cmd_preview;
mod cmd_validate;
mod config;
mod exit_codes;
mod progress;

use config::Config;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// The lsforge command-line tool.
#[derive(Parser)]
#[command(name = "lsforge", version, about = "BG3 asset format pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file. Defaults to ./lsforge.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the external converter executable (overrides the config).
    #[arg(long, global = true)]
    converter: Option<PathBuf>,

    /// Enable verbose output and debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Convert one resource file between dialects.
    Convert(cmd_convert::ConvertArgs),
    /// Convert many files concurrently.
    Batch(cmd_batch::BatchArgs),
    /// Print a structured preview of one or more files.
    Preview(cmd_preview::PreviewArgs),
    /// Validate a mod directory's structure and metadata.
    Validate(cmd_validate::ValidateArgs),
    /// Stage a workspace for packaging, converting composite-named files.
    Prepare(cmd_prepare::PrepareArgs),
    /// Classify files by extension, magic bytes, and content.
    Detect(cmd_detect::DetectArgs),
    /// 3D-model transcoding via the external converter.
    Model(cmd_model::ModelArgs),
    /// Package archive operations.
    Pak(cmd_pak::PakArgs),
    /// Check that the external tooling is usable.
    Doctor(cmd_doctor::DoctorArgs),
}

/// Everything commands need beyond their own arguments.
pub struct Context {
    pub config: Config,
    converter_override: Option<PathBuf>,
    pub cancel: CancelFlag,
    pub verbose: bool,
}

impl Context {
    /// Build the converter handle on demand.
    ///
    /// # Errors
    ///
    /// [`RunnerError::ToolMissing`] — mapped onto exit code 3 in `main`.
    pub fn converter(&self) -> Result<Converter, RunnerError> {
        self.config.build_converter(self.converter_override.as_deref())
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(exit_codes::FAILURE);
        }
    };

    let cancel = CancelFlag::new();
    {
        // First Ctrl-C requests cooperative cancellation; commands map
        // the observed cancellation onto exit code 4.
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("cancelling...");
                cancel.cancel();
            }
        });
    }

    let ctx = Context {
        config,
        converter_override: cli.converter.clone(),
        cancel,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Convert(args) => cmd_convert::run(&args, &ctx).await,
        Commands::Batch(args) => cmd_batch::run(&args, &ctx).await,
        Commands::Preview(args) => cmd_preview::run(&args, &ctx).await,
        Commands::Validate(args) => cmd_validate::run(&args, &ctx),
        Commands::Prepare(args) => cmd_prepare::run(&args, &ctx).await,
        Commands::Detect(args) => cmd_detect::run(&args, &ctx),
        Commands::Model(args) => cmd_model::run(&args, &ctx).await,
        Commands::Pak(args) => cmd_pak::run(&args, &ctx).await,
        Commands::Doctor(args) => cmd_doctor::run(&args, &ctx),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = match e.downcast_ref::<RunnerError>() {
                Some(RunnerError::ToolMissing { .. }) => exit_codes::TOOL_MISSING,
                _ => exit_codes::FAILURE,
            };
            process::exit(code);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("LSFORGE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
