use std::path::PathBuf;

use lsforge_formats::detect_path;

use crate::Context;
use crate::exit_codes;

/// Arguments for `lsforge detect`.
///
/// Classification never fails — unknown or unreadable files print as
/// `unknown`.
#[derive(clap::Args)]
pub struct DetectArgs {
    /// Files to classify.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

pub fn run(args: &DetectArgs, _ctx: &Context) -> anyhow::Result<i32> {
    for path in &args.paths {
        println!("{}: {}", path.display(), detect_path(path));
    }
    Ok(exit_codes::SUCCESS)
}
