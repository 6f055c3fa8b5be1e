use crate::Context;
use crate::exit_codes;

/// Arguments for `lsforge doctor`.
///
/// Reports whether the external converter, the emulation binary, and
/// the emulation prefix are all present and usable.
#[derive(clap::Args)]
pub struct DoctorArgs {}

pub fn run(_args: &DoctorArgs, ctx: &Context) -> anyhow::Result<i32> {
    let converter = match ctx.converter() {
        Ok(converter) => converter,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Configure `converter` in lsforge.toml or pass --converter.");
            return Ok(exit_codes::TOOL_MISSING);
        }
    };

    let report = converter.validate_setup();
    for message in &report.messages {
        println!("{message}");
    }

    if report.ok() {
        println!("Setup looks usable.");
        Ok(exit_codes::SUCCESS)
    } else if report.converter_found {
        Ok(exit_codes::FAILURE)
    } else {
        Ok(exit_codes::TOOL_MISSING)
    }
}
