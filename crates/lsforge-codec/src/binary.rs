//! Binary-dialect codec.
//!
//! The binary tree format is never parsed in-process. Reading converts
//! the file to a textual intermediate with the external converter and
//! parses that; writing emits a textual intermediate and converts it to
//! the requested binary format. Intermediates are `NamedTempFile`s, so
//! they are removed on every exit path — early returns, errors, and
//! panics alike.
//!
//! ```text
//!  read:   foo.lsf ──converter──▶ <temp>.lsx ──lsx::parse──▶ Document
//!  write:  Document ──lsx::emit──▶ <temp>.lsx ──converter──▶ foo.lsf
//! ```

use std::path::Path;

use lsforge_runner::{CancelFlag, Converter, ProgressSink, RunOutcome, RunStatus};
use lsforge_tree::Document;
use tracing::debug;

use crate::error::CodecError;
use crate::lsx;

/// Map a binary extension to the converter's `--input-format` /
/// `--output-format` name. `lsfx` content is the `lsf` format with a
/// newer version stamp; the rest name themselves.
#[must_use]
pub fn converter_format(path: &Path) -> &'static str {
  match path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
    .as_deref()
  {
    Some("lsb") => "lsb",
    Some("lsbs") => "lsbs",
    Some("lsbc") => "lsbc",
    _ => "lsf",
  }
}

/// Read a binary-dialect file into a document.
///
/// # Errors
///
/// Converter failures map onto [`CodecError::ConversionFailed`] /
/// [`CodecError::Cancelled`] / [`CodecError::Timeout`]; the textual
/// intermediate can additionally fail to parse like any LSX input.
pub async fn read_document(
  path: &Path,
  converter: &Converter,
  progress: &ProgressSink,
  cancel: &CancelFlag,
) -> Result<Document, CodecError> {
  let temp = tempfile::Builder::new()
    .prefix("lsforge-read-")
    .suffix(".lsx")
    .tempfile()?;

  debug!(source = %path.display(), "converting binary resource to textual intermediate");
  let outcome = converter
    .convert_resource(
      path,
      temp.path(),
      converter_format(path),
      "lsx",
      progress,
      cancel,
    )
    .await?;
  check_outcome(&outcome)?;

  let text = std::fs::read_to_string(temp.path())?;
  lsx::parse(&text)
}

/// Write a document as a binary-dialect file at `destination`, whose
/// extension selects the concrete binary format.
///
/// # Errors
///
/// See [`read_document`].
pub async fn write_document(
  doc: &Document,
  destination: &Path,
  converter: &Converter,
  progress: &ProgressSink,
  cancel: &CancelFlag,
) -> Result<(), CodecError> {
  let temp = tempfile::Builder::new()
    .prefix("lsforge-write-")
    .suffix(".lsx")
    .tempfile()?;
  std::fs::write(temp.path(), lsx::emit(doc))?;

  let outcome = converter
    .convert_resource(
      temp.path(),
      destination,
      "lsx",
      converter_format(destination),
      progress,
      cancel,
    )
    .await?;
  check_outcome(&outcome)
}

/// Map a converter outcome onto codec errors.
pub(crate) fn check_outcome(outcome: &RunOutcome) -> Result<(), CodecError> {
  match outcome.status {
    RunStatus::Completed => Ok(()),
    RunStatus::Cancelled => Err(CodecError::Cancelled),
    RunStatus::TimedOut | RunStatus::KilledAfterTimeout => Err(CodecError::Timeout),
    RunStatus::Failed => Err(CodecError::ConversionFailed(outcome.output().to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_names_follow_extensions() {
    assert_eq!(converter_format(Path::new("a.lsf")), "lsf");
    assert_eq!(converter_format(Path::new("a.LSFX")), "lsf");
    assert_eq!(converter_format(Path::new("a.lsbs")), "lsbs");
    assert_eq!(converter_format(Path::new("a.lsbc")), "lsbc");
    assert_eq!(converter_format(Path::new("a.lsb")), "lsb");
    assert_eq!(converter_format(Path::new("noext")), "lsf");
  }

  #[test]
  fn outcome_mapping() {
    let outcome = |status| RunOutcome {
      status,
      stdout: String::new(),
      stderr: "broken".to_string(),
    };
    assert!(check_outcome(&outcome(RunStatus::Completed)).is_ok());
    assert!(matches!(
      check_outcome(&outcome(RunStatus::Cancelled)),
      Err(CodecError::Cancelled)
    ));
    assert!(matches!(
      check_outcome(&outcome(RunStatus::TimedOut)),
      Err(CodecError::Timeout)
    ));
    match check_outcome(&outcome(RunStatus::Failed)) {
      Err(CodecError::ConversionFailed(message)) => assert_eq!(message, "broken"),
      other => panic!("expected ConversionFailed, got {other:?}"),
    }
  }
}
