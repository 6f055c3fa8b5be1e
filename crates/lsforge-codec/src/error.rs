use lsforge_runner::RunnerError;

/// Errors from parsing or emitting any of the tree dialects.
///
/// Malformed input of any shape must land here — the codecs are
/// fuzz-safe and never panic on hostile bytes. The binary dialect adds
/// the external-converter failure modes on top of the parse errors,
/// since it round-trips through the textual dialect via the converter.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
  /// The XML parser rejected the input.
  #[error("XML parse error: {0}")]
  Xml(#[from] quick_xml::Error),

  /// An XML attribute list was malformed.
  #[error("XML attribute error: {0}")]
  XmlAttr(#[from] quick_xml::events::attributes::AttrError),

  /// The JSON parser rejected the input.
  #[error("JSON parse error: {0}")]
  Json(#[from] serde_json::Error),

  /// Well-formed input that does not follow the dialect's structure
  /// (missing ids, wrong top-level shape, truncated documents).
  #[error("invalid document structure: {0}")]
  Invalid(String),

  /// The external converter exited nonzero during a binary round-trip.
  #[error("conversion failed: {0}")]
  ConversionFailed(String),

  /// Cooperative cancellation was observed mid-conversion.
  #[error("cancelled")]
  Cancelled,

  /// The external converter exceeded its deadline.
  #[error("timeout")]
  Timeout,

  #[error(transparent)]
  Runner(#[from] RunnerError),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
