//! Binary-dialect round-trips through the fake converter.
//!
//! The stub "converts" by copying, so feeding it textual bytes under a
//! binary extension exercises the whole convert-then-parse pipeline
//! without the real tool.

use lsforge_codec::{CodecError, binary, lsx};
use lsforge_runner::{CancelFlag, Converter, ProgressSink};
use lsforge_tests::{SAMPLE_LSX, fake_converter, sample_document};

#[tokio::test]
async fn read_document_converts_then_parses() {
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let work = tempfile::tempdir().unwrap();
    let source = work.path().join("meta.lsf");
    std::fs::write(&source, SAMPLE_LSX).unwrap();

    let doc = binary::read_document(
        &source,
        &converter,
        &ProgressSink::disabled(),
        &CancelFlag::new(),
    )
    .await
    .unwrap();
    assert_eq!(doc, sample_document());
}

#[tokio::test]
async fn write_document_emits_then_converts() {
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let work = tempfile::tempdir().unwrap();
    let destination = work.path().join("out.lsf");

    binary::write_document(
        &sample_document(),
        &destination,
        &converter,
        &ProgressSink::disabled(),
        &CancelFlag::new(),
    )
    .await
    .unwrap();

    // The stub copied the textual intermediate verbatim.
    let written = std::fs::read_to_string(&destination).unwrap();
    assert_eq!(lsx::parse(&written).unwrap(), sample_document());
}

#[tokio::test]
async fn converter_failure_is_a_conversion_error() {
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let work = tempfile::tempdir().unwrap();
    let source = work.path().join("will-fail.lsf");
    std::fs::write(&source, SAMPLE_LSX).unwrap();

    let result = binary::read_document(
        &source,
        &converter,
        &ProgressSink::disabled(),
        &CancelFlag::new(),
    )
    .await;
    assert!(matches!(result, Err(CodecError::ConversionFailed(_))));
}

#[tokio::test]
async fn cancelled_read_reports_cancellation() {
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let work = tempfile::tempdir().unwrap();
    let source = work.path().join("meta.lsf");
    std::fs::write(&source, SAMPLE_LSX).unwrap();

    let cancel = CancelFlag::new();
    cancel.cancel();
    let result =
        binary::read_document(&source, &converter, &ProgressSink::disabled(), &cancel).await;
    assert!(matches!(result, Err(CodecError::Cancelled)));
}
