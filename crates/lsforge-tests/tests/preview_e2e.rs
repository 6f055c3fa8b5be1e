//! Converter-backed preview paths, end to end against the stub.

use std::sync::Arc;

use lsforge_preview::PreviewEngine;
use lsforge_runner::{CancelFlag, Converter, OperationEvent, ProgressSink};
use lsforge_tests::{SAMPLE_LSX, fake_converter};

fn engine(tools: &tempfile::TempDir) -> PreviewEngine {
    PreviewEngine::new().with_converter(Arc::new(Converter::new(fake_converter(tools.path()))))
}

#[tokio::test]
async fn binary_tree_preview_shows_converted_structure() {
    let tools = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let path = work.path().join("meta.lsf");
    std::fs::write(&path, SAMPLE_LSX).unwrap();

    let record = engine(&tools).preview(&path).await;
    assert!(!record.is_error());
    assert!(record.content.contains("LSF Binary File (converted)"));
    assert!(record.content.contains("BG3 FILE INFO:"));
    assert!(record.content.contains("Regions: 1"));
    assert_eq!(record.metadata["converted"], "true");
    assert_eq!(record.metadata["nodes"], "1");
}

#[tokio::test]
async fn loca_preview_lists_first_entries_with_truncation_notice() {
    let tools = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();

    let mut xml = String::from("<contentList>\n");
    for i in 0..8 {
        xml.push_str(&format!(
            "  <content contentuid=\"h{i:08}\" version=\"1\">String number {i}</content>\n"
        ));
    }
    xml.push_str("</contentList>\n");
    let path = work.path().join("english.loca");
    std::fs::write(&path, xml).unwrap();

    let record = engine(&tools).preview(&path).await;
    assert!(!record.is_error());
    assert!(record.content.contains("Total entries: 8"));
    assert!(record.content.contains("Handle: h00000000"));
    assert!(record.content.contains("String number 4"));
    assert!(!record.content.contains("String number 5"));
    assert!(record.content.contains("... and 3 more entries"));
    assert_eq!(record.metadata["entries"], "8");
}

#[tokio::test]
async fn preview_with_progress_reaches_one_hundred() {
    let tools = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let path = work.path().join("meta.lsf");
    std::fs::write(&path, SAMPLE_LSX).unwrap();

    let (sink, mut rx) = ProgressSink::channel();
    let record = engine(&tools)
        .preview_with_progress(&path, &sink, &CancelFlag::new())
        .await;
    drop(sink);
    assert!(!record.is_error());

    let mut last = 0;
    let mut saw_done = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            OperationEvent::Progress { percent, .. } => {
                assert!(percent >= last, "progress went backwards");
                last = percent;
            }
            OperationEvent::Done { success, .. } => saw_done = success,
        }
    }
    assert_eq!(last, 100);
    assert!(saw_done);
}
