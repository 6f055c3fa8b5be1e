//! Workspace-preparation tests against the fake converter stub.

use lsforge_pipeline::Orchestrator;
use lsforge_runner::{CancelFlag, Converter, OperationEvent, ProgressSink};
use lsforge_tests::{SAMPLE_LSX, fake_converter, hash_tree};

fn workspace(dir: &std::path::Path, files: &[&str]) {
    for file in files {
        let path = dir.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, SAMPLE_LSX).unwrap();
    }
}

#[tokio::test]
async fn staging_contains_target_not_source() {
    // S2: Mods/Foo/meta.lsf.lsx becomes Mods/Foo/meta.lsf in staging.
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let source = tempfile::tempdir().unwrap();
    workspace(source.path(), &["Mods/Foo/meta.lsf.lsx"]);
    let before = hash_tree(source.path());

    let prep = Orchestrator::new(&converter)
        .prepare_workspace(source.path(), &ProgressSink::disabled(), &CancelFlag::new())
        .await
        .unwrap();

    assert!(prep.owns_staging);
    assert!(prep.staging_root.join("Mods/Foo/meta.lsf").is_file());
    assert!(!prep.staging_root.join("Mods/Foo/meta.lsf.lsx").exists());
    assert_eq!(prep.succeeded(), 1);
    assert!(prep.errors.is_empty());

    // The source tree is bit-identical to before.
    assert_eq!(hash_tree(source.path()), before);
    prep.cleanup().unwrap();
}

#[tokio::test]
async fn failures_accumulate_and_source_stays_untouched() {
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let source = tempfile::tempdir().unwrap();
    workspace(
        source.path(),
        &[
            "Mods/Foo/good.lsf.lsx",
            "Mods/Foo/will-fail.lsf.lsx", // the stub rejects *fail*
            "Mods/Foo/other.lsb.lsx",
        ],
    );
    let before = hash_tree(source.path());

    let prep = Orchestrator::new(&converter)
        .prepare_workspace(source.path(), &ProgressSink::disabled(), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(prep.conversions.len(), 3);
    assert_eq!(prep.succeeded(), 2);
    assert_eq!(prep.errors.len(), 1);
    assert!(prep.errors[0].contains("will-fail.lsf.lsx"));

    // The failed source remains in staging (nothing replaced it); the
    // successful ones were converted and removed.
    assert!(prep.staging_root.join("Mods/Foo/will-fail.lsf.lsx").is_file());
    assert!(prep.staging_root.join("Mods/Foo/good.lsf").is_file());
    assert!(!prep.staging_root.join("Mods/Foo/good.lsf.lsx").exists());

    assert_eq!(hash_tree(source.path()), before);
    prep.cleanup().unwrap();
}

#[tokio::test]
async fn no_jobs_borrows_the_source_root() {
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let source = tempfile::tempdir().unwrap();
    workspace(source.path(), &["Mods/Foo/meta.lsx"]);

    let prep = Orchestrator::new(&converter)
        .prepare_workspace(source.path(), &ProgressSink::disabled(), &CancelFlag::new())
        .await
        .unwrap();

    assert!(!prep.owns_staging);
    assert_eq!(prep.staging_root, source.path());
    prep.cleanup().unwrap();
    assert!(source.path().join("Mods/Foo/meta.lsx").is_file());
}

#[tokio::test]
async fn cleanup_removes_owned_staging() {
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let source = tempfile::tempdir().unwrap();
    workspace(source.path(), &["a.lsf.lsx"]);

    let prep = Orchestrator::new(&converter)
        .prepare_workspace(source.path(), &ProgressSink::disabled(), &CancelFlag::new())
        .await
        .unwrap();
    let staging = prep.staging_root.clone();
    assert!(staging.exists());
    prep.cleanup().unwrap();
    assert!(!staging.exists());
}

#[tokio::test]
async fn progress_follows_the_documented_envelope() {
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let source = tempfile::tempdir().unwrap();
    workspace(source.path(), &["a.lsf.lsx", "b.lsf.lsx"]);

    let (sink, mut rx) = ProgressSink::channel();
    let prep = Orchestrator::new(&converter)
        .prepare_workspace(source.path(), &sink, &CancelFlag::new())
        .await
        .unwrap();
    prep.cleanup().unwrap();

    let mut percents = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let OperationEvent::Progress { percent, .. } = event {
            percents.push(percent);
        }
    }
    assert_eq!(percents.first(), Some(&5));
    assert!(percents.contains(&10));
    assert!(percents.contains(&95));
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "monotonic: {percents:?}");
}

#[tokio::test]
async fn pre_cancelled_preparation_leaves_no_staging_behind() {
    let tools = tempfile::tempdir().unwrap();
    let converter = Converter::new(fake_converter(tools.path()));

    let source = tempfile::tempdir().unwrap();
    workspace(source.path(), &["a.lsf.lsx"]);
    let before = hash_tree(source.path());

    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = Orchestrator::new(&converter)
        .prepare_workspace(source.path(), &ProgressSink::disabled(), &cancel)
        .await;

    assert!(matches!(result, Err(lsforge_pipeline::PipelineError::Cancelled)));
    assert_eq!(hash_tree(source.path()), before);
}
