//! Package-operation tests against the fake converter stub.

use lsforge_pipeline::{Compression, PackageOptions, PakFilter, PakOperations};
use lsforge_runner::{CancelFlag, Converter, ProgressSink};
use lsforge_tests::fake_converter;

fn converter(tools: &tempfile::TempDir) -> Converter {
    Converter::new(fake_converter(tools.path()))
}

#[tokio::test]
async fn list_returns_packaged_paths() {
    let tools = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let pak = work.path().join("Example.pak");
    std::fs::write(&pak, b"opaque").unwrap();

    let converter = converter(&tools);
    let (entries, outcome) = PakOperations::new(&converter)
        .list(&pak, None, &ProgressSink::disabled(), &CancelFlag::new())
        .await
        .unwrap();

    assert!(outcome.success());
    assert_eq!(
        entries,
        vec!["Mods/Example/meta.lsx", "Public/Example/Assets/icon.dds"]
    );
}

#[tokio::test]
async fn create_passes_compression_and_priority_flags() {
    let tools = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(work.path().join("source/Mods")).unwrap();
    let pak = work.path().join("out/Example.pak");

    let converter = converter(&tools);
    let options = PackageOptions {
        compression: Compression::Lz4,
        priority: 42,
        use_package_name: true,
    };
    let outcome = PakOperations::new(&converter)
        .create(
            &work.path().join("source"),
            &pak,
            &options,
            &ProgressSink::disabled(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

    assert!(outcome.success());
    assert!(pak.is_file());
    // The stub echoes its argv to stderr.
    assert!(outcome.stderr.contains("--compression-method lz4"));
    assert!(outcome.stderr.contains("--package-priority 42"));
    assert!(outcome.stderr.contains("--use-package-name true"));
}

#[tokio::test]
async fn filtered_extract_passes_expression() {
    let tools = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let pak = work.path().join("Example.pak");
    std::fs::write(&pak, b"opaque").unwrap();
    let out = work.path().join("out");

    let converter = converter(&tools);
    let filter = PakFilter {
        expression: "*.lsx".to_string(),
        use_regex: false,
    };
    let outcome = PakOperations::new(&converter)
        .extract(
            &pak,
            &out,
            Some(&filter),
            &ProgressSink::disabled(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

    assert!(outcome.success());
    assert!(out.join("extracted.txt").is_file());
    assert!(outcome.stderr.contains("--expression *.lsx"));
    assert!(!outcome.stderr.contains("--use-regex"));
}

#[tokio::test]
async fn extract_all_fans_out_per_package() {
    let tools = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let pak_dir = work.path().join("paks");
    std::fs::create_dir_all(&pak_dir).unwrap();
    for name in ["Alpha.pak", "Beta.pak", "notapak.txt"] {
        std::fs::write(pak_dir.join(name), b"opaque").unwrap();
    }
    let out = work.path().join("out");
    std::fs::create_dir_all(&out).unwrap();

    let converter = converter(&tools);
    let results = PakOperations::new(&converter)
        .extract_all(
            &pak_dir,
            &out,
            None,
            &ProgressSink::disabled(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert!(out.join("Alpha/extracted.txt").is_file());
    assert!(out.join("Beta/extracted.txt").is_file());
}
