//! Path-translator round-trip property over generated paths.

use std::path::{Path, PathBuf};

use lsforge_runner::{DriveMapping, RunnerError};

#[test]
fn round_trip_identity_over_a_path_corpus() {
    let drive = DriveMapping::default();
    let mut corpus: Vec<PathBuf> = vec![
        PathBuf::from("/"),
        PathBuf::from("/a"),
        PathBuf::from("/usr/share/bg3/Mods/Epic Encounters/meta.lsx"),
        PathBuf::from("/path with spaces/and.dots/file.lsf.lsx"),
        PathBuf::from("/trailing/dir/"),
    ];
    // Deeply nested generated paths.
    let mut deep = PathBuf::from("/");
    for i in 0..40 {
        deep.push(format!("level{i}"));
    }
    corpus.push(deep);

    for path in corpus {
        let emulated = drive.to_emulated(&path).unwrap();
        assert!(emulated.starts_with("Z:"), "{emulated}");
        assert!(!emulated.contains('/'), "{emulated}");
        assert_eq!(drive.from_emulated(&emulated), path, "for {}", path.display());
    }
}

#[test]
fn relative_paths_are_invalid() {
    let drive = DriveMapping::default();
    for relative in ["relative.lsx", "./also/relative", "../up"] {
        let err = drive.to_emulated(Path::new(relative)).unwrap_err();
        assert!(matches!(err, RunnerError::InvalidPath { .. }), "{relative}");
    }
}
