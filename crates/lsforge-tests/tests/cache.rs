//! Preview-cache invalidation and LRU-bound properties.

use std::collections::BTreeMap;
use std::path::PathBuf;

use lsforge_preview::{PreviewCache, PreviewRecord};

fn record() -> PreviewRecord {
    PreviewRecord {
        filename: "x.lsx".to_string(),
        size: 0,
        extension: ".lsx".to_string(),
        content: String::new(),
        thumbnail: None,
        metadata: BTreeMap::new(),
        error: None,
        cache_mtime: None,
        cache_size: None,
    }
}

fn touch(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn rewrite_with_different_size_forces_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let path = touch(&dir, "a.lsx", "original");

    let mut cache = PreviewCache::new(8);
    cache.insert(path.clone(), record());
    assert!(cache.get(&path).is_some());

    std::fs::write(&path, "rewritten with different length").unwrap();
    assert!(cache.get(&path).is_none());
}

#[test]
fn lru_bound_holds_for_capacity_plus_k() {
    let dir = tempfile::tempdir().unwrap();
    let capacity = 5;
    let k = 7;

    let mut cache = PreviewCache::new(capacity);
    let mut paths = Vec::new();
    for i in 0..(capacity + k) {
        let path = touch(&dir, &format!("f{i}.lsx"), "x");
        cache.insert(path.clone(), record());
        paths.push(path);
    }

    assert_eq!(cache.len(), capacity);
    // Exactly the most recently inserted `capacity` entries survive.
    for (i, path) in paths.iter().enumerate() {
        assert_eq!(cache.contains(path), i >= k, "entry {i}");
    }
}

#[test]
fn scenario_access_pattern_a_b_a_c_with_capacity_two() {
    let dir = tempfile::tempdir().unwrap();
    let a = touch(&dir, "a.lsx", "a");
    let b = touch(&dir, "b.lsx", "b");
    let c = touch(&dir, "c.lsx", "c");

    let mut cache = PreviewCache::new(2);
    cache.insert(a.clone(), record());
    cache.insert(b.clone(), record());
    assert!(cache.get(&a).is_some()); // A is now most recent
    cache.insert(c.clone(), record()); // evicts B

    assert!(cache.contains(&a));
    assert!(!cache.contains(&b));
    assert!(cache.contains(&c));
    assert_eq!(cache.len(), 2);
}
