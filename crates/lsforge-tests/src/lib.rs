//! Shared fixtures for the lsforge integration suite.
//!
//! The centerpiece is [`fake_converter`]: a shell-script stand-in for
//! the external converter that understands just enough of the real
//! tool's argv contract (`--action convert-resource`, emulated-drive
//! paths) to drive the orchestrator and batch driver end-to-end.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lsforge_tree::{Attribute, Document, Node, Region};

/// The fake converter script.
///
/// Behavior:
/// - echoes its argv to stderr, so tests can assert on flag passing;
/// - translates `Z:\...` arguments back to host paths;
/// - `convert-resource` copies source to destination and prints a
///   `Processing`/`completed` line pair (exercising progress inference);
/// - `extract-package` materializes a marker file, `create-package`
///   touches the package, `list-package` prints two packaged paths;
/// - sources whose name contains `fail` exit 1 with stderr, simulating
///   a broken input;
/// - sources whose name contains `slow` sleep first, giving
///   cancellation tests something to interrupt.
const FAKE_CONVERTER: &str = r#"#!/bin/sh
echo "args: $*" >&2
action=""; src=""; dst=""
while [ $# -gt 0 ]; do
  case "$1" in
    --action) action="$2"; shift 2;;
    --source) src="$2"; shift 2;;
    --destination) dst="$2"; shift 2;;
    *) shift;;
  esac
done

host() { printf '%s' "$1" | sed 's/^[A-Za-z]://' | tr '\\' '/'; }
hsrc=$(host "$src")
hdst=$(host "$dst")

case "$action" in
  convert-resource)
    case "$hsrc" in
      *fail*) echo "cannot convert $hsrc" >&2; exit 1;;
      *slow*) sleep 1;;
    esac
    echo "Processing $hsrc"
    cp "$hsrc" "$hdst" || exit 1
    echo "completed"
    ;;
  extract-package)
    case "$hsrc" in
      *fail*) echo "cannot extract $hsrc" >&2; exit 1;;
    esac
    mkdir -p "$hdst"
    echo "placeholder" > "$hdst/extracted.txt"
    echo "Extracting files"
    echo "completed"
    ;;
  create-package)
    echo "Creating archive"
    : > "$hdst"
    echo "completed"
    ;;
  list-package)
    echo "Mods/Example/meta.lsx"
    echo "Public/Example/Assets/icon.dds"
    ;;
  *)
    echo "unsupported action: $action" >&2
    exit 1
    ;;
esac
"#;

/// Write the fake converter into `dir` and make it executable.
#[must_use]
pub fn fake_converter(dir: &Path) -> PathBuf {
    let path = dir.join("divine-stub");
    std::fs::write(&path, FAKE_CONVERTER).expect("write converter stub");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod converter stub");
    }
    path
}

/// The canonical one-region sample: region `config`, node `Root`, three
/// attributes.
#[must_use]
pub fn sample_document() -> Document {
    let mut doc = Document::new();
    let mut region = Region::new("config");
    let mut node = Node::new("Root");
    node.attributes.push(Attribute::new("Name", "string", "Test"));
    node.attributes.push(Attribute::new(
        "UUID",
        "guid",
        "11111111-1111-1111-1111-111111111111",
    ));
    node.attributes.push(Attribute::new("Version", "int32", "1"));
    region.nodes.push(node);
    doc.regions.push(region);
    doc
}

/// The textual rendition of [`sample_document`], byte-for-byte as the
/// LSX writer produces it.
pub const SAMPLE_LSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<save>
  <region id="config">
    <node id="Root">
      <attribute id="Name" type="string" value="Test"/>
      <attribute id="UUID" type="guid" value="11111111-1111-1111-1111-111111111111"/>
      <attribute id="Version" type="int32" value="1"/>
    </node>
  </region>
</save>
"#;

/// Content hash of every file under `root`, keyed by relative path.
/// Used to assert a tree was not modified.
#[must_use]
pub fn hash_tree(root: &Path) -> BTreeMap<PathBuf, String> {
    let mut hashes = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(bytes) = std::fs::read(&path) {
                let relative = path
                    .strip_prefix(root)
                    .unwrap_or(&path)
                    .to_path_buf();
                hashes.insert(relative, blake3::hash(&bytes).to_hex().to_string());
            }
        }
    }
    hashes
}
