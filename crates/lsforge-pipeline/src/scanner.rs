use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Composite-name suffixes that request a conversion, lowercased.
/// `foo.lsf.lsx` asks for `foo.lsf`; likewise for the other binary
/// extensions.
const CONVERSION_SUFFIXES: [&str; 4] = [".lsf.lsx", ".lsb.lsx", ".lsbs.lsx", ".lsbc.lsx"];

/// What kind of transformation a job performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionKind {
    /// Textual source producing a binary target (the scanner's case).
    BinaryFromText,
    /// Binary source producing a textual target.
    TextFromBinary,
    /// Anything else the converter can transcode.
    ResourceTranscode,
}

/// One pending conversion discovered in a workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionJob {
    pub source_path: PathBuf,
    /// Path relative to the scanned root; stable across the staging copy.
    pub relative_path: PathBuf,
    /// Target extension without the dot (`lsf`, `lsb`, ...).
    pub target_extension: String,
    pub kind: ConversionKind,
}

/// Scanner output: jobs grouped by target extension.
///
/// Group keys iterate sorted (`BTreeMap`); within a group, jobs follow
/// the sorted case-sensitive directory walk. Running the scanner twice
/// over an unchanged tree therefore yields identical output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub groups: BTreeMap<String, Vec<ConversionJob>>,
}

impl ScanReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All jobs in deterministic order: group key, then walk order.
    pub fn jobs(&self) -> impl Iterator<Item = &ConversionJob> {
        self.groups.values().flatten()
    }
}

/// Walk a workspace and collect every file whose name requests a
/// conversion.
///
/// Hidden entries (leading dot) are skipped entirely — a hidden
/// directory hides its whole subtree. Matching is on the lowercased
/// basename, so `META.LSF.LSX` still counts.
#[must_use]
pub fn scan_workspace(root: &Path) -> ScanReport {
    let mut report = ScanReport::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e, root));

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        let Some(target_extension) = conversion_target(&name) else {
            continue;
        };

        let source_path = entry.path().to_path_buf();
        let relative_path = source_path
            .strip_prefix(root)
            .map_or_else(|_| source_path.clone(), Path::to_path_buf);

        report
            .groups
            .entry(target_extension.clone())
            .or_default()
            .push(ConversionJob {
                source_path,
                relative_path,
                target_extension,
                kind: ConversionKind::BinaryFromText,
            });
    }

    report
}

/// The target extension requested by a composite basename, if any.
fn conversion_target(lowercase_name: &str) -> Option<String> {
    CONVERSION_SUFFIXES
        .iter()
        .find(|suffix| lowercase_name.ends_with(*suffix))
        .map(|suffix| suffix.trim_end_matches(".lsx").trim_start_matches('.').to_string())
}

fn is_hidden(entry: &DirEntry, root: &Path) -> bool {
    entry.path() != root
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<save/>").unwrap();
    }

    #[test]
    fn finds_composite_names_and_groups_by_target() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Mods/Foo/meta.lsf.lsx");
        touch(dir.path(), "Mods/Foo/bank.lsb.lsx");
        touch(dir.path(), "Mods/Foo/story.lsbs.lsx");
        touch(dir.path(), "Mods/Foo/cine.lsbc.lsx");
        touch(dir.path(), "Mods/Foo/plain.lsx"); // no composite suffix
        touch(dir.path(), "Mods/Foo/already.lsf"); // already binary

        let report = scan_workspace(dir.path());
        assert_eq!(report.total(), 4);
        assert_eq!(report.groups["lsf"].len(), 1);
        assert_eq!(report.groups["lsb"].len(), 1);
        assert_eq!(report.groups["lsbs"].len(), 1);
        assert_eq!(report.groups["lsbc"].len(), 1);
        assert_eq!(
            report.groups["lsf"][0].relative_path,
            PathBuf::from("Mods/Foo/meta.lsf.lsx")
        );
        assert_eq!(report.groups["lsf"][0].kind, ConversionKind::BinaryFromText);
    }

    #[test]
    fn matching_is_case_insensitive_on_the_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "META.LSF.LSX");
        let report = scan_workspace(dir.path());
        assert_eq!(report.total(), 1);
        assert_eq!(report.groups["lsf"][0].target_extension, "lsf");
    }

    #[test]
    fn hidden_files_and_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".hidden.lsf.lsx");
        touch(dir.path(), ".git/obj.lsf.lsx");
        touch(dir.path(), "visible.lsf.lsx");
        let report = scan_workspace(dir.path());
        assert_eq!(report.total(), 1);
    }

    #[test]
    fn scan_is_stable_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.lsf.lsx", "a.lsf.lsx", "sub/c.lsf.lsx", "z.lsb.lsx"] {
            touch(dir.path(), name);
        }
        let first = scan_workspace(dir.path());
        let second = scan_workspace(dir.path());
        assert_eq!(first, second);

        let order: Vec<&PathBuf> = first.jobs().map(|j| &j.relative_path).collect();
        // lsb group before lsf group (sorted keys), walk order inside.
        assert_eq!(order[0], &PathBuf::from("z.lsb.lsx"));
    }

    #[test]
    fn empty_workspace_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = scan_workspace(dir.path());
        assert!(report.is_empty());
        assert_eq!(report.total(), 0);
    }
}
