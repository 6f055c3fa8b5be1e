use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

/// Engine-owned folders inside `Mods/` that are not custom mods.
const GAME_CONTENT_FOLDERS: [&str; 6] = ["Gustav", "GustavDev", "Shared", "Engine", "Game", "Core"];

/// Expected children of each engine folder. Absences are warnings.
const EXPECTED_SUBFOLDERS: [(&str, &[&str]); 6] = [
    ("Gustav", &["Assets", "Content", "Scripts"]),
    ("GustavDev", &["Assets", "Content"]),
    ("Shared", &["Assets", "Content"]),
    ("Engine", &["Content"]),
    ("Game", &["Content"]),
    ("Core", &["Content"]),
];

/// Optional top-level directories, with their descriptions.
const OPTIONAL_FOLDERS: [(&str, &str); 3] = [
    ("Public", "Game assets and resources"),
    ("Localization", "Translation files"),
    ("Generated", "Auto-generated content"),
];

/// Canonical casing for the well-known top-level directory names.
const CANONICAL_NAMES: [&str; 4] = ["Mods", "Public", "Localization", "Generated"];

/// `meta.lsx` attribute ids that populate mod metadata, with the field
/// names they map onto.
const METADATA_FIELDS: [(&str, &str); 6] = [
    ("Name", "name"),
    ("UUID", "uuid"),
    ("Version", "version"),
    ("Author", "author"),
    ("Description", "description"),
    ("ModuleType", "module_type"),
];

/// Declarative validation result for a mod directory.
///
/// `structure` is the narrative of what was found, `warnings` what was
/// odd but survivable, `errors` what makes the mod unusable. `metadata`
/// maps each custom mod folder to the fields recognized in its
/// `meta.lsx`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub structure: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub metadata: BTreeMap<String, BTreeMap<String, String>>,
}

/// Validate a BG3 mod directory's structure and collect its metadata.
///
/// Purely declarative: every problem lands in the report, nothing is
/// thrown past I/O-level surprises (unreadable directories degrade to
/// report entries too).
#[must_use]
pub fn validate_mod_structure(mod_dir: &Path) -> ValidationReport {
    let mut report = ValidationReport {
        valid: true,
        ..ValidationReport::default()
    };

    if !mod_dir.exists() {
        report.valid = false;
        report
            .errors
            .push(format!("Directory does not exist: {}", mod_dir.display()));
        return report;
    }

    let mods_path = mod_dir.join("Mods");
    if !mods_path.exists() {
        report.valid = false;
        report.errors.push("Missing required Mods/ directory".to_string());
        return report;
    }
    report.structure.push("Found Mods/".to_string());

    analyze_mods_directory(&mods_path, &mut report);
    check_optional_folders(mod_dir, &mut report);
    audit_name_casing(mod_dir, &mut report);
    validate_structure_integrity(&mut report);

    report
}

fn analyze_mods_directory(mods_path: &Path, report: &mut ValidationReport) {
    let mut subfolders: Vec<String> = match std::fs::read_dir(mods_path) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect(),
        Err(e) => {
            report.errors.push(format!("Error reading Mods folder: {e}"));
            return;
        }
    };
    subfolders.sort();

    if subfolders.is_empty() {
        report
            .warnings
            .push("No mod subfolders found in Mods/".to_string());
        return;
    }

    let mut meta_found = false;
    for subfolder in &subfolders {
        let subfolder_path = mods_path.join(subfolder);

        if GAME_CONTENT_FOLDERS.contains(&subfolder.as_str()) {
            report
                .structure
                .push(format!("Game content folder: Mods/{subfolder}/"));
            analyze_game_content_folder(&subfolder_path, subfolder, report);
            continue;
        }

        let meta_path = subfolder_path.join("meta.lsx");
        if meta_path.exists() {
            report
                .structure
                .push(format!("meta.lsx found in Mods/{subfolder}/"));
            meta_found = true;

            match parse_meta_lsx(&meta_path) {
                Ok(metadata) => {
                    report.metadata.insert(subfolder.clone(), metadata);
                }
                Err(e) => {
                    report
                        .warnings
                        .push(format!("Failed to parse meta.lsx in Mods/{subfolder}/: {e}"));
                }
            }
            describe_mod_contents(&subfolder_path, subfolder, report);
        } else {
            report
                .warnings
                .push(format!("meta.lsx missing in Mods/{subfolder}/"));
        }
    }

    if !meta_found {
        report
            .warnings
            .push("No meta.lsx found - this mod may not work properly".to_string());
    }
}

fn analyze_game_content_folder(folder_path: &Path, folder_name: &str, report: &mut ValidationReport) {
    let Some((_, expected)) = EXPECTED_SUBFOLDERS
        .iter()
        .find(|(name, _)| *name == folder_name)
    else {
        return;
    };
    for child in *expected {
        if folder_path.join(child).exists() {
            report
                .structure
                .push(format!("Found Mods/{folder_name}/{child}/"));
        } else {
            report
                .warnings
                .push(format!("Missing Mods/{folder_name}/{child}/"));
        }
    }
}

/// List the file extensions present in a custom mod folder.
fn describe_mod_contents(folder_path: &Path, mod_name: &str, report: &mut ValidationReport) {
    let mut extensions: Vec<String> = walkdir::WalkDir::new(folder_path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .map(|x| format!(".{}", x.to_lowercase()))
        })
        .collect();
    extensions.sort();
    extensions.dedup();

    if !extensions.is_empty() {
        report.structure.push(format!(
            "File types in {mod_name}: {}",
            extensions.join(", ")
        ));
    }
}

fn check_optional_folders(mod_dir: &Path, report: &mut ValidationReport) {
    for (folder, description) in OPTIONAL_FOLDERS {
        let folder_path = mod_dir.join(folder);
        if folder_path.exists() {
            report
                .structure
                .push(format!("Found {folder}/ ({description})"));

            let file_count = walkdir::WalkDir::new(&folder_path)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .count();
            if file_count > 0 {
                report
                    .structure
                    .push(format!("  {file_count} files in {folder}/"));
            } else {
                report.warnings.push(format!("{folder}/ is empty"));
            }
        } else {
            report.warnings.push(format!("Optional {folder}/ not found"));
        }
    }
}

/// Same-name-different-case directories trip the game's loader on
/// case-sensitive filesystems.
fn audit_name_casing(mod_dir: &Path, report: &mut ValidationReport) {
    let Ok(entries) = std::fs::read_dir(mod_dir) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !entry.path().is_dir() {
            continue;
        }
        for canonical in CANONICAL_NAMES {
            if name.eq_ignore_ascii_case(canonical) && name != canonical {
                report.warnings.push(format!(
                    "Directory '{name}' should be named '{canonical}' (case mismatch)"
                ));
            }
        }
    }
}

fn validate_structure_integrity(report: &mut ValidationReport) {
    let has_content = report
        .structure
        .iter()
        .any(|item| item.contains("meta.lsx") || item.contains("Game content folder"));
    if !has_content {
        report.valid = false;
        report.errors.push(
            "No valid mod content found (no meta.lsx or game content folders)".to_string(),
        );
    }

    if report.warnings.len() > report.structure.len() {
        report.warnings.push(
            "More warnings than structural elements found - review mod structure".to_string(),
        );
    }
}

/// Extract recognized metadata fields from a `meta.lsx`.
fn parse_meta_lsx(meta_path: &Path) -> Result<BTreeMap<String, String>, lsforge_codec::CodecError> {
    let text = std::fs::read_to_string(meta_path)?;
    let doc = lsforge_codec::lsx::parse(&text)?;
    debug!(path = %meta_path.display(), "parsed mod metadata");

    let mut metadata = BTreeMap::new();
    let mut stack: Vec<&lsforge_tree::Node> = doc
        .regions
        .iter()
        .flat_map(|r| r.nodes.iter())
        .collect();
    while let Some(node) = stack.pop() {
        for attribute in &node.attributes {
            if let Some((_, field)) = METADATA_FIELDS
                .iter()
                .find(|(id, _)| *id == attribute.id)
            {
                metadata
                    .entry((*field).to_string())
                    .or_insert_with(|| attribute.value.clone());
            }
        }
        stack.extend(node.children.iter());
    }
    Ok(metadata)
}

/// One-screen summary of a mod directory.
#[derive(Clone, Debug, Serialize)]
pub struct ModSummary {
    pub path: String,
    pub valid: bool,
    pub structure_count: usize,
    pub warning_count: usize,
    pub error_count: usize,
    pub description: String,
    pub metadata: BTreeMap<String, BTreeMap<String, String>>,
}

/// Validate and condense into a [`ModSummary`].
#[must_use]
pub fn get_mod_summary(mod_dir: &Path) -> ModSummary {
    let report = validate_mod_structure(mod_dir);

    let description = if report.valid {
        if report.metadata.is_empty() {
            format!(
                "Valid mod with {} structural elements",
                report.structure.len()
            )
        } else {
            let names: Vec<&str> = report
                .metadata
                .values()
                .map(|meta| meta.get("name").map_or("Unknown", String::as_str))
                .collect();
            format!("Contains mods: {}", names.join(", "))
        }
    } else {
        format!("Invalid mod: {}", report.errors.join("; "))
    };

    ModSummary {
        path: mod_dir.display().to_string(),
        valid: report.valid,
        structure_count: report.structure.len(),
        warning_count: report.warnings.len(),
        error_count: report.errors.len(),
        description,
        metadata: report.metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const META: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<save>
  <region id="Config">
    <node id="root">
      <node id="ModuleInfo">
        <attribute id="Name" type="LSString" value="Epic Encounters"/>
        <attribute id="UUID" type="FixedString" value="11111111-1111-1111-1111-111111111111"/>
        <attribute id="Version" type="int64" value="36028797018963968"/>
        <attribute id="Author" type="LSString" value="Modder"/>
      </node>
    </node>
  </region>
</save>
"#;

    fn make_mod(dir: &Path, with_meta: bool) {
        fs::create_dir_all(dir.join("Mods/Epic")).unwrap();
        if with_meta {
            fs::write(dir.join("Mods/Epic/meta.lsx"), META).unwrap();
        }
    }

    #[test]
    fn missing_mods_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_mod_structure(dir.path());
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Missing required Mods/ directory"]);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let report = validate_mod_structure(Path::new("/nonexistent/mod"));
        assert!(!report.valid);
        assert!(report.errors[0].starts_with("Directory does not exist"));
    }

    #[test]
    fn valid_mod_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        make_mod(dir.path(), true);

        let report = validate_mod_structure(dir.path());
        assert!(report.valid);
        assert!(report.structure.iter().any(|s| s == "Found Mods/"));
        assert!(report
            .structure
            .iter()
            .any(|s| s == "meta.lsx found in Mods/Epic/"));

        let meta = &report.metadata["Epic"];
        assert_eq!(meta["name"], "Epic Encounters");
        assert_eq!(meta["uuid"], "11111111-1111-1111-1111-111111111111");
        assert_eq!(meta["author"], "Modder");
        assert!(!meta.contains_key("description"));
    }

    #[test]
    fn custom_mod_without_meta_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        make_mod(dir.path(), false);

        let report = validate_mod_structure(dir.path());
        assert!(!report.valid);
        assert!(report
            .warnings
            .iter()
            .any(|w| w == "meta.lsx missing in Mods/Epic/"));
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("No valid mod content found")));
    }

    #[test]
    fn engine_folders_check_children_as_warnings() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Mods/Gustav/Assets")).unwrap();

        let report = validate_mod_structure(dir.path());
        // Engine folders alone are valid content.
        assert!(report.valid);
        assert!(report
            .structure
            .iter()
            .any(|s| s == "Game content folder: Mods/Gustav/"));
        assert!(report.structure.iter().any(|s| s == "Found Mods/Gustav/Assets/"));
        assert!(report.warnings.iter().any(|w| w == "Missing Mods/Gustav/Content/"));
        assert!(report.warnings.iter().any(|w| w == "Missing Mods/Gustav/Scripts/"));
    }

    #[test]
    fn optional_folders_report_file_counts() {
        let dir = tempfile::tempdir().unwrap();
        make_mod(dir.path(), true);
        fs::create_dir_all(dir.path().join("Public/Epic")).unwrap();
        fs::write(dir.path().join("Public/Epic/a.lsx"), "<save/>").unwrap();
        fs::create_dir_all(dir.path().join("Localization")).unwrap();

        let report = validate_mod_structure(dir.path());
        assert!(report
            .structure
            .iter()
            .any(|s| s.contains("Found Public/")));
        assert!(report.structure.iter().any(|s| s.contains("1 files in Public/")));
        assert!(report.warnings.iter().any(|w| w == "Localization/ is empty"));
        assert!(report.warnings.iter().any(|w| w == "Optional Generated/ not found"));
    }

    #[test]
    fn case_mismatch_is_warned() {
        let dir = tempfile::tempdir().unwrap();
        make_mod(dir.path(), true);
        fs::create_dir_all(dir.path().join("public")).unwrap();

        let report = validate_mod_structure(dir.path());
        assert!(report
            .warnings
            .iter()
            .any(|w| w == "Directory 'public' should be named 'Public' (case mismatch)"));
    }

    #[test]
    fn summary_condenses_the_report() {
        let dir = tempfile::tempdir().unwrap();
        make_mod(dir.path(), true);

        let summary = get_mod_summary(dir.path());
        assert!(summary.valid);
        assert!(summary.description.contains("Epic Encounters"));
        assert!(summary.structure_count > 0);
    }
}
