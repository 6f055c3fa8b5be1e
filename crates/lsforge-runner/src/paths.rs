use std::path::{Path, PathBuf};

use crate::error::RunnerError;

/// Translation between host paths and the emulated-drive form the
/// external converter expects.
///
/// The converter runs under a foreign-ABI emulation layer that maps the
/// whole host filesystem onto a single drive letter. Translation is purely
/// lexical:
///
/// ```text
/// host:      /Users/modder/work/meta.lsx
/// emulated:  Z:\Users\modder\work\meta.lsx
/// ```
///
/// Emulated-form strings exist only at the spawn boundary — they are
/// produced when an argv is built and never stored anywhere long-lived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriveMapping {
    letter: char,
}

impl DriveMapping {
    /// A mapping for the given drive letter (stored uppercased).
    #[must_use]
    pub fn new(letter: char) -> Self {
        Self {
            letter: letter.to_ascii_uppercase(),
        }
    }

    /// Convert an absolute host path to the emulated form.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::InvalidPath`] if `path` is not absolute.
    /// - [`RunnerError::UnrepresentablePath`] if `path` is not UTF-8.
    pub fn to_emulated(&self, path: &Path) -> Result<String, RunnerError> {
        if !path.is_absolute() {
            return Err(RunnerError::InvalidPath {
                path: path.display().to_string(),
            });
        }
        let text = path.to_str().ok_or_else(|| RunnerError::UnrepresentablePath {
            path: path.display().to_string(),
        })?;
        Ok(format!("{}:{}", self.letter, text.replace('/', "\\")))
    }

    /// Convert an emulated-drive path back to host form.
    ///
    /// Strings without this mapping's `<letter>:` prefix are passed
    /// through unchanged — the converter occasionally echoes host paths
    /// verbatim and the caller cannot always tell which form it holds.
    #[must_use]
    pub fn from_emulated(&self, emulated: &str) -> PathBuf {
        let mut chars = emulated.chars();
        let prefix_matches = chars.next().map(|c| c.to_ascii_uppercase()) == Some(self.letter)
            && chars.next() == Some(':');
        if prefix_matches {
            PathBuf::from(emulated[2..].replace('\\', "/"))
        } else {
            PathBuf::from(emulated)
        }
    }
}

impl Default for DriveMapping {
    /// The conventional whole-filesystem mapping: drive `Z`.
    fn default() -> Self {
        Self::new('Z')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_emulated_prefixes_and_flips_slashes() {
        let drive = DriveMapping::default();
        let emulated = drive.to_emulated(Path::new("/tmp/mod/meta.lsx")).unwrap();
        assert_eq!(emulated, "Z:\\tmp\\mod\\meta.lsx");
    }

    #[test]
    fn relative_path_is_rejected() {
        let drive = DriveMapping::default();
        let err = drive.to_emulated(Path::new("mod/meta.lsx")).unwrap_err();
        assert!(matches!(err, RunnerError::InvalidPath { .. }));
    }

    #[test]
    fn round_trip_identity() {
        let drive = DriveMapping::default();
        for path in ["/a", "/a/b c/d.lsf", "/deep/ly/nested/path/file.lsx"] {
            let host = Path::new(path);
            let there = drive.to_emulated(host).unwrap();
            assert_eq!(drive.from_emulated(&there), host);
        }
    }

    #[test]
    fn from_emulated_passes_through_unprefixed_strings() {
        let drive = DriveMapping::default();
        assert_eq!(
            drive.from_emulated("/already/host/form"),
            PathBuf::from("/already/host/form")
        );
    }

    #[test]
    fn custom_drive_letter() {
        let drive = DriveMapping::new('y');
        assert_eq!(drive.to_emulated(Path::new("/x")).unwrap(), "Y:\\x");
        assert_eq!(drive.from_emulated("Y:\\x"), PathBuf::from("/x"));
    }
}
