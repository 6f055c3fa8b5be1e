use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use lsforge_runner::{Converter, DriveMapping, RunnerError};

/// Default config file looked for in the working directory.
const DEFAULT_CONFIG_FILE: &str = "lsforge.toml";

/// Executable name used for `PATH` discovery when nothing is
/// configured.
const CONVERTER_PROGRAM: &str = "divine";

/// TOML-backed tool configuration.
///
/// ```toml
/// converter = "/opt/tools/divine.exe"
/// emulator = "/usr/bin/wine"
/// prefix = "/home/modder/.wine"
/// drive_letter = "Z"
/// timeout_secs = 300
/// workers = 4
/// cache_capacity = 100
/// ```
///
/// Every field is optional; CLI flags override the file, and missing
/// values fall back to built-in defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub converter: Option<PathBuf>,
    pub emulator: Option<PathBuf>,
    pub prefix: Option<PathBuf>,
    pub drive_letter: Option<char>,
    pub timeout_secs: Option<u64>,
    pub workers: Option<usize>,
    pub cache_capacity: Option<usize>,
}

impl Config {
    /// Load from an explicit path, or from `lsforge.toml` in the
    /// working directory when present, or defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or(lsforge_pipeline::batch::DEFAULT_WORKERS)
    }

    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
            .unwrap_or(lsforge_preview::cache::DEFAULT_CAPACITY)
    }

    /// Build the converter handle: explicit CLI path, then config file,
    /// then `PATH` discovery.
    ///
    /// # Errors
    ///
    /// [`RunnerError::ToolMissing`] when no converter can be found —
    /// the caller maps this onto exit code 3.
    pub fn build_converter(&self, cli_override: Option<&Path>) -> Result<Converter, RunnerError> {
        let mut converter = match cli_override.or(self.converter.as_deref()) {
            Some(program) => Converter::new(program),
            None => Converter::discover(CONVERTER_PROGRAM)?,
        };
        if let Some(emulator) = &self.emulator {
            converter = converter.with_emulator(emulator);
        }
        if let Some(prefix) = &self.prefix {
            converter = converter.with_prefix(prefix);
        }
        if let Some(letter) = self.drive_letter {
            converter = converter.with_drive(DriveMapping::new(letter));
        }
        if let Some(secs) = self.timeout_secs {
            converter = converter.with_timeout(Duration::from_secs(secs));
        }
        Ok(converter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::default();
        assert_eq!(config.workers(), 4);
        assert_eq!(config.cache_capacity(), 100);
    }

    #[test]
    fn parses_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lsforge.toml");
        std::fs::write(
            &path,
            "converter = \"/opt/divine.exe\"\ndrive_letter = \"Y\"\nworkers = 8\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.converter.as_deref(), Some(Path::new("/opt/divine.exe")));
        assert_eq!(config.drive_letter, Some('Y'));
        assert_eq!(config.workers(), 8);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lsforge.toml");
        std::fs::write(&path, "no_such_key = 1\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn cli_override_beats_config() {
        let config = Config {
            converter: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };
        let converter = config
            .build_converter(Some(Path::new("/from/cli")))
            .unwrap();
        // The converter keeps the program path internally; validate via
        // the setup report message.
        let report = converter.validate_setup();
        assert!(report.messages[0].contains("/from/cli"));
    }
}
