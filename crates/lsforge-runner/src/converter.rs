use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::RunnerError;
use crate::monitor::{ProcessMonitor, RunOutcome, RunStatus};
use crate::paths::DriveMapping;
use crate::progress::{CancelFlag, ProgressSink};

/// Default deadline for one converter invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Deadline for the one-off emulation-prefix initialization command.
pub const INIT_TIMEOUT: Duration = Duration::from_secs(60);

/// The converter actions this toolkit drives.
///
/// The converter is an opaque command-line tool; these are the verbs it
/// accepts via `--action`. Anything else it can do is not consumed here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    ExtractPackage,
    CreatePackage,
    ListPackage,
    ExtractSingleFile,
    ConvertResource,
    ConvertModel,
    ConvertModels,
}

impl Verb {
    #[must_use]
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::ExtractPackage => "extract-package",
            Self::CreatePackage => "create-package",
            Self::ListPackage => "list-package",
            Self::ExtractSingleFile => "extract-single-file",
            Self::ConvertResource => "convert-resource",
            Self::ConvertModel => "convert-model",
            Self::ConvertModels => "convert-models",
        }
    }
}

/// One converter invocation under construction.
///
/// Holds host-form paths; translation to the emulated-drive form happens
/// once, when the argv is built. Extra options map to `--<key> <value>`
/// pairs with underscores dashed, matching the converter's flag style.
#[derive(Clone, Debug)]
pub struct ConverterCommand {
    verb: Verb,
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    options: Vec<(String, String)>,
}

impl ConverterCommand {
    #[must_use]
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            source: None,
            destination: None,
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    #[must_use]
    pub fn destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    #[must_use]
    pub fn input_format(self, format: &str) -> Self {
        self.option("input-format", format)
    }

    #[must_use]
    pub fn output_format(self, format: &str) -> Self {
        self.option("output-format", format)
    }

    /// Append an arbitrary `--<key> <value>` option. Underscores in the
    /// key are converted to dashes.
    #[must_use]
    pub fn option(mut self, key: &str, value: impl Into<String>) -> Self {
        self.options.push((key.replace('_', "-"), value.into()));
        self
    }

    /// Build the final argv, translating paths at this boundary only.
    ///
    /// # Errors
    ///
    /// Path translation errors for relative or non-UTF-8 paths.
    pub fn to_argv(&self, drive: DriveMapping) -> Result<Vec<String>, RunnerError> {
        let mut argv = vec![
            "--action".to_string(),
            self.verb.as_arg().to_string(),
            "--game".to_string(),
            "bg3".to_string(),
        ];
        if let Some(source) = &self.source {
            argv.push("--source".to_string());
            argv.push(drive.to_emulated(source)?);
        }
        if let Some(destination) = &self.destination {
            argv.push("--destination".to_string());
            argv.push(drive.to_emulated(destination)?);
        }
        for (key, value) in &self.options {
            argv.push(format!("--{key}"));
            argv.push(value.clone());
        }
        Ok(argv)
    }
}

/// Health report from [`Converter::validate_setup`].
#[derive(Clone, Debug)]
pub struct SetupReport {
    pub converter_found: bool,
    pub emulator_found: bool,
    pub prefix_valid: bool,
    pub messages: Vec<String>,
}

impl SetupReport {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.converter_found && self.emulator_found && self.prefix_valid
    }
}

/// Handle to the external converter tool.
///
/// Wraps everything needed to issue one verb: where the converter lives,
/// the emulation binary it runs under (if any), the emulation prefix
/// exported as `WINEPREFIX`, the drive mapping for path translation, and
/// the per-invocation deadline.
///
/// ```text
///   ConverterCommand ──▶ argv (paths emulated) ──▶ ProcessMonitor
///                                                     │
///                        env WINEPREFIX=<prefix> ─────┘
/// ```
#[derive(Debug)]
pub struct Converter {
    program: PathBuf,
    emulator: Option<PathBuf>,
    prefix: Option<PathBuf>,
    drive: DriveMapping,
    timeout: Duration,
    monitor: ProcessMonitor,
}

impl Converter {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            emulator: None,
            prefix: None,
            drive: DriveMapping::default(),
            timeout: DEFAULT_TIMEOUT,
            monitor: ProcessMonitor::new(),
        }
    }

    /// Locate the converter on `PATH`.
    ///
    /// # Errors
    ///
    /// [`RunnerError::ToolMissing`] if the executable is not found.
    pub fn discover(program_name: &str) -> Result<Self, RunnerError> {
        let program = which::which(program_name).map_err(|_| RunnerError::ToolMissing {
            program: program_name.to_string(),
        })?;
        Ok(Self::new(program))
    }

    /// Run the converter through this emulation binary instead of
    /// executing it directly.
    #[must_use]
    pub fn with_emulator(mut self, emulator: impl Into<PathBuf>) -> Self {
        self.emulator = Some(emulator.into());
        self
    }

    /// Emulation prefix directory, exported to the child as `WINEPREFIX`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_drive(mut self, drive: DriveMapping) -> Self {
        self.drive = drive;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn drive(&self) -> DriveMapping {
        self.drive
    }

    /// Issue one converter command.
    ///
    /// Checks the cancel flag before spawning; an already-cancelled flag
    /// produces a `Cancelled` outcome without starting the process.
    ///
    /// # Errors
    ///
    /// Path translation and spawn failures only — see
    /// [`RunnerError`](crate::RunnerError) for the split between errors
    /// and outcomes.
    pub async fn run(
        &self,
        command: ConverterCommand,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        if cancel.is_cancelled() {
            return Ok(RunOutcome {
                status: RunStatus::Cancelled,
                stdout: String::new(),
                stderr: String::new(),
            });
        }

        let argv = command.to_argv(self.drive)?;
        let (program, args) = self.spawn_line(&argv)?;
        let envs = self.spawn_env();

        debug!(action = command.verb.as_arg(), "running converter");
        progress.emit(5, format!("Starting {}...", command.verb.as_arg()));

        self.monitor
            .run(&program, &args, &envs, self.timeout, progress, cancel)
            .await
    }

    /// Convert a single resource file between tree dialects.
    ///
    /// # Errors
    ///
    /// See [`Converter::run`].
    pub async fn convert_resource(
        &self,
        source: &Path,
        destination: &Path,
        input_format: &str,
        output_format: &str,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        self.run(
            ConverterCommand::new(Verb::ConvertResource)
                .source(source)
                .destination(destination)
                .input_format(input_format)
                .output_format(output_format),
            progress,
            cancel,
        )
        .await
    }

    /// Extract a package archive into a directory.
    ///
    /// # Errors
    ///
    /// See [`Converter::run`].
    pub async fn extract_package(
        &self,
        package: &Path,
        destination: &Path,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        self.run(
            ConverterCommand::new(Verb::ExtractPackage)
                .source(package)
                .destination(destination),
            progress,
            cancel,
        )
        .await
    }

    /// Create a package archive from a directory.
    ///
    /// # Errors
    ///
    /// See [`Converter::run`].
    pub async fn create_package(
        &self,
        source: &Path,
        package: &Path,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        self.run(
            ConverterCommand::new(Verb::CreatePackage)
                .source(source)
                .destination(package),
            progress,
            cancel,
        )
        .await
    }

    /// List a package's contents (the listing arrives on stdout).
    ///
    /// # Errors
    ///
    /// See [`Converter::run`].
    pub async fn list_package(
        &self,
        package: &Path,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        self.run(
            ConverterCommand::new(Verb::ListPackage).source(package),
            progress,
            cancel,
        )
        .await
    }

    /// Extract one file from a package by its packaged path.
    ///
    /// # Errors
    ///
    /// See [`Converter::run`].
    pub async fn extract_single_file(
        &self,
        package: &Path,
        packaged_path: &str,
        output: &Path,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        self.run(
            ConverterCommand::new(Verb::ExtractSingleFile)
                .source(package)
                .destination(output)
                .option("packaged-path", packaged_path),
            progress,
            cancel,
        )
        .await
    }

    /// Convert a single 3D-model file. Extra `options` pass through as
    /// `--<key> <value>` converter flags (conform paths, rigid/animation
    /// switches, and so on).
    ///
    /// # Errors
    ///
    /// See [`Converter::run`].
    pub async fn convert_model(
        &self,
        source: &Path,
        destination: &Path,
        options: &[(String, String)],
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        let mut command = ConverterCommand::new(Verb::ConvertModel)
            .source(source)
            .destination(destination);
        for (key, value) in options {
            command = command.option(key, value.clone());
        }
        self.run(command, progress, cancel).await
    }

    /// Convert every model of one format under a directory.
    ///
    /// # Errors
    ///
    /// See [`Converter::run`].
    pub async fn convert_models(
        &self,
        source_dir: &Path,
        destination_dir: &Path,
        input_format: &str,
        output_format: &str,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        self.run(
            ConverterCommand::new(Verb::ConvertModels)
                .source(source_dir)
                .destination(destination_dir)
                .input_format(input_format)
                .output_format(output_format),
            progress,
            cancel,
        )
        .await
    }

    /// Warm up the emulation prefix. No-op success without an emulator.
    ///
    /// # Errors
    ///
    /// See [`Converter::run`].
    pub async fn initialize(
        &self,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        let Some(emulator) = &self.emulator else {
            return Ok(RunOutcome {
                status: RunStatus::Completed,
                stdout: String::new(),
                stderr: String::new(),
            });
        };
        let program = emulator.to_string_lossy().into_owned();
        let args = vec!["wineboot".to_string(), "--init".to_string()];
        self.monitor
            .run(&program, &args, &self.spawn_env(), INIT_TIMEOUT, progress, cancel)
            .await
    }

    /// Check that the converter, emulator, and prefix are all usable.
    #[must_use]
    pub fn validate_setup(&self) -> SetupReport {
        let converter_found = self.program.is_file();
        let emulator_found = self.emulator.as_ref().is_none_or(|e| e.is_file());
        let prefix_valid = self.prefix.as_ref().is_none_or(|prefix| {
            prefix.join("dosdevices").is_dir() && prefix.join("drive_c").is_dir()
        });

        let mut messages = Vec::new();
        messages.push(if converter_found {
            format!("Converter: {}", self.program.display())
        } else {
            format!("Converter missing: {}", self.program.display())
        });
        if let Some(emulator) = &self.emulator {
            messages.push(if emulator_found {
                format!("Emulator: {}", emulator.display())
            } else {
                format!("Emulator missing: {}", emulator.display())
            });
        }
        if let Some(prefix) = &self.prefix {
            messages.push(if prefix_valid {
                format!("Prefix: {}", prefix.display())
            } else {
                format!("Prefix incomplete: {}", prefix.display())
            });
        }

        SetupReport {
            converter_found,
            emulator_found,
            prefix_valid,
            messages,
        }
    }

    /// The actual program + argv to spawn, accounting for the emulator.
    fn spawn_line(&self, argv: &[String]) -> Result<(String, Vec<String>), RunnerError> {
        match &self.emulator {
            Some(emulator) => {
                // Under emulation the converter itself is an argument, in
                // emulated path form.
                let mut args = vec![self.drive.to_emulated(&self.program)?];
                args.extend_from_slice(argv);
                Ok((emulator.to_string_lossy().into_owned(), args))
            }
            None => Ok((
                self.program.to_string_lossy().into_owned(),
                argv.to_vec(),
            )),
        }
    }

    fn spawn_env(&self) -> Vec<(String, String)> {
        match &self.prefix {
            Some(prefix) => vec![(
                "WINEPREFIX".to_string(),
                prefix.to_string_lossy().into_owned(),
            )],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_layout_for_convert_resource() {
        let argv = ConverterCommand::new(Verb::ConvertResource)
            .source("/work/meta.lsx")
            .destination("/work/meta.lsf")
            .input_format("lsx")
            .output_format("lsf")
            .to_argv(DriveMapping::default())
            .unwrap();
        assert_eq!(
            argv,
            vec![
                "--action",
                "convert-resource",
                "--game",
                "bg3",
                "--source",
                "Z:\\work\\meta.lsx",
                "--destination",
                "Z:\\work\\meta.lsf",
                "--input-format",
                "lsx",
                "--output-format",
                "lsf",
            ]
        );
    }

    #[test]
    fn option_keys_dash_underscores() {
        let argv = ConverterCommand::new(Verb::ConvertModel)
            .option("conform_path", "Z")
            .to_argv(DriveMapping::default())
            .unwrap();
        assert_eq!(argv[4], "--conform-path");
    }

    #[test]
    fn relative_source_fails_argv_build() {
        let result = ConverterCommand::new(Verb::ListPackage)
            .source("relative.pak")
            .to_argv(DriveMapping::default());
        assert!(matches!(result, Err(RunnerError::InvalidPath { .. })));
    }

    #[test]
    fn emulator_prepends_translated_program() {
        let converter = Converter::new("/opt/tools/divine.exe").with_emulator("/usr/bin/wine");
        let (program, args) = converter.spawn_line(&["--action".to_string()]).unwrap();
        assert_eq!(program, "/usr/bin/wine");
        assert_eq!(args[0], "Z:\\opt\\tools\\divine.exe");
        assert_eq!(args[1], "--action");
    }

    #[test]
    fn setup_report_flags_missing_pieces() {
        let converter = Converter::new("/nonexistent/divine.exe")
            .with_prefix("/nonexistent/prefix");
        let report = converter.validate_setup();
        assert!(!report.converter_found);
        assert!(!report.prefix_valid);
        assert!(report.emulator_found); // not configured, not required
        assert!(!report.ok());
    }

    #[tokio::test]
    async fn run_short_circuits_on_prior_cancellation() {
        let converter = Converter::new("/nonexistent/divine.exe");
        let cancel = CancelFlag::new();
        cancel.cancel();
        let outcome = converter
            .run(
                ConverterCommand::new(Verb::ListPackage).source("/tmp/x.pak"),
                &ProgressSink::disabled(),
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Cancelled);
    }
}
