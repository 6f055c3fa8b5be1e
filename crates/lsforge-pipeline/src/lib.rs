#![warn(clippy::pedantic)]

pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod package;
pub mod scanner;
pub mod validator;

pub use batch::{BatchDriver, BatchItemResult, BatchRequest, BatchStatus};
pub use error::PipelineError;
pub use orchestrator::{Orchestrator, PreparedConversion, WorkspacePrep};
pub use package::{Compression, PackageOptions, PakFilter, PakOperations};
pub use scanner::{ConversionJob, ConversionKind, ScanReport, scan_workspace};
pub use validator::{ModSummary, ValidationReport, get_mod_summary, validate_mod_structure};
