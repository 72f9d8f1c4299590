//! Error types for production-line loading, encoding and reporting.
//!
//! Solver outcomes (timeout, infeasibility) are not errors: they are
//! recorded in [`crate::solution::ResultRecord`].

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{JobId, ModuleId, OperationId};
use crate::validation::ValidationError;

/// Main error type for u-flowline operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The instance document failed structural validation.
    #[error("invalid instance: {}", format_validation(.0))]
    InvalidInstance(Vec<ValidationError>),

    /// A production line was built without any module.
    #[error("production line must have at least one module")]
    EmptyProductionLine,

    /// The instance declares a line type this crate cannot load.
    #[error("problem type {0} not supported")]
    UnsupportedLineType(String),

    /// A warm start names a module absent from the encoded model.
    #[error("unknown module {0}")]
    UnknownModule(ModuleId),

    /// A warm start names a job absent from its module.
    #[error("unknown job {job} in module {module}")]
    UnknownJob { module: ModuleId, job: JobId },

    /// A warm start names an operation absent from its job.
    #[error("unknown operation {job}_{op} in module {module}")]
    UnknownOperation {
        module: ModuleId,
        job: JobId,
        op: OperationId,
    },

    /// A timing-table key is not an unsigned integer.
    #[error("invalid identifier key '{0}'")]
    InvalidKey(String),

    /// A declared input artifact does not exist.
    #[error("file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CBOR encode error: {0}")]
    CborEncode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("CBOR decode error: {0}")]
    CborDecode(#[from] ciborium::de::Error<std::io::Error>),
}

/// Result type alias for u-flowline operations.
pub type Result<T> = std::result::Result<T, Error>;

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
