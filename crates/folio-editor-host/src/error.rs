use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::store::RecordKind;

/// Errors raised by host pages, their stores and configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum HostError {
    #[error("failed to read config file {}", .path.display())]
    #[diagnostic(code(folio::host::config_io))]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}", .path.display())]
    #[diagnostic(
        code(folio::host::config_parse),
        help("missing fields take their defaults; check the JSON syntax")
    )]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported config format: {}", .0.display())]
    #[diagnostic(code(folio::host::config_format), help("use a .json file"))]
    UnsupportedFormat(PathBuf),

    #[error("{field} is required")]
    #[diagnostic(code(folio::host::missing_field))]
    MissingField { field: &'static str },

    #[error("invalid {field}: {message}")]
    #[diagnostic(code(folio::host::invalid_field))]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("{kind} {id} not found")]
    #[diagnostic(code(folio::host::not_found))]
    NotFound { kind: RecordKind, id: String },

    #[error("failed to encode draft")]
    #[diagnostic(code(folio::host::draft))]
    Draft(#[from] serde_json::Error),
}

pub type Result<T, E = HostError> = std::result::Result<T, E>;
