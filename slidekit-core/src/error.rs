//! Error types for slidekit-core.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, caller-facing classification of every failure in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown template or instance, or a missing asset on disk.
    NotFound,
    /// Missing or malformed request parameters.
    BadRequest,
    /// The templating engine rejected the assembled document.
    CompilationFailed,
    /// The renderer process could not be started.
    ProcessSpawnFailed,
    /// The renderer exited nonzero or reported an error after starting.
    ProcessRuntimeError,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::CompilationFailed => "compilation_failed",
            ErrorKind::ProcessSpawnFailed => "process_spawn_failed",
            ErrorKind::ProcessRuntimeError => "process_runtime_error",
            ErrorKind::Io => "io",
        };
        f.write_str(s)
    }
}

/// All errors that can arise from template store operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template id was empty or tried to escape the templates root.
    #[error("invalid template id '{0}'")]
    InvalidId(String),

    /// No directory for this template under the templates root.
    #[error("template '{id}' not found at {path}")]
    TemplateNotFound { id: String, path: PathBuf },

    /// A required template asset (preview, blocks, macros) is missing.
    #[error("template asset not found at {path}")]
    AssetNotFound { path: PathBuf },

    /// `blocks.json` could not be parsed.
    #[error("failed to parse block definitions at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("template I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::InvalidId(_) => ErrorKind::BadRequest,
            TemplateError::TemplateNotFound { .. } | TemplateError::AssetNotFound { .. } => {
                ErrorKind::NotFound
            }
            TemplateError::Parse { .. } | TemplateError::Io { .. } => ErrorKind::Io,
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TemplateError {
    TemplateError::Io {
        path: path.into(),
        source,
    }
}
