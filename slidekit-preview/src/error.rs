use std::path::PathBuf;

use thiserror::Error;

use slidekit_compiler::CompileError;
use slidekit_core::{ErrorKind, InstanceId, TemplateError};

/// Errors raised by the preview supervisor and the operation surface.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("preview instance '{0}' not found")]
    NotFound(InstanceId),

    /// The instance's renderer already exited with a failure.
    #[error("preview instance '{id}' exited: {detail}")]
    Exited { id: InstanceId, detail: String },

    #[error("port {0} is already used by a live preview")]
    PortInUse(u16),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no free port between {base} and {max}")]
    PortsExhausted { base: u16, max: u16 },

    #[error("failed to spawn renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl PreviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PreviewError::NotFound(_) => ErrorKind::NotFound,
            PreviewError::Exited { .. } => ErrorKind::ProcessRuntimeError,
            PreviewError::PortInUse(_) | PreviewError::InvalidRequest(_) => ErrorKind::BadRequest,
            PreviewError::PortsExhausted { .. } | PreviewError::Spawn { .. } => {
                ErrorKind::ProcessSpawnFailed
            }
            PreviewError::Io { .. } | PreviewError::Config { .. } => ErrorKind::Io,
            PreviewError::Template(err) => err.kind(),
            PreviewError::Compile(err) => err.kind(),
        }
    }
}

/// Error surface for the daemon runtime and its socket protocol.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error("daemon protocol error: {0}")]
    Protocol(String),

    #[error("daemon is not running (socket missing: {socket})")]
    DaemonNotRunning { socket: PathBuf },

    /// Error reported by the daemon for a request.
    #[error("{message}")]
    Remote { kind: ErrorKind, message: String },
}

impl DaemonError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DaemonError::Preview(err) => err.kind(),
            DaemonError::Remote { kind, .. } => *kind,
            DaemonError::Protocol(_) => ErrorKind::BadRequest,
            DaemonError::Io { .. } | DaemonError::Json(_) | DaemonError::DaemonNotRunning { .. } => {
                ErrorKind::Io
            }
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PreviewError {
    PreviewError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn daemon_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
