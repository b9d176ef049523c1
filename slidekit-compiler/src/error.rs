//! Error types for slidekit-compiler.

use thiserror::Error;

use slidekit_core::{ErrorKind, TemplateError};

/// All errors that can arise from compiling a deck.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Loading template assets failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A required request parameter was absent or empty.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// A variable or block function name is not a valid engine identifier.
    #[error("invalid {what} name '{name}'")]
    InvalidName { what: &'static str, name: String },

    /// Tera rejected the assembled document. `diagnostic` carries the full
    /// cause chain reported by the engine.
    #[error("template compilation failed: {diagnostic}")]
    Engine {
        diagnostic: String,
        #[source]
        source: tera::Error,
    },
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Template(err) => err.kind(),
            CompileError::MissingParameter(_) | CompileError::InvalidName { .. } => {
                ErrorKind::BadRequest
            }
            CompileError::Engine { .. } => ErrorKind::CompilationFailed,
        }
    }
}

impl From<tera::Error> for CompileError {
    fn from(source: tera::Error) -> Self {
        let mut diagnostic = source.to_string();
        let mut cause = std::error::Error::source(&source);
        while let Some(err) = cause {
            diagnostic.push_str(": ");
            diagnostic.push_str(&err.to_string());
            cause = err.source();
        }
        CompileError::Engine { diagnostic, source }
    }
}

/// Failure to read back an emitted assignment statement.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot parse assignment at byte {offset}: {message}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}
