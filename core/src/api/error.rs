//! Public error types for the embedding API.
//!
//! Compile and runtime errors are converted to these at the API boundary.
//! Errors returned by host functions are passed through untouched.

use crate::ast::Span;
use crate::compiler::CompileError;
use crate::evaluator::ExecutionError;
use crate::values::HostError;
use std::fmt;

/// Public error type for all engine operations.
#[derive(Debug)]
pub enum Error {
    /// Invalid API usage, such as a wrong number of arguments.
    Api(String),

    /// The expression failed to compile. Compilation stops at the first
    /// error, so there is exactly one diagnostic.
    Compilation(Diagnostic),

    /// Evaluation failed inside the engine.
    Runtime(Diagnostic),

    /// A host function returned an error. Carried verbatim.
    Host(HostError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Api(msg) => write!(f, "API error: {}", msg),
            Error::Compilation(diagnostic) | Error::Runtime(diagnostic) => {
                write!(f, "{}", diagnostic)
            }
            Error::Host(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

/// An engine error with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Primary diagnostic message, without the position prefix.
    pub message: String,

    /// Source location of the node that failed.
    pub span: Span,

    /// Optional help text suggesting how to fix the issue.
    pub help: Option<String>,

    /// Stable error code (e.g. "E004") for documentation lookup.
    pub code: &'static str,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

// ============================================================================
// Conversion from internal errors
// ============================================================================

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        Error::Compilation(err.to_diagnostic())
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Runtime(err) => Error::Runtime(err.to_diagnostic()),
            ExecutionError::Compile(err) => err.into(),
            ExecutionError::Host(err) => Error::Host(err),
        }
    }
}
