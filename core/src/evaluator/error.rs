//! Runtime evaluation errors.
//!
//! Most of these guard against a value environment that disagrees with the
//! type environment an expression was compiled against. The rest are
//! genuinely dynamic: missing bindings, out-of-range indices, failed type
//! assertions, and errors returned by host functions.

use crate::api::Diagnostic;
use crate::ast::Span;
use crate::compiler::CompileError;
use crate::values::HostError;
use core::fmt;
use thiserror::Error;

/// Error returned by executing a compiled node.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    /// Raised by the engine while evaluating.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Returned by a host function, passed through unchanged.
    #[error(transparent)]
    Host(HostError),

    /// The node being executed failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{span}: {kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub span: Span,
}

/// Which bound of a slice expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceBound {
    Low,
    High,
    Max,
}

impl fmt::Display for SliceBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceBound::Low => write!(f, "low"),
            SliceBound::High => write!(f, "high"),
            SliceBound::Max => write!(f, "max"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    #[error("undefined identifier: {name}")]
    UndefinedIdentifier { name: String },

    #[error("value type mismatch: {name} is {found}, expected {expected}")]
    ValueTypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("operand type mismatch: expected {expected}, found {found}")]
    OperandTypeMismatch { expected: String, found: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("function not found")]
    FunctionNotFound,

    #[error("{found} not a function")]
    NotAFunction { found: String },

    #[error("type mismatch in argument {index}: expected {expected}, found {found}")]
    ArgumentTypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("too few parameters to function call, expected {expected}, found {found}")]
    TooFewArguments { expected: usize, found: usize },

    #[error("too many parameters to function call, expected {expected}, found {found}")]
    TooManyArguments { expected: usize, found: usize },

    #[error("function returned {found} results, expected {expected}")]
    ResultCountMismatch { expected: usize, found: usize },

    #[error("function result {index}: expected {expected}, found {found}")]
    ResultTypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("dereferencing a null value")]
    NullDereference,

    #[error("unknown selector {name} for {ty}")]
    UnknownSelector { name: String, ty: String },

    #[error("indexing a null value")]
    NullIndex,

    #[error("receiver type mismatch: expected {expected}, found {found}")]
    ReceiverTypeMismatch { expected: String, found: String },

    #[error("incorrect index type. expected {expected}, found {found}")]
    IndexTypeMismatch { expected: String, found: String },

    #[error("index out of bounds, len = {len} index = {index}")]
    IndexOutOfBounds { len: usize, index: i64 },

    #[error("{bound} index out of range: {value}")]
    SliceBoundOutOfRange { bound: SliceBound, value: i64 },

    #[error("{bound} slice index must be int, found {found}")]
    SliceIndexType { bound: SliceBound, found: String },

    #[error("string slice [{low}:{high}] splits a character")]
    NotCharBoundary { low: usize, high: usize },

    #[error("{found} is not assignable to {expected}.")]
    AssertionFailed { found: String, expected: String },
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Stable code for documentation lookup.
    pub fn code(&self) -> &'static str {
        use RuntimeErrorKind::*;
        match self.kind {
            UndefinedIdentifier { .. } => "R001",
            ValueTypeMismatch { .. } => "R002",
            OperandTypeMismatch { .. } => "R003",
            DivisionByZero => "R004",
            FunctionNotFound => "R005",
            NotAFunction { .. } => "R006",
            ArgumentTypeMismatch { .. } => "R007",
            TooFewArguments { .. } | TooManyArguments { .. } => "R008",
            ResultCountMismatch { .. } | ResultTypeMismatch { .. } => "R009",
            NullDereference | NullIndex => "R010",
            UnknownSelector { .. } => "R011",
            ReceiverTypeMismatch { .. } | IndexTypeMismatch { .. } => "R012",
            IndexOutOfBounds { .. } => "R013",
            SliceBoundOutOfRange { .. } | SliceIndexType { .. } | NotCharBoundary { .. } => {
                "R014"
            }
            AssertionFailed { .. } => "R015",
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            message: self.kind.to_string(),
            span: self.span.clone(),
            help: None,
            code: self.code(),
        }
    }
}

impl ExecutionError {
    pub(crate) fn runtime(kind: RuntimeErrorKind, span: &Span) -> Self {
        ExecutionError::Runtime(RuntimeError::new(kind, span.clone()))
    }

    /// The engine-side error, if this is not a host error.
    pub fn to_diagnostic(&self) -> Option<Diagnostic> {
        match self {
            ExecutionError::Runtime(e) => Some(e.to_diagnostic()),
            ExecutionError::Compile(e) => Some(e.to_diagnostic()),
            ExecutionError::Host(_) => None,
        }
    }
}
