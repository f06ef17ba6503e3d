//! Compile errors.
//!
//! Compilation stops at the first error found in traversal order; that
//! error is cached in the resulting [`CompiledNode::Error`](super::CompiledNode).

use crate::api::Diagnostic;
use crate::ast::{BinaryOp, Span, UnaryOp};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{span}: {kind}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("unknown identifier: {name}")]
    UnknownIdentifier { name: String },

    #[error("{name} is a type, not a value")]
    NotAValue { name: String },

    #[error("unsupported unary expression: {op}{ty}")]
    UnsupportedUnary { op: UnaryOp, ty: String },

    #[error("type mismatch in binary expression: {left} and {right}")]
    BinaryTypeMismatch { left: String, right: String },

    #[error("unsupported binary expression type: {ty}")]
    UnsupportedBinaryType { ty: String },

    #[error("unsupported type {ty} for {op}")]
    UnsupportedOperandType { op: BinaryOp, ty: String },

    #[error("unsupported binary operation {op}")]
    UnsupportedBinaryOp { op: BinaryOp },

    #[error("cannot call a value of type {ty}")]
    NotAFunction { ty: String },

    #[error("variadic functions are not supported")]
    VariadicUnsupported,

    #[error("too few parameters to function call, expected {expected}, found {found}")]
    TooFewArguments { expected: usize, found: usize },

    #[error("too many parameters to function call, expected {expected}, found {found}")]
    TooManyArguments { expected: usize, found: usize },

    #[error("type mismatch in argument {index}: expected {expected}, found {found}")]
    ArgumentTypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("unknown selector {name} for {ty}")]
    UnknownSelector { name: String, ty: String },

    #[error("not an index type: {ty}")]
    NotIndexable { ty: String },

    #[error("incorrect index type. expected {expected}, found {found}")]
    IndexTypeMismatch { expected: String, found: String },

    #[error("type mismatch expected {expected} but found {found}")]
    SliceTypeMismatch { expected: &'static str, found: String },

    #[error("slice index must be int, found {found}")]
    SliceIndexType { found: String },

    #[error("unknown type {name}")]
    UnknownType { name: String },

    #[error("{name} is not a type")]
    NotAType { name: String },

    #[error("expression not supported for type assertion")]
    UnsupportedAssertTarget,

    #[error("expression nested deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Stable code for documentation lookup.
    pub fn code(&self) -> &'static str {
        use CompileErrorKind::*;
        match self.kind {
            UnknownIdentifier { .. } => "E001",
            NotAValue { .. } => "E002",
            UnsupportedUnary { .. } => "E003",
            BinaryTypeMismatch { .. } => "E004",
            UnsupportedBinaryType { .. } => "E005",
            UnsupportedOperandType { .. } => "E006",
            UnsupportedBinaryOp { .. } => "E007",
            NotAFunction { .. } => "E008",
            VariadicUnsupported => "E009",
            TooFewArguments { .. } | TooManyArguments { .. } => "E010",
            ArgumentTypeMismatch { .. } => "E011",
            UnknownSelector { .. } => "E012",
            NotIndexable { .. } => "E013",
            IndexTypeMismatch { .. } => "E014",
            SliceTypeMismatch { .. } => "E015",
            SliceIndexType { .. } => "E016",
            UnknownType { .. } => "E017",
            NotAType { .. } => "E018",
            UnsupportedAssertTarget => "E019",
            TooDeep { .. } => "E020",
        }
    }

    fn help(&self) -> Option<String> {
        use CompileErrorKind::*;
        match &self.kind {
            BinaryTypeMismatch { .. } => {
                Some("both operands of a binary operator must have the same type".to_string())
            }
            VariadicUnsupported => {
                Some("expose a fixed-arity wrapper around the function instead".to_string())
            }
            UnsupportedAssertTarget => {
                Some("the target of a type assertion must be a type name".to_string())
            }
            TooDeep { .. } => Some("split the expression or raise max_depth".to_string()),
            _ => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            message: self.kind.to_string(),
            span: self.span.clone(),
            help: self.help(),
            code: self.code(),
        }
    }
}
