//! Core of the sift expression engine.
//!
//! Expressions arrive as an [`ast::Expr`] tree built by the host (there is
//! no parser here). [`compiler::compile`] type-checks the tree against a
//! [`environment::TypeEnv`] and lowers it into a [`compiler::CompiledNode`],
//! which can then be executed any number of times against a
//! [`environment::ValueEnv`].

pub mod api;
pub mod ast;
pub mod compiler;
pub mod environment;
pub mod evaluator;
pub mod types;
pub mod values;

pub use ast::{BinaryOp, Expr, ExprKind, Literal, Span, UnaryOp};
pub use compiler::{CompiledNode, compile, compile_with_options};
pub use environment::{TypeBinding, TypeEnv, ValueEnv};
pub use evaluator::{ExecutionError, RuntimeError, RuntimeErrorKind};
pub use types::{Type, manager::TypeManager};
pub use values::{Function, NativeFunction, Value};
