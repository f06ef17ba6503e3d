//! Type-checking compiler.
//!
//! [`compile`] lowers an [`Expr`] into a [`CompiledNode`] tree. Every node
//! fixes its static type up front and keeps only the state it needs to
//! execute. Children are compiled left to right, pre-order, and the first
//! error aborts the whole compilation: the result is then a single
//! [`CompiledNode::Error`] carrying that error.
//!
//! Compiling never calls host functions and depends only on the
//! [`TypeEnv`], so it is deterministic.

mod binary;
mod call;
pub mod error;
mod ident;
mod index;
mod literal;
mod selector;
mod slice;
mod type_assert;
mod unary;

#[cfg(test)]
mod tests;

pub use binary::BinaryNode;
pub use call::CallNode;
pub use error::{CompileError, CompileErrorKind};
pub use ident::IdentNode;
pub use index::IndexNode;
pub use literal::LiteralNode;
pub use selector::SelectorNode;
pub use slice::SliceNode;
pub use type_assert::TypeAssertNode;
pub use unary::UnaryNode;

use crate::api::CompilationOptions;
use crate::ast::{Expr, ExprKind, Span};
use crate::environment::{TypeEnv, ValueEnv};
use crate::evaluator::{ExecutionError, RuntimeErrorKind};
use crate::evaluator::operators::OpError;
use crate::types::{Type, TypeManager};
use crate::values::Value;
use tracing::{debug, trace};

/// An executable, statically typed expression.
///
/// Immutable once built. [`execute`](Self::execute) may be called any
/// number of times, from any number of threads, with different value
/// environments.
pub enum CompiledNode<'t> {
    Literal(LiteralNode<'t>),
    Ident(IdentNode<'t>),
    Unary(UnaryNode<'t>),
    Binary(BinaryNode<'t>),
    Call(CallNode<'t>),
    Selector(SelectorNode<'t>),
    Index(IndexNode<'t>),
    Slice(SliceNode<'t>),
    TypeAssert(TypeAssertNode<'t>),
    /// Compilation failed. Both `execute` and `return_type` report the error.
    Error(CompileError),
}

impl<'t> CompiledNode<'t> {
    pub fn execute(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, ExecutionError> {
        match self {
            CompiledNode::Literal(node) => Ok(node.execute()),
            CompiledNode::Ident(node) => node.execute(env),
            CompiledNode::Unary(node) => node.execute(env),
            CompiledNode::Binary(node) => node.execute(env),
            CompiledNode::Call(node) => node.execute(env),
            CompiledNode::Selector(node) => node.execute(env),
            CompiledNode::Index(node) => node.execute(env),
            CompiledNode::Slice(node) => node.execute(env),
            CompiledNode::TypeAssert(node) => node.execute(env),
            CompiledNode::Error(err) => Err(ExecutionError::Compile(err.clone())),
        }
    }

    /// The static type of the values `execute` produces.
    pub fn return_type(&self) -> Result<&'t Type<'t>, CompileError> {
        match self {
            CompiledNode::Literal(node) => Ok(node.ty),
            CompiledNode::Ident(node) => Ok(node.ty),
            CompiledNode::Unary(node) => Ok(node.ty),
            CompiledNode::Binary(node) => Ok(node.ty),
            CompiledNode::Call(node) => Ok(node.ty),
            CompiledNode::Selector(node) => Ok(node.ty),
            CompiledNode::Index(node) => Ok(node.ty),
            CompiledNode::Slice(node) => Ok(node.ty),
            CompiledNode::TypeAssert(node) => Ok(node.target),
            CompiledNode::Error(err) => Err(err.clone()),
        }
    }

    pub fn error(&self) -> Option<&CompileError> {
        match self {
            CompiledNode::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    /// True for a method selected on a record: its function type takes the
    /// receiver as first parameter, which calls supply implicitly.
    pub fn has_owner(&self) -> bool {
        match self {
            CompiledNode::Selector(node) => node.is_method(),
            _ => false,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            CompiledNode::Literal(node) => &node.span,
            CompiledNode::Ident(node) => &node.span,
            CompiledNode::Unary(node) => &node.span,
            CompiledNode::Binary(node) => &node.span,
            CompiledNode::Call(node) => &node.span,
            CompiledNode::Selector(node) => &node.span,
            CompiledNode::Index(node) => &node.span,
            CompiledNode::Slice(node) => &node.span,
            CompiledNode::TypeAssert(node) => &node.span,
            CompiledNode::Error(err) => &err.span,
        }
    }
}

impl core::fmt::Debug for CompiledNode<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.return_type() {
            Ok(ty) => write!(f, "CompiledNode<{}>@{}", ty, self.span()),
            Err(err) => write!(f, "CompiledNode::Error({})", err),
        }
    }
}

/// Compile `expr` against `env` with default options.
pub fn compile<'t>(env: &TypeEnv<'t>, expr: &Expr) -> CompiledNode<'t> {
    compile_with_options(env, expr, &CompilationOptions::default())
}

pub fn compile_with_options<'t>(
    env: &TypeEnv<'t>,
    expr: &Expr,
    options: &CompilationOptions,
) -> CompiledNode<'t> {
    let mut compiler = Compiler {
        env,
        types: env.types(),
        depth: 0,
        max_depth: options.max_depth,
    };
    match compiler.compile(expr) {
        Ok(node) => {
            debug!(ty = %node, "compiled expression");
            node
        }
        Err(err) => {
            debug!(error = %err, "compilation failed");
            CompiledNode::Error(err)
        }
    }
}

impl core::fmt::Display for CompiledNode<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.return_type() {
            Ok(ty) => write!(f, "{}", ty),
            Err(err) => write!(f, "{}", err),
        }
    }
}

pub(crate) struct Compiler<'e, 't> {
    env: &'e TypeEnv<'t>,
    types: &'t TypeManager<'t>,
    depth: usize,
    max_depth: usize,
}

impl<'t> Compiler<'_, 't> {
    pub(crate) fn compile(&mut self, expr: &Expr) -> Result<CompiledNode<'t>, CompileError> {
        if self.depth >= self.max_depth {
            return Err(CompileError::new(
                CompileErrorKind::TooDeep {
                    max_depth: self.max_depth,
                },
                expr.span.clone(),
            ));
        }
        self.depth += 1;
        let result = self.dispatch(expr);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, expr: &Expr) -> Result<CompiledNode<'t>, CompileError> {
        let span = &expr.span;
        trace!(pos = span.start(), depth = self.depth, "compile node");
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(self.compile_literal(literal, span)),
            ExprKind::Ident(name) => self.compile_ident(name, span),
            ExprKind::Paren(inner) => self.compile(inner),
            ExprKind::Unary { op, operand } => self.compile_unary(*op, operand, span),
            ExprKind::Binary { op, left, right } => self.compile_binary(*op, left, right, span),
            ExprKind::Call { callee, args } => self.compile_call(callee, args, span),
            ExprKind::Selector { receiver, name } => self.compile_selector(receiver, name, span),
            ExprKind::Index { receiver, index } => self.compile_index(receiver, index, span),
            ExprKind::Slice {
                receiver,
                low,
                high,
                max,
            } => self.compile_slice(
                receiver,
                low.as_deref(),
                high.as_deref(),
                max.as_deref(),
                span,
            ),
            ExprKind::TypeAssert { receiver, target } => {
                self.compile_type_assert(receiver, target, span)
            }
        }
    }
}

fn err(kind: CompileErrorKind, span: &Span) -> CompileError {
    CompileError::new(kind, span.clone())
}

fn runtime_err(kind: RuntimeErrorKind, span: &Span) -> ExecutionError {
    ExecutionError::runtime(kind, span)
}

/// Translate a failed operator application. `operands` are checked in order
/// against `expected` to name the offending one.
fn op_error(
    error: OpError,
    expected: &Type<'_>,
    operands: &[&Value<'_>],
    span: &Span,
) -> ExecutionError {
    match error {
        OpError::DivisionByZero => runtime_err(RuntimeErrorKind::DivisionByZero, span),
        OpError::Operand => {
            let found = operands
                .iter()
                .find(|value| !value.conforms_to(expected))
                .or(operands.first())
                .map(|value| value.dynamic_type().to_string())
                .unwrap_or_default();
            runtime_err(
                RuntimeErrorKind::OperandTypeMismatch {
                    expected: expected.to_string(),
                    found,
                },
                span,
            )
        }
    }
}
