use super::{CompiledNode, Compiler, err, op_error, runtime_err};
use crate::ast::{Expr, Span, UnaryOp};
use crate::compiler::{CompileError, CompileErrorKind};
use crate::environment::ValueEnv;
use crate::evaluator::operators::{UnaryFn, unary_operator};
use crate::evaluator::{ExecutionError, RuntimeErrorKind};
use crate::types::Type;
use crate::values::Value;

/// `!x`, `-x` or `+x`.
pub struct UnaryNode<'t> {
    op: UnaryOp,
    operand: Box<CompiledNode<'t>>,
    apply: UnaryFn,
    pub(super) ty: &'t Type<'t>,
    pub(super) span: Span,
}

impl<'t> UnaryNode<'t> {
    pub fn op(&self) -> UnaryOp {
        self.op
    }

    pub(super) fn execute(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, ExecutionError> {
        let operand = self.operand.execute(env)?;
        if !operand.conforms_to(self.ty) {
            return Err(runtime_err(
                RuntimeErrorKind::OperandTypeMismatch {
                    expected: self.ty.to_string(),
                    found: operand.dynamic_type().to_string(),
                },
                &self.span,
            ));
        }
        (self.apply)(&operand).map_err(|e| op_error(e, self.ty, &[&operand], &self.span))
    }
}

impl<'t> Compiler<'_, 't> {
    pub(super) fn compile_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        span: &Span,
    ) -> Result<CompiledNode<'t>, CompileError> {
        let operand = self.compile(operand)?;
        let ty = operand.return_type()?;
        let apply = ty
            .primitive()
            .and_then(|kind| unary_operator(op, kind))
            .ok_or_else(|| {
                err(
                    CompileErrorKind::UnsupportedUnary {
                        op,
                        ty: ty.to_string(),
                    },
                    span,
                )
            })?;
        Ok(CompiledNode::Unary(UnaryNode {
            op,
            operand: Box::new(operand),
            apply,
            ty,
            span: span.clone(),
        }))
    }
}
