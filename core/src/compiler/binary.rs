use super::{CompiledNode, Compiler, err, op_error, runtime_err};
use crate::ast::{BinaryOp, Expr, Span};
use crate::compiler::{CompileError, CompileErrorKind};
use crate::environment::ValueEnv;
use crate::evaluator::operators::{BinaryFn, binary_operator, is_supported};
use crate::evaluator::{ExecutionError, RuntimeErrorKind};
use crate::types::{Primitive, Type};
use crate::values::Value;

enum Apply {
    Table(BinaryFn),
    Equal,
    NotEqual,
}

/// A binary operator applied to two operands of a common type.
pub struct BinaryNode<'t> {
    op: BinaryOp,
    left: Box<CompiledNode<'t>>,
    right: Box<CompiledNode<'t>>,
    // Static type of the left operand; the right operand is checked against it.
    operand_ty: &'t Type<'t>,
    apply: Apply,
    pub(super) ty: &'t Type<'t>,
    pub(super) span: Span,
}

impl<'t> BinaryNode<'t> {
    pub fn op(&self) -> BinaryOp {
        self.op
    }

    pub(super) fn execute(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, ExecutionError> {
        let left = self.left.execute(env)?;
        // && and || short-circuit.
        match (self.op, &left) {
            (BinaryOp::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
            (BinaryOp::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
            _ => {}
        }
        let right = self.right.execute(env)?;
        if !right.conforms_to(self.operand_ty) {
            return Err(runtime_err(
                RuntimeErrorKind::OperandTypeMismatch {
                    expected: self.operand_ty.to_string(),
                    found: right.dynamic_type().to_string(),
                },
                &self.span,
            ));
        }
        match self.apply {
            Apply::Equal => Ok(Value::Bool(left == right)),
            Apply::NotEqual => Ok(Value::Bool(left != right)),
            Apply::Table(apply) => apply(&left, &right)
                .map_err(|e| op_error(e, self.operand_ty, &[&left, &right], &self.span)),
        }
    }
}

impl<'t> Compiler<'_, 't> {
    pub(super) fn compile_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: &Span,
    ) -> Result<CompiledNode<'t>, CompileError> {
        let left = self.compile(left)?;
        let right = self.compile(right)?;
        let left_ty = left.return_type()?;
        let right_ty = right.return_type()?;

        if !left_ty.assignable_to(right_ty) {
            return Err(err(
                CompileErrorKind::BinaryTypeMismatch {
                    left: left_ty.to_string(),
                    right: right_ty.to_string(),
                },
                span,
            ));
        }

        let (apply, ty) = match op {
            BinaryOp::Eq => (Apply::Equal, self.types.bool()),
            BinaryOp::Ne => (Apply::NotEqual, self.types.bool()),
            _ => {
                let kind = left_ty.primitive().ok_or_else(|| {
                    err(
                        CompileErrorKind::UnsupportedBinaryType {
                            ty: left_ty.to_string(),
                        },
                        span,
                    )
                })?;
                if !is_supported(op) {
                    return Err(err(CompileErrorKind::UnsupportedBinaryOp { op }, span));
                }
                let operator = binary_operator(op, kind).ok_or_else(|| {
                    err(
                        CompileErrorKind::UnsupportedOperandType {
                            op,
                            ty: left_ty.to_string(),
                        },
                        span,
                    )
                })?;
                (Apply::Table(operator.apply), self.primitive_type(operator.result))
            }
        };

        Ok(CompiledNode::Binary(BinaryNode {
            op,
            left: Box::new(left),
            right: Box::new(right),
            operand_ty: left_ty,
            apply,
            ty,
            span: span.clone(),
        }))
    }

    fn primitive_type(&self, kind: Primitive) -> &'t Type<'t> {
        match kind {
            Primitive::Int => self.types.int(),
            Primitive::Double => self.types.double(),
            Primitive::Str => self.types.str(),
            Primitive::Bool => self.types.bool(),
        }
    }
}
