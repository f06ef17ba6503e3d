use super::{CompiledNode, Compiler, LiteralNode, err, runtime_err};
use crate::ast::{Expr, Span};
use crate::compiler::{CompileError, CompileErrorKind};
use crate::environment::ValueEnv;
use crate::evaluator::{ExecutionError, RuntimeErrorKind, SliceBound};
use crate::types::Type;
use crate::values::Value;

/// Upper bound of a slice. When omitted it tracks the length of the
/// receiver value actually being sliced.
enum HighBound<'t> {
    Node(Box<CompiledNode<'t>>),
    ReceiverLength,
}

/// `receiver[low:high]` or `receiver[low:high:max]`.
///
/// Sequences are re-viewed without copying; strings are sliced by byte
/// offset.
pub struct SliceNode<'t> {
    receiver: Box<CompiledNode<'t>>,
    low: Box<CompiledNode<'t>>,
    high: HighBound<'t>,
    max: Option<Box<CompiledNode<'t>>>,
    receiver_ty: &'t Type<'t>,
    pub(super) ty: &'t Type<'t>,
    pub(super) span: Span,
}

impl<'t> SliceNode<'t> {
    pub fn is_full(&self) -> bool {
        self.max.is_some()
    }

    pub(super) fn execute(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, ExecutionError> {
        let receiver = self.receiver.execute(env)?;
        if receiver.is_null() || receiver.deref().is_null() {
            return Err(runtime_err(RuntimeErrorKind::NullIndex, &self.span));
        }
        if !receiver.conforms_to(self.receiver_ty) {
            return Err(runtime_err(
                RuntimeErrorKind::ReceiverTypeMismatch {
                    expected: self.receiver_ty.to_string(),
                    found: receiver.dynamic_type().to_string(),
                },
                &self.span,
            ));
        }
        let target = receiver.deref();
        let mismatch = || {
            runtime_err(
                RuntimeErrorKind::ReceiverTypeMismatch {
                    expected: self.receiver_ty.to_string(),
                    found: target.dynamic_type().to_string(),
                },
                &self.span,
            )
        };
        let (len, cap) = match target {
            Value::Sequence(seq) => (seq.len(), seq.cap()),
            Value::Str(s) => (s.len(), s.len()),
            _ => return Err(mismatch()),
        };

        let low = self.bound(env, &self.low, SliceBound::Low, 0, len as i64 - 1)?;
        let high = match &self.high {
            HighBound::Node(node) => self.bound(env, node, SliceBound::High, low, len as i64)?,
            HighBound::ReceiverLength => len,
        };
        let max = match &self.max {
            Some(node) => self.bound(env, node, SliceBound::Max, high, cap as i64)?,
            None => cap,
        };

        match target {
            Value::Sequence(seq) => seq
                .slice(self.ty, low, high, max)
                .map(Value::Sequence)
                .ok_or_else(|| {
                    runtime_err(
                        RuntimeErrorKind::SliceBoundOutOfRange {
                            bound: SliceBound::Max,
                            value: max as i64,
                        },
                        &self.span,
                    )
                }),
            Value::Str(s) => s.get(low..high).map(Value::str).ok_or_else(|| {
                runtime_err(RuntimeErrorKind::NotCharBoundary { low, high }, &self.span)
            }),
            _ => Err(mismatch()),
        }
    }

    /// Evaluate one bound and check it lies in `[min, max]`.
    fn bound(
        &self,
        env: &ValueEnv<'t>,
        node: &CompiledNode<'t>,
        which: SliceBound,
        min: usize,
        max: i64,
    ) -> Result<usize, ExecutionError> {
        let value = node.execute(env)?;
        let Value::Int(index) = value else {
            return Err(runtime_err(
                RuntimeErrorKind::SliceIndexType {
                    bound: which,
                    found: value.dynamic_type().to_string(),
                },
                node.span(),
            ));
        };
        if index < min as i64 || index > max {
            return Err(runtime_err(
                RuntimeErrorKind::SliceBoundOutOfRange {
                    bound: which,
                    value: index,
                },
                node.span(),
            ));
        }
        Ok(index as usize)
    }
}

impl<'t> Compiler<'_, 't> {
    pub(super) fn compile_slice(
        &mut self,
        receiver: &Expr,
        low: Option<&Expr>,
        high: Option<&Expr>,
        max: Option<&Expr>,
        span: &Span,
    ) -> Result<CompiledNode<'t>, CompileError> {
        let receiver = self.compile(receiver)?;
        let receiver_ty = receiver.return_type()?;
        let ty = receiver_ty.without_ref();
        match (ty, max.is_some()) {
            (Type::Sequence(_), _) | (Type::Str, false) => {}
            (_, full) => {
                let expected = if full { "a slice" } else { "a slice or string" };
                return Err(err(
                    CompileErrorKind::SliceTypeMismatch {
                        expected,
                        found: receiver_ty.to_string(),
                    },
                    receiver.span(),
                ));
            }
        }

        let low = match low {
            Some(expr) => self.compile_bound(expr)?,
            None => CompiledNode::Literal(LiteralNode::new(Value::Int(0), self.types.int(), span)),
        };
        let high = match high {
            Some(expr) => HighBound::Node(Box::new(self.compile_bound(expr)?)),
            None => HighBound::ReceiverLength,
        };
        let max = max
            .map(|expr| self.compile_bound(expr).map(Box::new))
            .transpose()?;

        Ok(CompiledNode::Slice(SliceNode {
            receiver: Box::new(receiver),
            low: Box::new(low),
            high,
            max,
            receiver_ty,
            ty,
            span: span.clone(),
        }))
    }

    fn compile_bound(&mut self, expr: &Expr) -> Result<CompiledNode<'t>, CompileError> {
        let node = self.compile(expr)?;
        let ty = node.return_type()?;
        if !matches!(ty, Type::Int) {
            return Err(err(
                CompileErrorKind::SliceIndexType {
                    found: ty.to_string(),
                },
                &expr.span,
            ));
        }
        Ok(node)
    }
}
