use super::{CompiledNode, Compiler, err, runtime_err};
use crate::ast::{Expr, Span};
use crate::compiler::{CompileError, CompileErrorKind};
use crate::environment::ValueEnv;
use crate::evaluator::{ExecutionError, RuntimeErrorKind};
use crate::types::Type;
use crate::values::Value;

enum IndexKind<'t> {
    // A missing key yields the zero value of the element type.
    Mapping { elem: &'t Type<'t> },
    Sequence,
    // Indexing a string yields the byte at that offset.
    Str,
}

/// `receiver[index]` on a mapping, sequence, array or string.
pub struct IndexNode<'t> {
    receiver: Box<CompiledNode<'t>>,
    index: Box<CompiledNode<'t>>,
    kind: IndexKind<'t>,
    receiver_ty: &'t Type<'t>,
    key_ty: &'t Type<'t>,
    pub(super) ty: &'t Type<'t>,
    pub(super) span: Span,
}

impl<'t> IndexNode<'t> {
    pub(super) fn execute(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, ExecutionError> {
        let receiver = self.receiver.execute(env)?;
        if receiver.is_null() {
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
        if target.is_null() {
            return Err(runtime_err(RuntimeErrorKind::NullIndex, &self.span));
        }

        let index = self.index.execute(env)?;
        if !index.conforms_to(self.key_ty) {
            return Err(runtime_err(
                RuntimeErrorKind::IndexTypeMismatch {
                    expected: self.key_ty.to_string(),
                    found: index.dynamic_type().to_string(),
                },
                self.index.span(),
            ));
        }

        match (&self.kind, target) {
            (IndexKind::Mapping { elem }, Value::Mapping(map)) => Ok(map
                .get(&index)
                .cloned()
                .unwrap_or_else(|| Value::zero(*elem))),
            (IndexKind::Sequence, Value::Sequence(seq)) => {
                let i = index.as_int().unwrap_or(-1);
                usize::try_from(i)
                    .ok()
                    .and_then(|i| seq.get(i))
                    .cloned()
                    .ok_or_else(|| self.out_of_bounds(seq.len(), i))
            }
            (IndexKind::Str, Value::Str(s)) => {
                let i = index.as_int().unwrap_or(-1);
                usize::try_from(i)
                    .ok()
                    .and_then(|i| s.as_bytes().get(i))
                    .map(|byte| Value::Int(i64::from(*byte)))
                    .ok_or_else(|| self.out_of_bounds(s.len(), i))
            }
            _ => Err(runtime_err(
                RuntimeErrorKind::ReceiverTypeMismatch {
                    expected: self.receiver_ty.to_string(),
                    found: target.dynamic_type().to_string(),
                },
                &self.span,
            )),
        }
    }

    fn out_of_bounds(&self, len: usize, index: i64) -> ExecutionError {
        runtime_err(RuntimeErrorKind::IndexOutOfBounds { len, index }, &self.span)
    }
}

impl<'t> Compiler<'_, 't> {
    pub(super) fn compile_index(
        &mut self,
        receiver: &Expr,
        index: &Expr,
        span: &Span,
    ) -> Result<CompiledNode<'t>, CompileError> {
        let receiver = self.compile(receiver)?;
        let receiver_ty = receiver.return_type()?;
        let index_node = self.compile(index)?;
        let index_ty = index_node.return_type()?;

        let (kind, key_ty, ty) = match receiver_ty.without_ref() {
            Type::Mapping(key, elem) => (IndexKind::Mapping { elem: *elem }, *key, *elem),
            Type::Sequence(elem) | Type::Array(elem, _) => {
                (IndexKind::Sequence, self.types.int(), *elem)
            }
            Type::Str => (IndexKind::Str, self.types.int(), self.types.int()),
            _ => {
                return Err(err(
                    CompileErrorKind::NotIndexable {
                        ty: receiver_ty.to_string(),
                    },
                    span,
                ));
            }
        };
        if !index_ty.assignable_to(key_ty) {
            return Err(err(
                CompileErrorKind::IndexTypeMismatch {
                    expected: key_ty.to_string(),
                    found: index_ty.to_string(),
                },
                &index.span,
            ));
        }

        Ok(CompiledNode::Index(IndexNode {
            receiver: Box::new(receiver),
            index: Box::new(index_node),
            kind,
            receiver_ty,
            key_ty,
            ty,
            span: span.clone(),
        }))
    }
}
