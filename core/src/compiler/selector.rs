use super::{CompiledNode, Compiler, err, runtime_err};
use crate::ast::{Expr, Span};
use crate::compiler::{CompileError, CompileErrorKind};
use crate::environment::ValueEnv;
use crate::evaluator::{ExecutionError, RuntimeErrorKind};
use crate::types::Type;
use crate::values::{BoundMethod, Value};
use std::sync::Arc;

enum Member<'t> {
    Field,
    // Signature without the receiver.
    Method(&'t Type<'t>),
}

/// `receiver.name`, selecting a record field or method. A reference
/// receiver is followed one level; methods are always bound to the record
/// itself.
pub struct SelectorNode<'t> {
    receiver: Box<CompiledNode<'t>>,
    name: String,
    member: Member<'t>,
    pub(super) ty: &'t Type<'t>,
    pub(super) span: Span,
}

impl<'t> SelectorNode<'t> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_method(&self) -> bool {
        matches!(self.member, Member::Method(_))
    }

    pub(super) fn execute(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, ExecutionError> {
        let receiver = self.receiver.execute(env)?;
        let record = match receiver.deref() {
            Value::Null => {
                return Err(runtime_err(RuntimeErrorKind::NullDereference, &self.span));
            }
            Value::Record(record) => record,
            other => {
                return Err(runtime_err(
                    RuntimeErrorKind::UnknownSelector {
                        name: self.name.clone(),
                        ty: other.dynamic_type().to_string(),
                    },
                    &self.span,
                ));
            }
        };

        let unknown = || {
            runtime_err(
                RuntimeErrorKind::UnknownSelector {
                    name: self.name.clone(),
                    ty: record.ty().to_string(),
                },
                &self.span,
            )
        };
        match self.member {
            Member::Field => record.field(&self.name).cloned().ok_or_else(unknown),
            Member::Method(sig) => {
                if record.ty().method(&self.name).is_none() {
                    return Err(unknown());
                }
                // A zero record has no implementations; calling it reports a
                // missing function.
                Ok(match record.method(&self.name) {
                    Some(method) => Value::Function(Arc::new(BoundMethod::new(
                        sig,
                        receiver.deref().clone(),
                        Arc::clone(method),
                    ))),
                    None => Value::Null,
                })
            }
        }
    }
}

impl<'t> Compiler<'_, 't> {
    pub(super) fn compile_selector(
        &mut self,
        receiver: &Expr,
        name: &str,
        span: &Span,
    ) -> Result<CompiledNode<'t>, CompileError> {
        let receiver = self.compile(receiver)?;
        let receiver_ty = receiver.return_type()?;
        let record_ty = receiver_ty.without_ref();

        let (member, ty) = if let Some(field) = record_ty.field(name) {
            (Member::Field, field)
        } else if let Some(sig) = record_ty.method(name) {
            (Member::Method(sig), self.types.method_type(record_ty, sig))
        } else {
            return Err(err(
                CompileErrorKind::UnknownSelector {
                    name: name.to_string(),
                    ty: receiver_ty.to_string(),
                },
                span,
            ));
        };

        Ok(CompiledNode::Selector(SelectorNode {
            receiver: Box::new(receiver),
            name: name.to_string(),
            member,
            ty,
            span: span.clone(),
        }))
    }
}
