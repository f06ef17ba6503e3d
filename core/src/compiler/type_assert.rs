use super::{CompiledNode, Compiler, err, runtime_err};
use crate::ast::{Expr, ExprKind, Span};
use crate::compiler::{CompileError, CompileErrorKind};
use crate::environment::{TypeBinding, ValueEnv};
use crate::evaluator::{ExecutionError, RuntimeErrorKind};
use crate::types::Type;
use crate::values::Value;

/// `receiver.(T)`, where `T` names a type known at compile time.
pub struct TypeAssertNode<'t> {
    receiver: Box<CompiledNode<'t>>,
    pub(super) target: &'t Type<'t>,
    pub(super) span: Span,
}

impl<'t> TypeAssertNode<'t> {
    pub fn target(&self) -> &'t Type<'t> {
        self.target
    }

    pub(super) fn execute(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, ExecutionError> {
        let value = self.receiver.execute(env)?;
        if value.conforms_to(self.target) {
            Ok(value)
        } else {
            Err(runtime_err(
                RuntimeErrorKind::AssertionFailed {
                    found: value.dynamic_type().to_string(),
                    expected: self.target.to_string(),
                },
                &self.span,
            ))
        }
    }
}

impl<'t> Compiler<'_, 't> {
    pub(super) fn compile_type_assert(
        &mut self,
        receiver: &Expr,
        target: &Expr,
        span: &Span,
    ) -> Result<CompiledNode<'t>, CompileError> {
        let receiver = self.compile(receiver)?;
        receiver.return_type()?;
        let target = self.resolve_type(target)?;
        Ok(CompiledNode::TypeAssert(TypeAssertNode {
            receiver: Box::new(receiver),
            target,
            span: span.clone(),
        }))
    }

    /// Built-in type names first, then names bound with `register_type`.
    fn resolve_type(&self, target: &Expr) -> Result<&'t Type<'t>, CompileError> {
        let name = match &target.kind {
            ExprKind::Ident(name) => name,
            ExprKind::Paren(inner) => return self.resolve_type(inner),
            _ => return Err(err(CompileErrorKind::UnsupportedAssertTarget, &target.span)),
        };
        let builtin = match name.as_str() {
            "int" => Some(self.types.int()),
            "double" => Some(self.types.double()),
            "string" => Some(self.types.str()),
            "bool" => Some(self.types.bool()),
            "error" => Some(self.types.error()),
            "any" => Some(self.types.any()),
            _ => None,
        };
        if let Some(ty) = builtin {
            return Ok(ty);
        }
        match self.env.lookup(name) {
            Some(TypeBinding::Named(ty)) => Ok(ty),
            Some(TypeBinding::Var(_)) => Err(err(
                CompileErrorKind::NotAType { name: name.clone() },
                &target.span,
            )),
            None => Err(err(
                CompileErrorKind::UnknownType { name: name.clone() },
                &target.span,
            )),
        }
    }
}
