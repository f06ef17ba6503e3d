use super::{CompiledNode, Compiler, LiteralNode, err, runtime_err};
use crate::ast::Span;
use crate::compiler::{CompileError, CompileErrorKind};
use crate::environment::{TypeBinding, ValueEnv};
use crate::evaluator::{ExecutionError, RuntimeErrorKind};
use crate::types::Type;
use crate::values::Value;

/// A variable read from the value environment.
pub struct IdentNode<'t> {
    name: String,
    pub(super) ty: &'t Type<'t>,
    pub(super) span: Span,
}

impl<'t> IdentNode<'t> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn execute(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, ExecutionError> {
        let value = env.lookup(&self.name).ok_or_else(|| {
            runtime_err(
                RuntimeErrorKind::UndefinedIdentifier {
                    name: self.name.clone(),
                },
                &self.span,
            )
        })?;
        if !value.conforms_to(self.ty) {
            return Err(runtime_err(
                RuntimeErrorKind::ValueTypeMismatch {
                    name: self.name.clone(),
                    expected: self.ty.to_string(),
                    found: value.dynamic_type().to_string(),
                },
                &self.span,
            ));
        }
        Ok(value.clone())
    }
}

impl<'t> Compiler<'_, 't> {
    pub(super) fn compile_ident(
        &self,
        name: &str,
        span: &Span,
    ) -> Result<CompiledNode<'t>, CompileError> {
        // Built-in names shadow the environment.
        let builtin = match name {
            "true" => Some((Value::bool(true), self.types.bool())),
            "false" => Some((Value::bool(false), self.types.bool())),
            "null" => Some((Value::Null, self.types.any())),
            _ => None,
        };
        if let Some((value, ty)) = builtin {
            return Ok(CompiledNode::Literal(LiteralNode::new(value, ty, span)));
        }

        match self.env.lookup(name) {
            Some(TypeBinding::Var(ty)) => Ok(CompiledNode::Ident(IdentNode {
                name: name.to_string(),
                ty,
                span: span.clone(),
            })),
            Some(TypeBinding::Named(_)) => Err(err(
                CompileErrorKind::NotAValue {
                    name: name.to_string(),
                },
                span,
            )),
            None => Err(err(
                CompileErrorKind::UnknownIdentifier {
                    name: name.to_string(),
                },
                span,
            )),
        }
    }
}
