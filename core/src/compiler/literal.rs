use super::{CompiledNode, Compiler};
use crate::ast::{Literal, Span};
use crate::types::Type;
use crate::values::Value;

/// A constant.
pub struct LiteralNode<'t> {
    pub(super) value: Value<'t>,
    pub(super) ty: &'t Type<'t>,
    pub(super) span: Span,
}

impl<'t> LiteralNode<'t> {
    pub(super) fn new(value: Value<'t>, ty: &'t Type<'t>, span: &Span) -> Self {
        Self {
            value,
            ty,
            span: span.clone(),
        }
    }

    pub fn value(&self) -> &Value<'t> {
        &self.value
    }

    pub(super) fn execute(&self) -> Value<'t> {
        self.value.clone()
    }
}

impl<'t> Compiler<'_, 't> {
    pub(super) fn compile_literal(&self, literal: &Literal, span: &Span) -> CompiledNode<'t> {
        let (value, ty) = match literal {
            Literal::Int(i) => (Value::int(*i), self.types.int()),
            Literal::Double(d) => (Value::double(*d), self.types.double()),
            Literal::Bool(b) => (Value::bool(*b), self.types.bool()),
            Literal::Str(s) => (Value::str(s), self.types.str()),
            Literal::Char(c) => (Value::str(c.encode_utf8(&mut [0; 4])), self.types.str()),
        };
        CompiledNode::Literal(LiteralNode::new(value, ty, span))
    }
}
