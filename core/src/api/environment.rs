//! Builder for the globals an engine exposes.

use crate::environment::{TypeEnv, ValueEnv};
use crate::types::{Type, TypeManager};
use crate::values::{Value, ValueError};

/// Registers global values and named types while an [`Engine`](super::Engine)
/// is being built.
///
/// Each global is bound twice: its type for compilation and its value for
/// execution, so the two environments cannot drift apart.
pub struct EnvironmentBuilder<'t> {
    type_manager: &'t TypeManager<'t>,
    globals: Vec<(String, &'t Type<'t>, Value<'t>)>,
    named_types: Vec<(String, &'t Type<'t>)>,
}

impl<'t> EnvironmentBuilder<'t> {
    pub(crate) fn new(type_manager: &'t TypeManager<'t>) -> Self {
        Self {
            type_manager,
            globals: Vec::new(),
            named_types: Vec::new(),
        }
    }

    /// Register a global typed as the value's dynamic type.
    pub fn register(&mut self, name: &str, value: Value<'t>) {
        let ty = value.dynamic_type();
        self.globals.push((name.to_string(), ty, value));
    }

    /// Register a global with an explicit static type, which the value must
    /// conform to. Needed for `null` and for widening, e.g. to `any`.
    pub fn register_as(
        &mut self,
        name: &str,
        ty: &'t Type<'t>,
        value: Value<'t>,
    ) -> Result<(), ValueError> {
        if !value.conforms_to(ty) {
            return Err(ValueError::GlobalTypeMismatch {
                name: name.to_string(),
                expected: ty.to_string(),
                found: value.dynamic_type().to_string(),
            });
        }
        self.globals.push((name.to_string(), ty, value));
        Ok(())
    }

    /// Register a type name usable as a type-assertion target.
    pub fn register_type(&mut self, name: &str, ty: &'t Type<'t>) {
        self.named_types.push((name.to_string(), ty));
    }

    /// Later registrations of a name replace earlier ones.
    pub(crate) fn build(self) -> (TypeEnv<'t>, ValueEnv<'t>) {
        let mut types = TypeEnv::builder(self.type_manager);
        let mut values = ValueEnv::builder();
        for (name, ty) in self.named_types {
            types = types.register_type(&name, ty);
        }
        for (name, ty, value) in self.globals {
            types = types.register(&name, ty);
            values = values.register(&name, value);
        }
        (types.build(), values.build())
    }
}
