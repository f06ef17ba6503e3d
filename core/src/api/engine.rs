//! The compilation engine.

use super::{CompiledExpression, EngineOptions, EnvironmentBuilder, Error};
use crate::ast::Expr;
use crate::compiler::compile_with_options;
use crate::environment::{TypeEnv, ValueEnv};
use crate::types::{Type, TypeManager};
use bumpalo::Bump;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// The compilation and execution engine.
///
/// The engine manages:
/// - the type system ([`TypeManager`])
/// - the globals every expression can see
/// - configuration ([`EngineOptions`])
///
/// # Lifetimes
///
/// - `'t`: lifetime of the arena holding the types. Compiled expressions
///   and the values they produce borrow from it.
///
/// # Example
///
/// ```ignore
/// let arena = Bump::new();
/// let engine = Engine::new(&arena, EngineOptions::default(), |types, env| {
///     let add_ty = types.function(&[types.int(), types.int()], &[types.int()]);
///     env.register(
///         "add",
///         Value::function(NativeFunction::returning(add_ty, |args| match args {
///             [Value::Int(a), Value::Int(b)] => Value::Int(a + b),
///             _ => Value::Null,
///         })),
///     );
/// });
/// ```
pub struct Engine<'t> {
    type_manager: &'t TypeManager<'t>,
    types: Rc<TypeEnv<'t>>,
    globals: Arc<ValueEnv<'t>>,
    options: EngineOptions,
}

impl<'t> Engine<'t> {
    /// Create a new engine. `init` registers globals and named types.
    pub fn new(
        arena: &'t Bump,
        options: EngineOptions,
        init: impl FnOnce(&'t TypeManager<'t>, &mut EnvironmentBuilder<'t>),
    ) -> Self {
        let type_manager = TypeManager::new(arena);

        let mut env_builder = EnvironmentBuilder::new(type_manager);
        init(type_manager, &mut env_builder);
        let (types, globals) = env_builder.build();

        Self {
            type_manager,
            types: Rc::new(types),
            globals: Arc::new(globals),
            options,
        }
    }

    /// Access the type manager, for building types and typed values.
    pub fn type_manager(&self) -> &'t TypeManager<'t> {
        self.type_manager
    }

    /// The type environment expressions are compiled against.
    pub fn type_env(&self) -> &Rc<TypeEnv<'t>> {
        &self.types
    }

    /// The global values expressions run with.
    pub fn globals(&self) -> &Arc<ValueEnv<'t>> {
        &self.globals
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Compile an expression.
    ///
    /// `params` are bound on top of the globals, shadowing them, and are
    /// supplied positionally to [`CompiledExpression::run`].
    pub fn compile(
        &self,
        expr: &Expr,
        params: &[(&str, &'t Type<'t>)],
    ) -> Result<CompiledExpression<'t>, Error> {
        let mut builder = self.types.extend();
        for (name, ty) in params {
            builder = builder.register(name, *ty);
        }
        let env = builder.build();

        let node = compile_with_options(&env, expr, &self.options.compilation);
        let return_type = match node.return_type() {
            Ok(ty) => ty,
            Err(err) => {
                debug!(error = %err, "engine compile failed");
                return Err(err.into());
            }
        };

        let params = params
            .iter()
            .map(|(name, ty)| (name.to_string(), *ty))
            .collect();
        Ok(CompiledExpression::new(
            node,
            return_type,
            params,
            Arc::clone(&self.globals),
        ))
    }
}
