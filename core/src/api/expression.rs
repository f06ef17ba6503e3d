//! Compiled expressions.

use super::Error;
use crate::compiler::CompiledNode;
use crate::environment::ValueEnv;
use crate::types::Type;
use crate::values::Value;
use std::sync::Arc;

/// A compiled expression ready for execution.
///
/// Holds no mutable state: it can be run repeatedly, and from several
/// threads at once, as long as the host functions it calls allow that.
///
/// # Example
///
/// ```ignore
/// let expr = engine.compile(&tree, &[("x", int_ty), ("y", int_ty)])?;
/// let result = expr.run(&[Value::int(10), Value::int(32)])?;
/// ```
pub struct CompiledExpression<'t> {
    node: CompiledNode<'t>,
    return_type: &'t Type<'t>,
    params: Vec<(String, &'t Type<'t>)>,
    globals: Arc<ValueEnv<'t>>,
}

impl<'t> CompiledExpression<'t> {
    pub(crate) fn new(
        node: CompiledNode<'t>,
        return_type: &'t Type<'t>,
        params: Vec<(String, &'t Type<'t>)>,
        globals: Arc<ValueEnv<'t>>,
    ) -> Self {
        Self {
            node,
            return_type,
            params,
            globals,
        }
    }

    /// Execute with the engine globals plus positional arguments.
    ///
    /// Argument count and types are validated before evaluation starts.
    pub fn run(&self, args: &[Value<'t>]) -> Result<Value<'t>, Error> {
        if args.len() != self.params.len() {
            return Err(Error::Api(format!(
                "Argument count mismatch: expected {}, got {}",
                self.params.len(),
                args.len()
            )));
        }

        let mut env = self.globals.extend();
        for (i, (arg, (name, expected))) in args.iter().zip(&self.params).enumerate() {
            if !arg.conforms_to(expected) {
                return Err(Error::Api(format!(
                    "Type mismatch for parameter {} ({}): expected {}, got {}",
                    i,
                    name,
                    expected,
                    arg.dynamic_type()
                )));
            }
            env = env.register(name, arg.clone());
        }

        self.run_in(&env.build())
    }

    /// Execute against a caller-built environment. Engine globals are not
    /// visible unless `env` was extended from [`Engine::globals`](super::Engine::globals).
    pub fn run_in(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, Error> {
        self.node.execute(env).map_err(Error::from)
    }

    /// Parameters as (name, type) pairs, in positional order.
    pub fn params(&self) -> &[(String, &'t Type<'t>)] {
        &self.params
    }

    pub fn return_type(&self) -> &'t Type<'t> {
        self.return_type
    }

    /// The underlying node tree.
    pub fn node(&self) -> &CompiledNode<'t> {
        &self.node
    }
}
