//! Name bindings consulted by the two phases.
//!
//! A [`TypeEnv`] is read while compiling, a [`ValueEnv`] while executing.
//! Both are immutable once built and can be layered: a child environment
//! shadows its parent and falls back to it for names it does not bind.
//!
//! The two are built independently. Nothing forces a value environment to
//! agree with the type environment an expression was compiled against, which
//! is why compiled nodes re-check every value they read.

use crate::types::{Type, TypeManager};
use crate::values::Value;
use hashbrown::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// What a name means at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeBinding<'t> {
    /// A variable of the given type.
    Var(&'t Type<'t>),
    /// A type name, usable as a type-assertion target.
    Named(&'t Type<'t>),
}

pub struct TypeEnv<'t> {
    types: &'t TypeManager<'t>,
    parent: Option<Rc<TypeEnv<'t>>>,
    bindings: HashMap<String, TypeBinding<'t>>,
}

impl<'t> TypeEnv<'t> {
    /// An environment binding nothing.
    pub fn new(types: &'t TypeManager<'t>) -> Self {
        Self {
            types,
            parent: None,
            bindings: HashMap::new(),
        }
    }

    pub fn builder(types: &'t TypeManager<'t>) -> TypeEnvBuilder<'t> {
        TypeEnvBuilder {
            env: Self::new(types),
        }
    }

    /// Start a child environment layered over `self`.
    pub fn extend(self: &Rc<Self>) -> TypeEnvBuilder<'t> {
        TypeEnvBuilder {
            env: Self {
                types: self.types,
                parent: Some(Rc::clone(self)),
                bindings: HashMap::new(),
            },
        }
    }

    pub fn types(&self) -> &'t TypeManager<'t> {
        self.types
    }

    pub fn lookup(&self, name: &str) -> Option<TypeBinding<'t>> {
        match self.bindings.get(name) {
            Some(binding) => Some(*binding),
            None => self.parent.as_ref().and_then(|parent| parent.lookup(name)),
        }
    }

    /// The type of the variable `name`.
    pub fn lookup_type(&self, name: &str) -> Option<&'t Type<'t>> {
        match self.lookup(name)? {
            TypeBinding::Var(ty) => Some(ty),
            TypeBinding::Named(_) => None,
        }
    }

    /// The type named `name`.
    pub fn lookup_named_type(&self, name: &str) -> Option<&'t Type<'t>> {
        match self.lookup(name)? {
            TypeBinding::Named(ty) => Some(ty),
            TypeBinding::Var(_) => None,
        }
    }
}

pub struct TypeEnvBuilder<'t> {
    env: TypeEnv<'t>,
}

impl<'t> TypeEnvBuilder<'t> {
    /// Bind a variable. Rebinding a name replaces the earlier binding.
    pub fn register(mut self, name: &str, ty: &'t Type<'t>) -> Self {
        self.env
            .bindings
            .insert(name.to_string(), TypeBinding::Var(ty));
        self
    }

    /// Bind a type name.
    pub fn register_type(mut self, name: &str, ty: &'t Type<'t>) -> Self {
        self.env
            .bindings
            .insert(name.to_string(), TypeBinding::Named(ty));
        self
    }

    pub fn build(self) -> TypeEnv<'t> {
        self.env
    }
}

/// Runtime bindings. Shareable across threads when the values it holds are.
#[derive(Default)]
pub struct ValueEnv<'t> {
    parent: Option<Arc<ValueEnv<'t>>>,
    bindings: HashMap<String, Value<'t>>,
}

impl<'t> ValueEnv<'t> {
    pub fn new() -> Self {
        Self {
            parent: None,
            bindings: HashMap::new(),
        }
    }

    pub fn builder() -> ValueEnvBuilder<'t> {
        ValueEnvBuilder { env: Self::new() }
    }

    /// Start a child environment layered over `self`.
    pub fn extend(self: &Arc<Self>) -> ValueEnvBuilder<'t> {
        ValueEnvBuilder {
            env: Self {
                parent: Some(Arc::clone(self)),
                bindings: HashMap::new(),
            },
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value<'t>> {
        match self.bindings.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|parent| parent.lookup(name)),
        }
    }
}

pub struct ValueEnvBuilder<'t> {
    env: ValueEnv<'t>,
}

impl<'t> ValueEnvBuilder<'t> {
    /// Bind a value. Rebinding a name replaces the earlier binding.
    pub fn register(mut self, name: &str, value: Value<'t>) -> Self {
        self.env.bindings.insert(name.to_string(), value);
        self
    }

    pub fn build(self) -> ValueEnv<'t> {
        self.env
    }
}

impl<'t, S: AsRef<str>> FromIterator<(S, Value<'t>)> for ValueEnv<'t> {
    fn from_iter<I: IntoIterator<Item = (S, Value<'t>)>>(iter: I) -> Self {
        Self {
            parent: None,
            bindings: iter
                .into_iter()
                .map(|(name, value)| (name.as_ref().to_string(), value))
                .collect(),
        }
    }
}
