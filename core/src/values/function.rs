//! Callable values.
//!
//! Host functions and record methods are exposed to expressions through the
//! [`Function`] trait. The engine never looks inside a callable: it checks
//! arity and argument types, invokes [`Function::call`], and validates what
//! comes back.

use super::dynamic::{HostError, Value};
use crate::types::Type;
use smallvec::SmallVec;
use std::sync::Arc;

/// Shared handle to a callable.
pub type FunctionRef<'t> = Arc<dyn Function<'t> + 't>;

/// Trait for callable runtime values.
///
/// Implementations must be safe to call from several threads at once, since
/// one compiled expression may be executed concurrently.
pub trait Function<'t>: Send + Sync {
    /// The declared signature. Always a [`Type::Function`].
    fn ty(&self) -> &'t Type<'t>;

    /// Number of arguments `call` expects.
    fn arity(&self) -> usize {
        match self.ty() {
            Type::Function { params, .. } => params.len(),
            _ => 0,
        }
    }

    /// Invoke the function.
    ///
    /// On success returns the declared results, minus the trailing `error`
    /// result when the signature has one. `Err` is surfaced to the caller of
    /// the expression unchanged.
    fn call(&self, args: &[Value<'t>]) -> Result<Vec<Value<'t>>, HostError>;
}

type NativeFn<'t> = dyn Fn(&[Value<'t>]) -> Result<Vec<Value<'t>>, HostError> + Send + Sync + 't;

/// Wrapper turning a Rust closure into a [`Function`].
///
/// # Example
///
/// ```ignore
/// let add_ty = types.function(&[types.int(), types.int()], &[types.int()]);
/// let add = NativeFunction::returning(add_ty, |args| match args {
///     [Value::Int(a), Value::Int(b)] => Value::Int(a + b),
///     _ => Value::Null,
/// });
/// ```
pub struct NativeFunction<'t> {
    ty: &'t Type<'t>,
    func: Box<NativeFn<'t>>,
}

impl<'t> NativeFunction<'t> {
    pub fn new(
        ty: &'t Type<'t>,
        func: impl Fn(&[Value<'t>]) -> Result<Vec<Value<'t>>, HostError> + Send + Sync + 't,
    ) -> Self {
        Self {
            ty,
            func: Box::new(func),
        }
    }

    /// A function with a single result and no error channel.
    pub fn returning(
        ty: &'t Type<'t>,
        func: impl Fn(&[Value<'t>]) -> Value<'t> + Send + Sync + 't,
    ) -> Self {
        Self::new(ty, move |args| Ok(vec![func(args)]))
    }
}

impl<'t> Function<'t> for NativeFunction<'t> {
    fn ty(&self) -> &'t Type<'t> {
        self.ty
    }

    fn call(&self, args: &[Value<'t>]) -> Result<Vec<Value<'t>>, HostError> {
        (self.func)(args)
    }
}

/// A record method with its receiver already supplied.
///
/// This is what selecting a method yields at runtime. Calling it prepends
/// the receiver to the explicit arguments.
pub struct BoundMethod<'t> {
    ty: &'t Type<'t>,
    receiver: Value<'t>,
    method: FunctionRef<'t>,
}

impl<'t> BoundMethod<'t> {
    /// `ty` is the method signature without the receiver.
    pub fn new(ty: &'t Type<'t>, receiver: Value<'t>, method: FunctionRef<'t>) -> Self {
        Self {
            ty,
            receiver,
            method,
        }
    }

    pub fn receiver(&self) -> &Value<'t> {
        &self.receiver
    }
}

impl<'t> Function<'t> for BoundMethod<'t> {
    fn ty(&self) -> &'t Type<'t> {
        self.ty
    }

    fn arity(&self) -> usize {
        self.method.arity().saturating_sub(1)
    }

    fn call(&self, args: &[Value<'t>]) -> Result<Vec<Value<'t>>, HostError> {
        let mut full: SmallVec<[Value<'t>; 4]> = SmallVec::with_capacity(args.len() + 1);
        full.push(self.receiver.clone());
        full.extend(args.iter().cloned());
        self.method.call(&full)
    }
}
