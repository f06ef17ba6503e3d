//! Runtime support shared by the compiled nodes: error types and the
//! operator dispatch tables.

mod error;
pub(crate) mod operators;

pub use error::{ExecutionError, RuntimeError, RuntimeErrorKind, SliceBound};
