//! Embedding API.
//!
//! [`Engine`] owns the type arena and the globals every expression can see.
//! It compiles [`Expr`](crate::ast::Expr) trees into [`CompiledExpression`]s,
//! which can then be run any number of times with different arguments.
//!
//! # Example
//!
//! ```ignore
//! use sift_core::api::{Engine, EngineOptions};
//! use sift_core::ast::{BinaryOp, Expr};
//! use sift_core::values::{NativeFunction, Value};
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let engine = Engine::new(&arena, EngineOptions::default(), |types, env| {
//!     env.register("limit", Value::int(10));
//! });
//!
//! let int = engine.type_manager().int();
//! // x < limit
//! let expr = Expr::binary(BinaryOp::Lt, Expr::ident("x", 0), Expr::ident("limit", 4), 2);
//! let compiled = engine.compile(&expr, &[("x", int)]).unwrap();
//! assert_eq!(compiled.run(&[Value::int(3)]).unwrap(), Value::bool(true));
//! ```

pub mod engine;
pub mod environment;
pub mod error;
pub mod expression;
pub mod options;


pub use engine::Engine;
pub use environment::EnvironmentBuilder;
pub use error::{Diagnostic, Error};
pub use expression::CompiledExpression;
pub use options::{CompilationOptions, EngineOptions};
