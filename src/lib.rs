//! Sift - an embeddable, statically typed expression engine
//!
//! # Overview
//!
//! Sift evaluates small expressions over host-provided values: request
//! filters, routing rules, feature-flag conditions and similar predicates.
//! Hosts build an expression tree ([`Expr`]) with whatever front end they
//! like, compile it once against the types of the names it may use, and run
//! it as often as needed.
//!
//! Compilation catches type errors up front. Execution never panics on bad
//! input: mismatched values, out-of-range indices and failing host
//! functions all surface as [`Error`]s.
//!
//! # Quick Start
//!
//! ```ignore
//! use sift::{BinaryOp, Bump, Engine, EngineOptions, Expr, Value};
//!
//! let arena = Bump::new();
//! let engine = Engine::new(&arena, EngineOptions::default(), |_types, env| {
//!     env.register("limit", Value::int(10));
//! });
//!
//! // x < limit
//! let expr = Expr::binary(BinaryOp::Lt, Expr::ident("x", 0), Expr::ident("limit", 4), 2);
//! let int = engine.type_manager().int();
//! let compiled = engine.compile(&expr, &[("x", int)]).unwrap();
//! assert_eq!(compiled.run(&[Value::int(3)]).unwrap(), Value::bool(true));
//! ```
//!
//! # Host functions
//!
//! Functions are typed values. A function whose last result is `error`
//! reports failures through `Err`, which reaches the caller unchanged as
//! [`Error::Host`]:
//!
//! ```ignore
//! let engine = Engine::new(&arena, EngineOptions::default(), |types, env| {
//!     let atoi_ty = types.function(&[types.str()], &[types.int(), types.error()]);
//!     env.register(
//!         "atoi",
//!         Value::function(NativeFunction::new(atoi_ty, |args| match args {
//!             [Value::Str(s)] => s
//!                 .parse::<i64>()
//!                 .map(|i| vec![Value::int(i)])
//!                 .map_err(|e| host_error(e.to_string())),
//!             _ => Err(host_error("atoi: bad arguments")),
//!         })),
//!     );
//! });
//! ```

pub mod error_renderer;

pub use bumpalo::Bump;

// Re-export public API from sift_core
pub use sift_core::api::{
    CompilationOptions, CompiledExpression, Diagnostic, Engine, EngineOptions, EnvironmentBuilder,
    Error,
};

// Expression trees and the lower-level compiler
pub use sift_core::ast::{self, BinaryOp, Expr, ExprKind, Literal, Span, UnaryOp};
pub use sift_core::compiler::{self, CompiledNode, compile, compile_with_options};
pub use sift_core::environment::{self, TypeBinding, TypeEnv, ValueEnv};

// Types and values
pub use sift_core::types::{self, Type, TypeManager};
pub use sift_core::values::{self, Function, HostError, NativeFunction, Value, host_error};

pub use error_renderer::{render_error, render_error_to, render_error_to_string};
