//! Unit tests for compiling and executing expression trees.
//!
//! Spans mimic where the node would start in source text, so error
//! messages read as they would for a parsed expression.

use super::*;
use crate::api::CompilationOptions;
use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::environment::{TypeEnv, ValueEnv};
use crate::evaluator::{RuntimeError, SliceBound};
use crate::test_utils::init_test_logging;
use crate::values::{HostError, NativeFunction, host_error};
use bumpalo::Bump;
use pretty_assertions::assert_eq;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn run<'t>(
    env: &TypeEnv<'t>,
    values: &ValueEnv<'t>,
    expr: &Expr,
) -> Result<Value<'t>, ExecutionError> {
    compile(env, expr).execute(values)
}

fn compile_error(env: &TypeEnv<'_>, expr: &Expr) -> CompileError {
    let node = compile(env, expr);
    match node.error() {
        Some(err) => err.clone(),
        None => panic!("expected a compile error, got {:?}", node),
    }
}

fn runtime_error(result: Result<Value<'_>, ExecutionError>) -> RuntimeError {
    match result {
        Err(ExecutionError::Runtime(err)) => err,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

fn ints<'t>(types: &'t TypeManager<'t>, items: &[i64]) -> Value<'t> {
    let items = items.iter().map(|i| Value::int(*i)).collect();
    Value::sequence(types.sequence(types.int()), items).unwrap()
}

// ============================================================================
// Literals and identifiers
// ============================================================================

#[test]
fn test_literal_is_idempotent() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);
    let values = ValueEnv::new();

    let node = compile(&env, &Expr::int(42, 0));
    assert_eq!(node.return_type().unwrap(), types.int());
    for _ in 0..3 {
        assert_eq!(node.execute(&values).unwrap(), Value::int(42));
    }
}

#[test]
fn test_literal_kinds() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);
    let values = ValueEnv::new();

    assert_eq!(run(&env, &values, &Expr::double(2.5, 0)).unwrap(), Value::double(2.5));
    assert_eq!(run(&env, &values, &Expr::string("hi", 0)).unwrap(), Value::str("hi"));
    assert_eq!(run(&env, &values, &Expr::bool(false, 0)).unwrap(), Value::bool(false));

    let node = compile(&env, &Expr::char('é', 0));
    assert_eq!(node.return_type().unwrap(), types.str());
    assert_eq!(node.execute(&values).unwrap(), Value::str("é"));
}

#[test]
fn test_builtin_identifiers() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    // Built-ins win over environment bindings of the same name.
    let env = TypeEnv::builder(types).register("true", types.int()).build();
    let values = ValueEnv::new();

    assert_eq!(run(&env, &values, &Expr::ident("true", 0)).unwrap(), Value::bool(true));
    assert_eq!(run(&env, &values, &Expr::ident("false", 0)).unwrap(), Value::bool(false));

    let null = compile(&env, &Expr::ident("null", 0));
    assert_eq!(null.return_type().unwrap(), types.any());
    assert_eq!(null.execute(&values).unwrap(), Value::Null);
}

#[test]
fn test_identifier_lookup() {
    init_test_logging();
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::builder(types).register("x", types.int()).build();
    let values = ValueEnv::builder().register("x", Value::int(7)).build();

    let node = compile(&env, &Expr::ident("x", 0));
    assert_eq!(node.return_type().unwrap(), types.int());
    assert_eq!(node.execute(&values).unwrap(), Value::int(7));
}

#[test]
fn test_unknown_identifier() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);

    let err = compile_error(&env, &Expr::ident("nope", 3));
    assert_eq!(err.to_string(), "3: unknown identifier: nope");
    assert_eq!(err.code(), "E001");
}

#[test]
fn test_type_name_is_not_a_value() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let request = types.record("Request", &[("Method", types.str())], &[]);
    let env = TypeEnv::builder(types).register_type("Request", request).build();

    let err = compile_error(&env, &Expr::ident("Request", 0));
    assert_eq!(
        err.kind,
        CompileErrorKind::NotAValue {
            name: "Request".to_string()
        }
    );
}

#[test]
fn test_identifier_missing_at_runtime() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::builder(types).register("x", types.int()).build();

    let err = runtime_error(run(&env, &ValueEnv::new(), &Expr::ident("x", 0)));
    assert_eq!(err.to_string(), "0: undefined identifier: x");
}

#[test]
fn test_identifier_value_type_mismatch() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::builder(types).register("x", types.int()).build();
    let values = ValueEnv::builder().register("x", Value::str("seven")).build();

    let err = runtime_error(run(&env, &values, &Expr::ident("x", 0)));
    assert_eq!(
        err.kind,
        RuntimeErrorKind::ValueTypeMismatch {
            name: "x".to_string(),
            expected: "int".to_string(),
            found: "string".to_string(),
        }
    );
}

#[test]
fn test_paren_is_transparent() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);

    // (1 + 2) * 3
    let expr = Expr::binary(
        BinaryOp::Mul,
        Expr::paren(Expr::binary(BinaryOp::Add, Expr::int(1, 1), Expr::int(2, 5), 3), 0),
        Expr::int(3, 10),
        8,
    );
    assert_eq!(run(&env, &ValueEnv::new(), &expr).unwrap(), Value::int(9));
}

// ============================================================================
// Unary operators
// ============================================================================

#[test]
fn test_unary_operators() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::builder(types)
        .register("i", types.int())
        .register("d", types.double())
        .build();
    let values = ValueEnv::builder()
        .register("i", Value::int(5))
        .register("d", Value::double(1.5))
        .build();

    let neg = compile(&env, &Expr::unary(UnaryOp::Neg, Expr::ident("i", 1), 0));
    assert_eq!(neg.return_type().unwrap(), types.int());
    assert_eq!(neg.execute(&values).unwrap(), Value::int(-5));

    let plus = Expr::unary(UnaryOp::Plus, Expr::ident("d", 1), 0);
    assert_eq!(run(&env, &values, &plus).unwrap(), Value::double(1.5));

    let not = Expr::unary(UnaryOp::Not, Expr::bool(true, 1), 0);
    assert_eq!(run(&env, &values, &not).unwrap(), Value::bool(false));
}

#[test]
fn test_unsupported_unary() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);

    let err = compile_error(&env, &Expr::unary(UnaryOp::Neg, Expr::string("s", 1), 0));
    assert_eq!(err.to_string(), "0: unsupported unary expression: -string");

    let err = compile_error(&env, &Expr::unary(UnaryOp::Not, Expr::int(1, 1), 0));
    assert_eq!(err.code(), "E003");

    let err = compile_error(&env, &Expr::unary(UnaryOp::Complement, Expr::int(1, 1), 0));
    assert_eq!(err.code(), "E003");
}

// ============================================================================
// Binary operators
// ============================================================================

#[test]
fn test_arithmetic() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);
    let values = ValueEnv::new();

    // 5 + 3
    let add = compile(&env, &Expr::binary(BinaryOp::Add, Expr::int(5, 0), Expr::int(3, 4), 2));
    assert_eq!(add.return_type().unwrap(), types.int());
    assert_eq!(add.execute(&values).unwrap(), Value::int(8));

    // "foo" + "bar"
    let concat = Expr::binary(
        BinaryOp::Add,
        Expr::string("foo", 0),
        Expr::string("bar", 8),
        6,
    );
    assert_eq!(run(&env, &values, &concat).unwrap(), Value::str("foobar"));

    // 5.3 - 2.7
    let sub = Expr::binary(BinaryOp::Sub, Expr::double(5.3, 0), Expr::double(2.7, 6), 4);
    let result = run(&env, &values, &sub).unwrap().as_double().unwrap();
    assert!((result - 2.6).abs() < 1e-9);

    let rem = Expr::binary(BinaryOp::Rem, Expr::int(7, 0), Expr::int(4, 4), 2);
    assert_eq!(run(&env, &values, &rem).unwrap(), Value::int(3));
}

#[test]
fn test_comparisons() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);
    let values = ValueEnv::new();

    let cases = [
        (Expr::binary(BinaryOp::Lt, Expr::int(1, 0), Expr::int(2, 4), 2), true),
        (Expr::binary(BinaryOp::Ge, Expr::int(2, 0), Expr::int(3, 5), 2), false),
        (
            Expr::binary(BinaryOp::Le, Expr::double(1.5, 0), Expr::double(1.5, 7), 4),
            true,
        ),
        (
            Expr::binary(BinaryOp::Gt, Expr::string("b", 0), Expr::string("a", 6), 4),
            true,
        ),
        (Expr::binary(BinaryOp::Eq, Expr::int(4, 0), Expr::int(4, 5), 2), true),
        (
            Expr::binary(BinaryOp::Ne, Expr::string("a", 0), Expr::string("a", 7), 4),
            false,
        ),
    ];
    for (expr, expected) in cases {
        let node = compile(&env, &expr);
        assert_eq!(node.return_type().unwrap(), types.bool());
        assert_eq!(node.execute(&values).unwrap(), Value::bool(expected), "{:?}", expr);
    }
}

#[test]
fn test_binary_type_mismatch_is_a_compile_error() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);

    // 3.14 - 2
    let expr = Expr::binary(BinaryOp::Sub, Expr::double(3.14, 0), Expr::int(2, 7), 5);
    let node = compile(&env, &expr);
    let err = node.error().unwrap();
    assert_eq!(err.to_string(), "5: type mismatch in binary expression: double and int");
    assert_eq!(node.return_type().unwrap_err(), *err);
    match node.execute(&ValueEnv::new()) {
        Err(ExecutionError::Compile(cached)) => assert_eq!(cached, *err),
        other => panic!("expected the cached compile error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_binary_operations() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);

    // true + true
    let err = compile_error(
        &env,
        &Expr::binary(BinaryOp::Add, Expr::bool(true, 0), Expr::bool(true, 7), 5),
    );
    assert_eq!(err.to_string(), "5: unsupported type bool for +");

    // 5 ^ 2
    let err = compile_error(
        &env,
        &Expr::binary(BinaryOp::Xor, Expr::int(5, 0), Expr::int(2, 4), 2),
    );
    assert_eq!(err.to_string(), "2: unsupported binary operation ^");

    // 5.0 % 2.0
    let err = compile_error(
        &env,
        &Expr::binary(BinaryOp::Rem, Expr::double(5.0, 0), Expr::double(2.0, 6), 4),
    );
    assert_eq!(err.code(), "E006");
}

#[test]
fn test_ordering_requires_a_primitive() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let ints_ty = types.sequence(types.int());
    let env = TypeEnv::builder(types)
        .register("a", ints_ty)
        .register("b", ints_ty)
        .build();

    let err = compile_error(
        &env,
        &Expr::binary(BinaryOp::Lt, Expr::ident("a", 0), Expr::ident("b", 4), 2),
    );
    assert_eq!(err.to_string(), "2: unsupported binary expression type: []int");
}

#[test]
fn test_equality_on_composites() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let point = types.record("Point", &[("x", types.int()), ("y", types.int())], &[]);
    let make = |x, y| {
        Value::record(point)
            .field("x", Value::int(x))
            .field("y", Value::int(y))
            .build()
            .unwrap()
    };
    let ints_ty = types.sequence(types.int());
    let env = TypeEnv::builder(types)
        .register("p", point)
        .register("q", point)
        .register("r", point)
        .register("a", ints_ty)
        .register("b", ints_ty)
        .build();
    let values = ValueEnv::builder()
        .register("p", make(1, 2))
        .register("q", make(1, 2))
        .register("r", make(2, 1))
        .register("a", ints(types, &[1, 2]))
        .register("b", ints(types, &[1, 2]))
        .build();

    let eq = |l: &str, r: &str| {
        let expr = Expr::binary(BinaryOp::Eq, Expr::ident(l, 0), Expr::ident(r, 5), 2);
        run(&env, &values, &expr).unwrap()
    };
    assert_eq!(eq("p", "q"), Value::bool(true));
    assert_eq!(eq("p", "r"), Value::bool(false));
    // Sequences compare by identity.
    assert_eq!(eq("a", "a"), Value::bool(true));
    assert_eq!(eq("a", "b"), Value::bool(false));
}

#[test]
fn test_integer_overflow_wraps() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::builder(types).register("max", types.int()).build();
    let values = ValueEnv::builder().register("max", Value::int(i64::MAX)).build();

    let expr = Expr::binary(BinaryOp::Add, Expr::ident("max", 0), Expr::int(1, 6), 4);
    assert_eq!(run(&env, &values, &expr).unwrap(), Value::int(i64::MIN));
}

#[test]
fn test_division_by_zero() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);
    let values = ValueEnv::new();

    let err = runtime_error(run(
        &env,
        &values,
        &Expr::binary(BinaryOp::Div, Expr::int(1, 0), Expr::int(0, 4), 2),
    ));
    assert_eq!(err.to_string(), "2: division by zero");
    assert_eq!(err.code(), "R004");

    let err = runtime_error(run(
        &env,
        &values,
        &Expr::binary(BinaryOp::Rem, Expr::int(1, 0), Expr::int(0, 4), 2),
    ));
    assert_eq!(err.kind, RuntimeErrorKind::DivisionByZero);

    // Floating point follows IEEE 754.
    let inf = run(
        &env,
        &values,
        &Expr::binary(BinaryOp::Div, Expr::double(1.0, 0), Expr::double(0.0, 6), 4),
    )
    .unwrap();
    assert_eq!(inf.as_double(), Some(f64::INFINITY));
}

#[test]
fn test_logical_operators_short_circuit() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let probe_ty = types.function(&[], &[types.bool()]);
    let probe = NativeFunction::returning(probe_ty, move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
        Value::bool(true)
    });
    let env = TypeEnv::builder(types).register("probe", probe_ty).build();
    let values = ValueEnv::builder().register("probe", Value::function(probe)).build();

    let call = || Expr::call(Expr::ident("probe", 9), vec![], 14);

    // false && probe()
    let and = Expr::binary(BinaryOp::And, Expr::bool(false, 0), call(), 6);
    assert_eq!(run(&env, &values, &and).unwrap(), Value::bool(false));
    // true || probe()
    let or = Expr::binary(BinaryOp::Or, Expr::bool(true, 0), call(), 5);
    assert_eq!(run(&env, &values, &or).unwrap(), Value::bool(true));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // true && probe()
    let and = Expr::binary(BinaryOp::And, Expr::bool(true, 0), call(), 5);
    assert_eq!(run(&env, &values, &and).unwrap(), Value::bool(true));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_right_operand_rechecked_at_runtime() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    // Both sides are typed int but the caller binds a string to `y`,
    // which the identifier itself catches first.
    let env = TypeEnv::builder(types)
        .register("x", types.int())
        .register("y", types.int())
        .build();
    let values = ValueEnv::builder()
        .register("x", Value::int(1))
        .register("y", Value::str("2"))
        .build();

    let expr = Expr::binary(BinaryOp::Add, Expr::ident("x", 0), Expr::ident("y", 4), 2);
    let err = runtime_error(run(&env, &values, &expr));
    assert_eq!(err.code(), "R002");
}

// ============================================================================
// Calls
// ============================================================================

fn call_env<'t>(types: &'t TypeManager<'t>) -> (TypeEnv<'t>, ValueEnv<'t>) {
    let add_ty = types.function(&[types.int(), types.int()], &[types.int()]);
    let add = NativeFunction::returning(add_ty, |args| match args {
        [Value::Int(a), Value::Int(b)] => Value::Int(a + b),
        _ => Value::Null,
    });

    let fail_ty = types.function(&[types.str()], &[types.int(), types.error()]);
    let fail = NativeFunction::new(fail_ty, |_| Err(host_error("Boo!")));

    let parse_ty = types.function(&[types.str()], &[types.int(), types.error()]);
    let parse = NativeFunction::new(parse_ty, |args| match args {
        [Value::Str(s)] => s
            .parse::<i64>()
            .map(|i| vec![Value::Int(i)])
            .map_err(|e| -> HostError { Arc::new(e) }),
        _ => Ok(vec![Value::Null]),
    });

    let split_ty = types.function(&[types.str()], &[types.str(), types.str()]);
    let split = NativeFunction::new(split_ty, |args| match args {
        [Value::Str(s)] => {
            let (a, b) = s.split_once(',').unwrap_or((s.as_str(), ""));
            Ok(vec![Value::str(a), Value::str(b)])
        }
        _ => Ok(vec![Value::Null, Value::Null]),
    });

    let noop_ty = types.function(&[], &[]);
    let noop = NativeFunction::new(noop_ty, |_| Ok(vec![]));

    let printf_ty = types.variadic_function(&[types.str(), types.sequence(types.any())], &[]);
    let printf = NativeFunction::new(printf_ty, |_| Ok(vec![]));

    let env = TypeEnv::builder(types)
        .register("add", add_ty)
        .register("fail", fail_ty)
        .register("parse", parse_ty)
        .register("split", split_ty)
        .register("noop", noop_ty)
        .register("printf", printf_ty)
        .register("missing", add_ty)
        .register("x", types.int())
        .build();
    let values = ValueEnv::builder()
        .register("add", Value::function(add))
        .register("fail", Value::function(fail))
        .register("parse", Value::function(parse))
        .register("split", Value::function(split))
        .register("noop", Value::function(noop))
        .register("printf", Value::function(printf))
        .register("missing", Value::Null)
        .register("x", Value::int(1))
        .build();
    (env, values)
}

#[test]
fn test_call() {
    init_test_logging();
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = call_env(types);

    // add(40, 2)
    let expr = Expr::call(Expr::ident("add", 0), vec![Expr::int(40, 4), Expr::int(2, 8)], 3);
    let node = compile(&env, &expr);
    assert!(!node.has_owner());
    assert_eq!(node.return_type().unwrap(), types.int());
    assert_eq!(node.execute(&values).unwrap(), Value::int(42));
}

#[test]
fn test_call_arity_checked_at_compile_time() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, _) = call_env(types);

    let err = compile_error(&env, &Expr::call(Expr::ident("add", 0), vec![Expr::int(1, 4)], 3));
    assert_eq!(
        err.to_string(),
        "3: too few parameters to function call, expected 2, found 1"
    );

    let args = vec![Expr::int(1, 4), Expr::int(2, 7), Expr::int(3, 10)];
    let err = compile_error(&env, &Expr::call(Expr::ident("add", 0), args, 3));
    assert_eq!(
        err.kind,
        CompileErrorKind::TooManyArguments {
            expected: 2,
            found: 3
        }
    );
}

#[test]
fn test_call_argument_type_mismatch() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, _) = call_env(types);

    let args = vec![Expr::int(1, 4), Expr::string("2", 7)];
    let err = compile_error(&env, &Expr::call(Expr::ident("add", 0), args, 3));
    assert_eq!(
        err.to_string(),
        "7: type mismatch in argument 1: expected int, found string"
    );
}

#[test]
fn test_variadic_rejected_regardless_of_arguments() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, _) = call_env(types);

    for count in 0..3usize {
        let args = (0..count).map(|i| Expr::string("a", 7 + i * 4)).collect();
        let err = compile_error(&env, &Expr::call(Expr::ident("printf", 0), args, 6));
        assert_eq!(err.kind, CompileErrorKind::VariadicUnsupported);
    }
}

#[test]
fn test_calling_a_non_function() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = call_env(types);

    let err = compile_error(&env, &Expr::call(Expr::ident("x", 0), vec![], 1));
    assert_eq!(err.to_string(), "1: cannot call a value of type int");

    let err = runtime_error(run(
        &env,
        &values,
        &Expr::call(Expr::ident("missing", 0), vec![Expr::int(1, 8), Expr::int(2, 11)], 7),
    ));
    assert_eq!(err.to_string(), "7: function not found");
}

#[test]
fn test_host_error_returned_verbatim() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = call_env(types);

    let expr = Expr::call(Expr::ident("fail", 0), vec![Expr::string("x", 5)], 4);
    let node = compile(&env, &expr);
    assert_eq!(node.return_type().unwrap(), types.int());
    match node.execute(&values) {
        Err(ExecutionError::Host(err)) => assert_eq!(err.to_string(), "Boo!"),
        other => panic!("expected the host error, got {:?}", other),
    }
}

#[test]
fn test_error_capable_call_success() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = call_env(types);

    let ok = Expr::call(Expr::ident("parse", 0), vec![Expr::string("12", 6)], 5);
    assert_eq!(run(&env, &values, &ok).unwrap(), Value::int(12));

    let bad = Expr::call(Expr::ident("parse", 0), vec![Expr::string("x", 6)], 5);
    match run(&env, &values, &bad) {
        Err(ExecutionError::Host(err)) => assert_eq!(err.to_string(), "invalid digit found in string"),
        other => panic!("expected the host error, got {:?}", other),
    }
}

#[test]
fn test_call_result_shapes() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = call_env(types);

    let noop = compile(&env, &Expr::call(Expr::ident("noop", 0), vec![], 4));
    assert_eq!(noop.return_type().unwrap(), types.void());
    assert_eq!(noop.execute(&values).unwrap(), Value::Null);

    let split = compile(
        &env,
        &Expr::call(Expr::ident("split", 0), vec![Expr::string("a,b", 6)], 5),
    );
    assert_eq!(split.return_type().unwrap(), types.sequence(types.any()));
    let result = split.execute(&values).unwrap();
    assert_eq!(
        result.as_sequence().unwrap().as_slice(),
        &[Value::str("a"), Value::str("b")]
    );
}

#[test]
fn test_call_result_count_checked() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let pair_ty = types.function(&[], &[types.int(), types.int()]);
    let liar = NativeFunction::new(pair_ty, |_| Ok(vec![Value::int(1)]));
    let env = TypeEnv::builder(types).register("liar", pair_ty).build();
    let values = ValueEnv::builder().register("liar", Value::function(liar)).build();

    let err = runtime_error(run(&env, &values, &Expr::call(Expr::ident("liar", 0), vec![], 4)));
    assert_eq!(
        err.kind,
        RuntimeErrorKind::ResultCountMismatch {
            expected: 2,
            found: 1
        }
    );
}

// ============================================================================
// Selectors and methods
// ============================================================================

fn request_env<'t>(types: &'t TypeManager<'t>) -> (TypeEnv<'t>, ValueEnv<'t>) {
    let header_sig = types.function(&[types.str()], &[types.str()]);
    let request = types.record(
        "Request",
        &[("Method", types.str()), ("Path", types.str())],
        &[("Header", header_sig), ("PathOf", types.function(&[], &[types.str()]))],
    );
    let header = NativeFunction::returning(types.method_type(request, header_sig), |args| {
        match args {
            [_, Value::Str(name)] if name.as_str() == "Accept" => Value::str("text/html"),
            _ => Value::str(""),
        }
    });
    let path_of_ty = types.method_type(request, types.function(&[], &[types.str()]));
    let path_of = NativeFunction::returning(path_of_ty, |args| match args {
        [Value::Record(r)] => r.field("Path").cloned().unwrap_or(Value::Null),
        [other] => Value::str(&format!("receiver was {}", other.dynamic_type())),
        _ => Value::Null,
    });
    let req = Value::record(request)
        .field("Method", Value::str("GET"))
        .field("Path", Value::str("/"))
        .method("Header", header)
        .method("PathOf", path_of)
        .build()
        .unwrap();

    let env = TypeEnv::builder(types)
        .register("req", request)
        .register("ref", types.reference(request))
        .register("nil", types.reference(request))
        .register_type("Request", request)
        .build();
    let values = ValueEnv::builder()
        .register("ref", Value::reference(types, req.clone()))
        .register("nil", Value::Null)
        .register("req", req)
        .build();
    (env, values)
}

#[test]
fn test_selector_field() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = request_env(types);

    let node = compile(&env, &Expr::selector(Expr::ident("req", 0), "Method", 3));
    assert!(!node.has_owner());
    assert_eq!(node.return_type().unwrap(), types.str());
    assert_eq!(node.execute(&values).unwrap(), Value::str("GET"));
}

#[test]
fn test_method_call() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = request_env(types);

    // req.Header("Accept")
    let selector = Expr::selector(Expr::ident("req", 0), "Header", 3);
    let method = compile(&env, &selector);
    assert!(method.has_owner());

    let expr = Expr::call(selector, vec![Expr::string("Accept", 11)], 10);
    let node = compile(&env, &expr);
    assert_eq!(node.return_type().unwrap(), types.str());
    assert_eq!(node.execute(&values).unwrap(), Value::str("text/html"));
}

#[test]
fn test_method_receiver_not_counted_as_argument() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, _) = request_env(types);

    let selector = Expr::selector(Expr::ident("req", 0), "Header", 3);
    let err = compile_error(&env, &Expr::call(selector, vec![], 10));
    assert_eq!(
        err.kind,
        CompileErrorKind::TooFewArguments {
            expected: 1,
            found: 0
        }
    );
}

#[test]
fn test_selector_through_reference() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = request_env(types);

    let direct = compile(&env, &Expr::selector(Expr::ident("req", 0), "Path", 3));
    let indirect = compile(&env, &Expr::selector(Expr::ident("ref", 0), "Path", 3));
    assert_eq!(direct.return_type().unwrap(), indirect.return_type().unwrap());
    assert_eq!(
        direct.execute(&values).unwrap(),
        indirect.execute(&values).unwrap()
    );

    let call = Expr::call(
        Expr::selector(Expr::ident("ref", 0), "Header", 3),
        vec![Expr::string("Accept", 11)],
        10,
    );
    assert_eq!(run(&env, &values, &call).unwrap(), Value::str("text/html"));

    // Methods see the record itself, whichever way they were selected.
    let direct = compile(&env, &Expr::selector(Expr::ident("req", 0), "PathOf", 3));
    let indirect = compile(&env, &Expr::selector(Expr::ident("ref", 0), "PathOf", 3));
    assert!(indirect.has_owner());
    assert_eq!(direct.return_type().unwrap(), indirect.return_type().unwrap());
    assert_eq!(
        direct.return_type().unwrap().to_string(),
        "func(Request) string"
    );

    for receiver in ["req", "ref"] {
        let call = Expr::call(
            Expr::selector(Expr::ident(receiver, 0), "PathOf", 3),
            vec![],
            10,
        );
        assert_eq!(run(&env, &values, &call).unwrap(), Value::str("/"));
    }
}

#[test]
fn test_selector_on_null_reference() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = request_env(types);

    let err = runtime_error(run(&env, &values, &Expr::selector(Expr::ident("nil", 0), "Path", 3)));
    assert_eq!(err.to_string(), "3: dereferencing a null value");
}

#[test]
fn test_unknown_selector() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, _) = request_env(types);

    let err = compile_error(&env, &Expr::selector(Expr::ident("req", 0), "Body", 3));
    assert_eq!(err.to_string(), "3: unknown selector Body for Request");

    let err = compile_error(&env, &Expr::selector(Expr::int(5, 0), "Foo", 1));
    assert_eq!(err.to_string(), "1: unknown selector Foo for int");
}

// ============================================================================
// Indexing
// ============================================================================

#[test]
fn test_mapping_index() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let map_ty = types.mapping(types.str(), types.int());
    let m = Value::mapping(map_ty, vec![(Value::str("bar"), Value::int(3))]).unwrap();
    let env = TypeEnv::builder(types).register("m", map_ty).build();
    let values = ValueEnv::builder().register("m", m).build();

    let hit = compile(&env, &Expr::index(Expr::ident("m", 0), Expr::string("bar", 2), 1));
    assert_eq!(hit.return_type().unwrap(), types.int());
    assert_eq!(hit.execute(&values).unwrap(), Value::int(3));

    // A missing key yields the element's zero value.
    let miss = Expr::index(Expr::ident("m", 0), Expr::string("foo", 2), 1);
    assert_eq!(run(&env, &values, &miss).unwrap(), Value::int(0));

    let err = compile_error(&env, &Expr::index(Expr::ident("m", 0), Expr::int(1, 2), 1));
    assert_eq!(
        err.to_string(),
        "2: incorrect index type. expected string, found int"
    );
}

#[test]
fn test_mapping_miss_zero_values() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let nested = types.mapping(types.str(), types.sequence(types.int()));
    let env = TypeEnv::builder(types).register("m", nested).build();
    let values = ValueEnv::builder()
        .register("m", Value::mapping(nested, vec![]).unwrap())
        .build();

    let miss = run(&env, &values, &Expr::index(Expr::ident("m", 0), Expr::string("k", 2), 1));
    assert_eq!(miss.unwrap().as_sequence().map(|s| s.len()), Some(0));
}

#[test]
fn test_sequence_index() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::builder(types)
        .register("a", types.sequence(types.int()))
        .build();
    let values = ValueEnv::builder()
        .register("a", ints(types, &[1, 2, 4, 8, 16, 32]))
        .build();

    let ok = Expr::index(Expr::ident("a", 0), Expr::int(3, 2), 1);
    assert_eq!(run(&env, &values, &ok).unwrap(), Value::int(8));

    let err = runtime_error(run(&env, &values, &Expr::index(Expr::ident("a", 0), Expr::int(6, 2), 1)));
    assert_eq!(err.to_string(), "1: index out of bounds, len = 6 index = 6");

    let negative = Expr::index(
        Expr::ident("a", 0),
        Expr::unary(UnaryOp::Neg, Expr::int(1, 3), 2),
        1,
    );
    let err = runtime_error(run(&env, &values, &negative));
    assert_eq!(err.kind, RuntimeErrorKind::IndexOutOfBounds { len: 6, index: -1 });
}

#[test]
fn test_string_index_yields_byte() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);

    let node = compile(&env, &Expr::index(Expr::string("abc", 0), Expr::int(1, 6), 5));
    assert_eq!(node.return_type().unwrap(), types.int());
    assert_eq!(node.execute(&ValueEnv::new()).unwrap(), Value::int(98));
}

#[test]
fn test_not_indexable() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);

    let err = compile_error(&env, &Expr::index(Expr::int(5, 0), Expr::int(0, 2), 1));
    assert_eq!(err.to_string(), "1: not an index type: int");
}

#[test]
fn test_index_through_reference_and_null() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let seq_ty = types.sequence(types.int());
    let env = TypeEnv::builder(types)
        .register("p", types.reference(seq_ty))
        .register("n", seq_ty)
        .build();
    let values = ValueEnv::builder()
        .register("p", Value::reference(types, ints(types, &[5, 6])))
        .register("n", Value::Null)
        .build();

    let via_ref = Expr::index(Expr::ident("p", 0), Expr::int(1, 2), 1);
    assert_eq!(run(&env, &values, &via_ref).unwrap(), Value::int(6));

    let err = runtime_error(run(&env, &values, &Expr::index(Expr::ident("n", 0), Expr::int(0, 2), 1)));
    assert_eq!(err.to_string(), "1: indexing a null value");
}

// ============================================================================
// Slicing
// ============================================================================

fn slice_env<'t>(types: &'t TypeManager<'t>) -> (TypeEnv<'t>, ValueEnv<'t>) {
    let env = TypeEnv::builder(types)
        .register("a", types.sequence(types.int()))
        .register("arr", types.array(types.int(), 2))
        .register("s", types.str())
        .build();
    let values = ValueEnv::builder()
        .register("a", ints(types, &[1, 2, 4, 8, 16, 32]))
        .register(
            "arr",
            Value::sequence(types.array(types.int(), 2), vec![Value::int(1), Value::int(2)]).unwrap(),
        )
        .register("s", Value::str("héllo"))
        .build();
    (env, values)
}

fn slice(low: Option<i64>, high: Option<i64>, max: Option<i64>) -> Expr {
    // a[low:high:max], each bound two characters after the previous one.
    Expr::slice(
        Expr::ident("a", 0),
        low.map(|v| Expr::int(v, 2)),
        high.map(|v| Expr::int(v, 4)),
        max.map(|v| Expr::int(v, 6)),
        1,
    )
}

#[test]
fn test_slice_sequence() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = slice_env(types);

    let node = compile(&env, &slice(Some(1), Some(3), None));
    assert_eq!(node.return_type().unwrap(), types.sequence(types.int()));
    assert_eq!(node.execute(&values).unwrap().to_string(), "[2 4]");

    assert_eq!(run(&env, &values, &slice(None, Some(1), None)).unwrap().to_string(), "[1]");
    assert_eq!(run(&env, &values, &slice(Some(5), None, None)).unwrap().to_string(), "[32]");
    assert_eq!(
        run(&env, &values, &slice(None, None, None)).unwrap().to_string(),
        "[1 2 4 8 16 32]"
    );

    let full = run(&env, &values, &slice(Some(0), Some(2), Some(3))).unwrap();
    let seq = full.as_sequence().unwrap();
    assert_eq!(full.to_string(), "[1 2]");
    assert_eq!(seq.cap(), 3);
}

#[test]
fn test_slice_bounds_checked_at_runtime() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = slice_env(types);

    let cases = [
        // a[3:2]
        (slice(Some(3), Some(2), None), "4: high index out of range: 2"),
        // a[2:3:1]
        (slice(Some(2), Some(3), Some(1)), "6: max index out of range: 1"),
        // a[6:]
        (slice(Some(6), None, None), "2: low index out of range: 6"),
        // a[:7]
        (slice(None, Some(7), None), "4: high index out of range: 7"),
        // a[:6:7]
        (slice(None, Some(6), Some(7)), "6: max index out of range: 7"),
    ];
    for (expr, expected) in cases {
        let err = runtime_error(run(&env, &values, &expr));
        assert_eq!(err.to_string(), expected);
    }

    let err = runtime_error(run(&env, &values, &slice(Some(3), Some(2), None)));
    assert_eq!(
        err.kind,
        RuntimeErrorKind::SliceBoundOutOfRange {
            bound: SliceBound::High,
            value: 2
        }
    );
}

#[test]
fn test_slice_default_high_tracks_runtime_length() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, _) = slice_env(types);
    let node = compile(&env, &slice(Some(1), None, None));

    for (items, expected) in [(&[1, 2][..], "[2]"), (&[1, 2, 3, 4][..], "[2 3 4]")] {
        let values = ValueEnv::builder().register("a", ints(types, items)).build();
        assert_eq!(node.execute(&values).unwrap().to_string(), expected);
    }
}

#[test]
fn test_slice_string() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = slice_env(types);

    let expr = Expr::slice(
        Expr::ident("s", 0),
        Some(Expr::int(3, 2)),
        None,
        None,
        1,
    );
    let node = compile(&env, &expr);
    assert_eq!(node.return_type().unwrap(), types.str());
    assert_eq!(node.execute(&values).unwrap(), Value::str("llo"));

    // "é" spans bytes 1..3.
    let split = Expr::slice(
        Expr::ident("s", 0),
        Some(Expr::int(0, 2)),
        Some(Expr::int(2, 4)),
        None,
        1,
    );
    let err = runtime_error(run(&env, &values, &split));
    assert_eq!(err.kind, RuntimeErrorKind::NotCharBoundary { low: 0, high: 2 });
}

#[test]
fn test_slice_receiver_rules() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, _) = slice_env(types);

    let full_string = Expr::slice(
        Expr::ident("s", 0),
        Some(Expr::int(0, 2)),
        Some(Expr::int(1, 4)),
        Some(Expr::int(2, 6)),
        1,
    );
    let err = compile_error(&env, &full_string);
    assert_eq!(err.to_string(), "0: type mismatch expected a slice but found string");

    let array = Expr::slice(Expr::ident("arr", 0), None, Some(Expr::int(1, 5)), None, 3);
    let err = compile_error(&env, &array);
    assert_eq!(
        err.to_string(),
        "0: type mismatch expected a slice or string but found [2]int"
    );

    let err = compile_error(&env, &Expr::slice(Expr::int(5, 0), None, None, None, 1));
    assert_eq!(err.code(), "E015");
}

#[test]
fn test_slice_bounds_must_be_int() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, _) = slice_env(types);

    let expr = Expr::slice(
        Expr::ident("a", 0),
        Some(Expr::double(1.0, 2)),
        None,
        None,
        1,
    );
    let err = compile_error(&env, &expr);
    assert_eq!(err.to_string(), "2: slice index must be int, found double");
}

// ============================================================================
// Type assertions
// ============================================================================

#[test]
fn test_type_assertion() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::builder(types).register("x", types.any()).build();
    let values = ValueEnv::builder().register("x", Value::int(5)).build();

    // x.(int)
    let ok = compile(&env, &Expr::type_assert(Expr::ident("x", 0), Expr::ident("int", 3), 1));
    assert_eq!(ok.return_type().unwrap(), types.int());
    assert_eq!(ok.execute(&values).unwrap(), Value::int(5));

    // x.(string)
    let err = runtime_error(run(
        &env,
        &values,
        &Expr::type_assert(Expr::ident("x", 0), Expr::ident("string", 3), 1),
    ));
    assert_eq!(err.to_string(), "1: int is not assignable to string.");
}

#[test]
fn test_type_assertion_to_named_type() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (base, values) = request_env(types);
    let base = Rc::new(base);
    let env = base.extend().register("anything", types.any()).build();
    let values = Arc::new(values);
    let values = values
        .extend()
        .register("anything", values.lookup("req").unwrap().clone())
        .build();

    let expr = Expr::selector(
        Expr::paren(
            Expr::type_assert(Expr::ident("anything", 0), Expr::ident("Request", 10), 8),
            0,
        ),
        "Method",
        19,
    );
    assert_eq!(run(&env, &values, &expr).unwrap(), Value::str("GET"));
}

#[test]
fn test_type_assertion_target_resolution() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::builder(types).register("x", types.any()).build();

    let err = compile_error(
        &env,
        &Expr::type_assert(Expr::ident("x", 0), Expr::ident("Widget", 3), 1),
    );
    assert_eq!(err.to_string(), "3: unknown type Widget");

    let err = compile_error(
        &env,
        &Expr::type_assert(Expr::ident("x", 0), Expr::ident("x", 3), 1),
    );
    assert_eq!(err.to_string(), "3: x is not a type");

    let err = compile_error(&env, &Expr::type_assert(Expr::ident("x", 0), Expr::int(1, 3), 1));
    assert_eq!(err.kind, CompileErrorKind::UnsupportedAssertTarget);
}

// ============================================================================
// Error propagation and limits
// ============================================================================

#[test]
fn test_first_error_wins() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);

    let expr = Expr::binary(BinaryOp::Add, Expr::ident("a", 0), Expr::ident("b", 4), 2);
    let err = compile_error(&env, &expr);
    assert_eq!(err.to_string(), "0: unknown identifier: a");

    // Arguments compile left to right.
    let (env, _) = call_env(types);
    let args = vec![Expr::ident("u", 4), Expr::ident("v", 7)];
    let err = compile_error(&env, &Expr::call(Expr::ident("add", 0), args, 3));
    assert_eq!(err.to_string(), "4: unknown identifier: u");
}

#[test]
fn test_depth_limit() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let env = TypeEnv::new(types);

    let mut expr = Expr::int(1, 20);
    for i in 0..20usize {
        expr = Expr::unary(UnaryOp::Neg, expr, 19 - i);
    }
    let options = CompilationOptions { max_depth: 10 };
    let node = compile_with_options(&env, &expr, &options);
    assert_eq!(
        node.error().map(|e| e.kind.clone()),
        Some(CompileErrorKind::TooDeep { max_depth: 10 })
    );

    let node = compile_with_options(&env, &expr, &CompilationOptions::default());
    assert_eq!(node.execute(&ValueEnv::new()).unwrap(), Value::int(1));
}

#[test]
fn test_concurrent_execution() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);
    let (env, values) = call_env(types);

    // add(x, 41)
    let expr = Expr::call(Expr::ident("add", 0), vec![Expr::ident("x", 4), Expr::int(41, 7)], 3);
    let node = compile(&env, &expr);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| (0..100).map(|_| node.execute(&values).unwrap()).last()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(Value::int(42)));
        }
    });
}
