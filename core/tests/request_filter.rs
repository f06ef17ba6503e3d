//! End-to-end use of the engine as a request filter: a host record type
//! with fields and methods, host functions with an error channel, and one
//! compiled predicate run against many requests.

use bumpalo::Bump;
use pretty_assertions::assert_eq;
use sift_core::api::{Engine, EngineOptions, Error};
use sift_core::ast::{BinaryOp, Expr, UnaryOp};
use sift_core::types::{Type, TypeManager};
use sift_core::values::{NativeFunction, Value, host_error};

fn request_type<'t>(types: &'t TypeManager<'t>) -> &'t Type<'t> {
    types.record(
        "Request",
        &[
            ("Method", types.str()),
            ("Path", types.str()),
            ("Tags", types.sequence(types.str())),
            ("Query", types.mapping(types.str(), types.str())),
        ],
        &[("Header", types.function(&[types.str()], &[types.str()]))],
    )
}

fn request<'t>(
    types: &'t TypeManager<'t>,
    method: &str,
    path: &str,
    tags: &[&str],
    query: &[(&str, &str)],
    accept: &'static str,
) -> Value<'t> {
    let ty = request_type(types);
    let header_ty = types.method_type(ty, ty.method("Header").unwrap());
    let tags = Value::sequence(
        types.sequence(types.str()),
        tags.iter().map(|t| Value::str(t)).collect(),
    )
    .unwrap();
    let query = Value::mapping(
        types.mapping(types.str(), types.str()),
        query
            .iter()
            .map(|(k, v)| (Value::str(k), Value::str(v)))
            .collect(),
    )
    .unwrap();
    Value::record(ty)
        .field("Method", Value::str(method))
        .field("Path", Value::str(path))
        .field("Tags", tags)
        .field("Query", query)
        .method(
            "Header",
            NativeFunction::returning(header_ty, move |args| match args {
                [_, Value::Str(name)] if name.as_str() == "Accept" => Value::str(accept),
                _ => Value::str(""),
            }),
        )
        .build()
        .unwrap()
}

fn engine(arena: &Bump) -> Engine<'_> {
    Engine::new(arena, EngineOptions::default(), |types, env| {
        env.register_type("Request", request_type(types));

        let has_prefix_ty = types.function(&[types.str(), types.str()], &[types.bool()]);
        env.register(
            "hasPrefix",
            Value::function(NativeFunction::returning(has_prefix_ty, |args| match args {
                [Value::Str(s), Value::Str(prefix)] => Value::bool(s.starts_with(prefix.as_str())),
                _ => Value::bool(false),
            })),
        );

        let atoi_ty = types.function(&[types.str()], &[types.int(), types.error()]);
        env.register(
            "atoi",
            Value::function(NativeFunction::new(atoi_ty, |args| match args {
                [Value::Str(s)] => s
                    .parse::<i64>()
                    .map(|i| vec![Value::int(i)])
                    .map_err(|_| host_error(format!("atoi: invalid number {:?}", s.as_str()))),
                _ => Err(host_error("atoi: bad arguments")),
            })),
        );
    })
}

/// req.Method == "GET" && hasPrefix(req.Path, "/api") && atoi(req.Query["page"]) < 10
fn predicate() -> Expr {
    let method = Expr::binary(
        BinaryOp::Eq,
        Expr::selector(Expr::ident("req", 0), "Method", 3),
        Expr::string("GET", 14),
        11,
    );
    let prefix = Expr::call(
        Expr::ident("hasPrefix", 23),
        vec![
            Expr::selector(Expr::ident("req", 33), "Path", 36),
            Expr::string("/api", 42),
        ],
        32,
    );
    let page = Expr::binary(
        BinaryOp::Lt,
        Expr::call(
            Expr::ident("atoi", 52),
            vec![Expr::index(
                Expr::selector(Expr::ident("req", 57), "Query", 60),
                Expr::string("page", 67),
                66,
            )],
            56,
        ),
        Expr::int(10, 78),
        76,
    );
    Expr::binary(
        BinaryOp::And,
        Expr::binary(BinaryOp::And, method, prefix, 20),
        page,
        49,
    )
}

#[test]
fn test_filter_matches_requests() {
    let arena = Bump::new();
    let engine = engine(&arena);
    let types = engine.type_manager();
    let compiled = engine
        .compile(&predicate(), &[("req", request_type(types))])
        .unwrap();
    assert_eq!(compiled.return_type(), types.bool());

    let cases = [
        (request(types, "GET", "/api/users", &[], &[("page", "2")], ""), true),
        (request(types, "POST", "/api/users", &[], &[("page", "2")], ""), false),
        (request(types, "GET", "/static/x", &[], &[("page", "2")], ""), false),
        (request(types, "GET", "/api/users", &[], &[("page", "12")], ""), false),
    ];
    for (req, expected) in cases {
        assert_eq!(compiled.run(&[req]).unwrap(), Value::bool(expected));
    }
}

#[test]
fn test_filter_surfaces_host_errors() {
    let arena = Bump::new();
    let engine = engine(&arena);
    let types = engine.type_manager();
    let compiled = engine
        .compile(&predicate(), &[("req", request_type(types))])
        .unwrap();

    // A missing query key reads as "", which atoi rejects.
    let req = request(types, "GET", "/api/users", &[], &[], "");
    let err = compiled.run(&[req]).unwrap_err();
    assert!(matches!(err, Error::Host(_)));
    assert_eq!(err.to_string(), "atoi: invalid number \"\"");

    // Short-circuiting skips the call entirely.
    let req = request(types, "POST", "/api/users", &[], &[], "");
    assert_eq!(compiled.run(&[req]).unwrap(), Value::bool(false));
}

#[test]
fn test_methods_slices_and_assertions() {
    let arena = Bump::new();
    let engine = engine(&arena);
    let types = engine.type_manager();
    let req_ty = request_type(types);

    // req.Header("Accept")
    let header = Expr::call(
        Expr::selector(Expr::ident("req", 0), "Header", 3),
        vec![Expr::string("Accept", 11)],
        10,
    );
    let compiled = engine.compile(&header, &[("req", req_ty)]).unwrap();
    let req = request(types, "GET", "/", &[], &[], "text/html");
    assert_eq!(compiled.run(&[req]).unwrap(), Value::str("text/html"));

    // req.Tags[1:]
    let tags = Expr::slice(
        Expr::selector(Expr::ident("req", 0), "Tags", 3),
        Some(Expr::int(1, 9)),
        None,
        None,
        8,
    );
    let compiled = engine.compile(&tags, &[("req", req_ty)]).unwrap();
    let req = request(types, "GET", "/", &["a", "b", "c"], &[], "");
    assert_eq!(compiled.run(&[req]).unwrap().to_string(), "[b c]");

    // (anything.(Request)).Path
    let assert_path = Expr::selector(
        Expr::paren(
            Expr::type_assert(Expr::ident("anything", 1), Expr::ident("Request", 11), 9),
            0,
        ),
        "Path",
        20,
    );
    let compiled = engine
        .compile(&assert_path, &[("anything", types.any())])
        .unwrap();
    let req = request(types, "GET", "/health", &[], &[], "");
    assert_eq!(compiled.run(&[req]).unwrap(), Value::str("/health"));

    let err = compiled.run(&[Value::int(3)]).unwrap_err();
    assert_eq!(err.to_string(), "9: int is not assignable to Request.");
}

#[test]
fn test_reference_receiver() {
    let arena = Bump::new();
    let engine = engine(&arena);
    let types = engine.type_manager();
    let ref_ty = types.reference(request_type(types));

    // !hasPrefix(p.Path, "/admin")
    let expr = Expr::unary(
        UnaryOp::Not,
        Expr::call(
            Expr::ident("hasPrefix", 1),
            vec![
                Expr::selector(Expr::ident("p", 11), "Path", 12),
                Expr::string("/admin", 19),
            ],
            10,
        ),
        0,
    );
    let compiled = engine.compile(&expr, &[("p", ref_ty)]).unwrap();

    let req = request(types, "GET", "/admin/users", &[], &[], "");
    assert_eq!(
        compiled.run(&[Value::reference(types, req)]).unwrap(),
        Value::bool(false)
    );

    let err = compiled.run(&[Value::Null]).unwrap_err();
    assert_eq!(err.to_string(), "12: dereferencing a null value");
}
