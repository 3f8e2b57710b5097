use bindex::{
    Engine, EngineConfig, EvalError, Literal, Observation, Purity, Sandbox, Value, parse,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

fn empty() -> Value {
    Value::object::<&str, _>([])
}

// ============================================================================
// Assignment
// ============================================================================

#[test]
fn test_assignability_flags() {
    assert!(parse("a.b").unwrap().is_assignable());
    assert!(parse("a").unwrap().is_assignable());
    assert!(parse("a[0].b").unwrap().is_assignable());
    assert!(!parse("a()").unwrap().is_assignable());
    assert!(!parse("a + 1").unwrap().is_assignable());
    assert!(!parse("a | f").unwrap().is_assignable());
    assert!(!parse("a; b").unwrap().is_assignable());
}

#[test]
fn test_assign_creates_missing_containers() {
    let scope = empty();
    let expr = parse("a.b").unwrap();
    assert_eq!(expr.assign(&scope, Value::Integer(5), None).unwrap(), Value::Integer(5));
    assert_eq!(scope.get_member("a").get_member("b"), Value::Integer(5));

    let deep = parse("x.y.z").unwrap();
    deep.assign(&scope, Value::from("v"), None).unwrap();
    assert_eq!(
        scope.get_member("x"),
        Value::object([("y", Value::object([("z", Value::from("v"))]))])
    );
}

#[test]
fn test_assign_replaces_null_intermediates_and_keeps_existing() {
    let existing = Value::object([("keep", Value::Integer(1))]);
    let scope = Value::object([("a", Value::Null), ("b", existing.clone())]);

    parse("a.x").unwrap().assign(&scope, Value::Integer(2), None).unwrap();
    parse("b.y").unwrap().assign(&scope, Value::Integer(3), None).unwrap();

    assert_eq!(scope.get_member("a"), Value::object([("x", Value::Integer(2))]));
    assert_eq!(existing.get_member("keep"), Value::Integer(1));
    assert_eq!(existing.get_member("y"), Value::Integer(3));
}

#[test]
fn test_assign_array_index_and_computed_key() {
    let scope = Value::object([
        ("items", Value::array([Value::Integer(0)])),
        ("key", Value::from("dyn")),
    ]);
    parse("items[2]").unwrap().assign(&scope, Value::Integer(9), None).unwrap();
    parse("obj[key]").unwrap().assign(&scope, Value::Boolean(true), None).unwrap();

    assert_eq!(
        scope.get_member("items"),
        Value::array([Value::Integer(0), Value::Undefined, Value::Integer(9)])
    );
    assert_eq!(scope.get_member("obj").get_member("dyn"), Value::Boolean(true));
}

#[test]
fn test_assign_to_locals_only_when_owned() {
    let scope = empty();
    let locals = Value::object([("item", Value::Integer(1))]);

    parse("item").unwrap().assign(&scope, Value::Integer(2), Some(&locals)).unwrap();
    parse("other").unwrap().assign(&scope, Value::Integer(3), Some(&locals)).unwrap();

    assert_eq!(locals.get_member("item"), Value::Integer(2));
    assert_eq!(scope.get_member("item"), Value::Undefined);
    assert_eq!(scope.get_member("other"), Value::Integer(3));
}

#[test]
fn test_assignment_expression_returns_value() {
    let scope = empty();
    let expr = parse("total = 2 * 21").unwrap();
    assert_eq!(expr.evaluate(&scope, None).unwrap(), Value::Integer(42));
    assert_eq!(scope.get_member("total"), Value::Integer(42));
    assert!(!expr.is_constant());
}

#[test]
fn test_assign_errors() {
    let err = parse("a + 1").unwrap().assign(&empty(), Value::Null, None).unwrap_err();
    assert_eq!(err, EvalError::NotAssignable("a + 1".into()));

    let scope = Value::object([("n", Value::Integer(1)), ("list", Value::array([]))]);
    let err = parse("n.x").unwrap().assign(&scope, Value::Null, None).unwrap_err();
    assert!(matches!(err, EvalError::TypeError(_)));
    let err = parse("list.name").unwrap().assign(&scope, Value::Null, None).unwrap_err();
    assert!(matches!(err, EvalError::TypeError(_)));
}

#[test]
fn test_oversized_array_writes_fail() {
    let scope = Value::object([("a", Value::array([Value::Integer(1)]))]);
    for source in [
        "a[9223372036854775807] = 1",
        "a[1e9] = 1",
        "a.length = 9223372036854775807",
        "a.length = 1e9",
    ] {
        let err = parse(source).unwrap().evaluate(&scope, None).unwrap_err();
        assert!(
            matches!(&err, EvalError::TypeError(msg) if msg.contains("Invalid array length")),
            "Failed for input: {}",
            source
        );
    }
    assert_eq!(scope.get_member("a"), Value::array([Value::Integer(1)]));
}

#[test]
fn test_self_containing_array() {
    let scope = Value::object([("a", Value::array([]))]);
    parse("a[0] = a").unwrap().evaluate(&scope, None).unwrap();
    parse("a[1] = 2").unwrap().evaluate(&scope, None).unwrap();

    let eval = |source: &str| parse(source).unwrap().evaluate(&scope, None).unwrap();
    assert_eq!(eval("a + ''"), Value::from(",2"));
    assert_eq!(eval("a == 'x'"), Value::Boolean(false));
    assert_eq!(eval("a == ',2'"), Value::Boolean(true));
    assert_eq!(eval("a[0] === a"), Value::Boolean(true));
    assert_eq!(eval("a[0][0][1]"), Value::Integer(2));
    assert!(format!("{:?}", scope).contains("circular"));
}

// ============================================================================
// Purity and Literals
// ============================================================================

#[test]
fn test_constant_classification() {
    let cases = [
        ("1 + 2", true),
        ("'a' + 'b'", true),
        ("[1, {a: 2}]", true),
        ("true ? 1 : 2", true),
        ("", true),
        ("a + 1", false),
        ("[1, a]", false),
        ("this", false),
        ("f()", false),
        ("a = 1", false),
    ];
    for (source, expected) in cases {
        assert_eq!(parse(source).unwrap().is_constant(), expected, "Failed for input: {}", source);
    }
    assert_eq!(parse("1 + 2").unwrap().purity(), Purity::Absolute);
    assert_eq!(parse("a + 1").unwrap().purity(), Purity::Relative);
}

#[test]
fn test_literal_classification() {
    assert!(parse("42").unwrap().is_literal());
    assert!(parse("'x'").unwrap().is_literal());
    assert!(parse("[1, 2]").unwrap().is_literal());
    assert!(parse("{a: [null]}").unwrap().is_literal());
    assert!(!parse("[1, a]").unwrap().is_literal());
    assert!(!parse("1 + 2").unwrap().is_literal());
}

#[test]
fn test_filter_purity() {
    let mut filters = bindex::FilterRegistry::new();
    filters
        .register("pure", |input, _| Ok(input.clone()))
        .register_stateful("now", |_, _| Ok(Value::Integer(0)));
    let engine = Engine::new().with_filters(filters);

    assert!(engine.parse("1 | pure").unwrap().is_constant());
    assert!(engine.parse("1 | pure:2").unwrap().is_constant());
    assert!(!engine.parse("a | pure").unwrap().is_constant());
    assert!(!engine.parse("1 | pure:a").unwrap().is_constant());
    assert!(!engine.parse("1 | now").unwrap().is_constant());
}

// ============================================================================
// One-time Bindings
// ============================================================================

#[test]
fn test_one_time_binding_settles_once_defined() {
    let scope = Value::object([("a", Value::Undefined)]);
    let expr = parse("::a").unwrap();
    assert!(expr.is_one_time());

    assert_eq!(
        expr.watch(&scope, None).unwrap(),
        Observation {
            value: Value::Undefined,
            settled: false
        }
    );

    scope.set_member("a", Value::Integer(5)).unwrap();
    assert_eq!(
        expr.watch(&scope, None).unwrap(),
        Observation {
            value: Value::Integer(5),
            settled: true
        }
    );
}

#[test]
fn test_one_time_null_counts_as_defined() {
    let scope = Value::object([("a", Value::Null)]);
    assert!(parse("::a").unwrap().watch(&scope, None).unwrap().settled);
}

#[test]
fn test_one_time_literal_waits_for_every_element() {
    let scope = Value::object([("a", Value::Integer(1))]);
    let array = parse("::[a, b]").unwrap();
    let object = parse("::{x: a, y: b}").unwrap();

    assert!(!array.watch(&scope, None).unwrap().settled);
    assert!(!object.watch(&scope, None).unwrap().settled);

    scope.set_member("b", Value::Integer(2)).unwrap();
    assert!(array.watch(&scope, None).unwrap().settled);
    assert!(object.watch(&scope, None).unwrap().settled);
}

#[test]
fn test_non_one_time_settles_only_when_constant() {
    let scope = Value::object([("a", Value::Integer(1))]);
    assert!(!parse("a").unwrap().watch(&scope, None).unwrap().settled);
    assert!(parse("1 + 1").unwrap().watch(&scope, None).unwrap().settled);
}

#[test]
fn test_one_time_prefix_is_part_of_cache_key() {
    let engine = Engine::new();
    let plain = engine.parse("a").unwrap();
    let once = engine.parse("::a").unwrap();
    assert!(!plain.is_one_time());
    assert!(once.is_one_time());
    assert!(!plain.ptr_eq(&once));
    assert_eq!(engine.cache().map(|c| c.len()), Some(2));
}

// ============================================================================
// Security
// ============================================================================

#[test]
fn test_constructor_escape_is_blocked() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    let ctor = Value::function(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::function(|_, _| Ok(Value::Integer(1))))
    });
    let inner = Value::object([("constructor", ctor)]);
    let scope = Value::object([("a", Value::object([("constructor", inner)]))]);

    let expr = parse("a.constructor.constructor('return 1')()").unwrap();
    let err = expr.evaluate(&scope, None).unwrap_err();
    assert_eq!(
        err,
        EvalError::Security {
            member: "constructor".into()
        }
    );
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_every_resolution_path_is_checked() {
    let scope = Value::object([("a", empty()), ("k", Value::from("__proto__"))]);
    let sources = [
        "constructor",
        "a.__proto__",
        "a['constructor']",
        "a[k]",
        "a.__defineGetter__('x', 1)",
        "a.__lookupSetter__",
        "missing.constructor",
    ];
    for source in sources {
        let err = parse(source).unwrap().evaluate(&scope, None).unwrap_err();
        assert!(matches!(err, EvalError::Security { .. }), "Failed for input: {}", source);
    }

    let write = parse("a.constructor").unwrap().assign(&scope, Value::Null, None);
    assert!(matches!(write, Err(EvalError::Security { .. })));
    let write = parse("a[k]").unwrap().assign(&scope, Value::Null, None);
    assert!(matches!(write, Err(EvalError::Security { .. })));
    let create = parse("constructor.x").unwrap().assign(&scope, Value::Null, None);
    assert!(matches!(create, Err(EvalError::Security { .. })));
}

#[test]
fn test_denylist_is_configurable() {
    let scope = Value::object([("user", Value::object([("password", Value::from("x"))]))]);

    let mut sandbox = Sandbox::default();
    sandbox.deny("password");
    let strict = Engine::new().with_sandbox(sandbox);
    assert!(matches!(
        strict.parse("user.password").unwrap().evaluate(&scope, None),
        Err(EvalError::Security { .. })
    ));

    let open = Engine::new().with_sandbox(Sandbox::permissive());
    assert_eq!(
        open.parse("user.constructor").unwrap().evaluate(&scope, None).unwrap(),
        Value::Undefined
    );
}

// ============================================================================
// Cache and Entry Point
// ============================================================================

#[test]
fn test_round_trip_idempotence() {
    let scope = Value::object([("a", Value::Integer(4))]);
    let first = parse("a * a + 1").unwrap();
    let second = parse("a * a + 1").unwrap();
    assert_eq!(
        first.evaluate(&scope, None).unwrap(),
        second.evaluate(&scope, None).unwrap()
    );

    let engine = Engine::new().without_cache();
    let x = engine.parse("a * a + 1").unwrap();
    let y = engine.parse("a * a + 1").unwrap();
    assert!(!x.ptr_eq(&y));
    assert_eq!(x.evaluate(&scope, None).unwrap(), Value::Integer(17));
    assert_eq!(y.evaluate(&scope, None).unwrap(), Value::Integer(17));
}

#[test]
fn test_cache_shares_compilations() {
    let engine = Engine::new();
    let first = engine.parse("a + b").unwrap();
    let second = engine.parse("a + b").unwrap();
    assert!(first.ptr_eq(&second));

    let cache = engine.cache().unwrap();
    assert_eq!(cache.len(), 1);
    assert!(cache.get("a + b").is_some());
    assert!(cache.get("a+b").is_none());

    cache.clear();
    assert!(cache.is_empty());
    assert!(!engine.parse("a + b").unwrap().ptr_eq(&first));
}

#[test]
fn test_failed_parses_are_not_cached() {
    let engine = Engine::new();
    assert!(engine.parse("a +").is_err());
    assert!(engine.cache().unwrap().is_empty());
}

#[test]
fn test_concurrent_parses_converge() {
    let engine = Arc::new(Engine::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.parse("shared.value * 2").unwrap())
        })
        .collect();
    let compiled: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let cached = engine.cache().unwrap().get("shared.value * 2").unwrap();
    assert_eq!(engine.cache().unwrap().len(), 1);
    for expr in &compiled[1..] {
        assert_eq!(expr.source(), compiled[0].source());
    }
    let scope = Value::object([("shared", Value::object([("value", Value::Integer(21))]))]);
    assert_eq!(cached.evaluate(&scope, None).unwrap(), Value::Integer(42));
}

#[test]
fn test_expressions_are_shareable_across_threads() {
    let expr = parse("n + 1").unwrap();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let expr = expr.clone();
            thread::spawn(move || {
                let scope = Value::object([("n", Value::Integer(i))]);
                expr.evaluate(&scope, None).unwrap()
            })
        })
        .collect();
    let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        results,
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(3), Value::Integer(4)]
    );
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_engine_from_config() {
    let config = EngineConfig::from_json(
        r#"{
            "extra_denylist": ["secret"],
            "literals": {"yes": true, "answer": 42},
            "cache": false
        }"#,
    )
    .unwrap();
    let engine = Engine::from_config(&config).unwrap();
    assert!(engine.cache().is_none());
    assert!(engine.sandbox().is_denied("constructor"));
    assert!(engine.sandbox().is_denied("secret"));

    let expr = engine.parse("yes && answer").unwrap();
    assert!(expr.is_constant());
    assert_eq!(expr.evaluate(&empty(), None).unwrap(), Value::Integer(42));
}

#[test]
fn test_with_literal() {
    let engine = Engine::new().with_literal("nothing", Literal::Null);
    let expr = engine.parse("nothing").unwrap();
    assert!(expr.is_literal());
    assert_eq!(expr.evaluate(&empty(), None).unwrap(), Value::Null);
}

#[test]
fn test_statements_evaluate_to_last() {
    let scope = empty();
    let expr = parse("a = 1; b = a + 1; a + b").unwrap();
    assert_eq!(expr.evaluate(&scope, None).unwrap(), Value::Integer(3));
    assert_eq!(parse("").unwrap().evaluate(&scope, None).unwrap(), Value::Undefined);
}
