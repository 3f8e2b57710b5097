use bindex::{Engine, EvalError, FilterRegistry, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn eval_expr(source: &str, scope: &Value) -> Result<Value, EvalError> {
    Engine::new().parse(source).unwrap().evaluate(scope, None)
}

fn empty() -> Value {
    Value::object::<&str, _>([])
}

fn json_object(pairs: Vec<(&str, Value)>) -> Value {
    Value::object(pairs)
}

// ============================================================================
// Arithmetic and Operators
// ============================================================================

#[test]
fn test_operator_precedence() {
    assert_eq!(eval_expr("2 + 3 * 4", &empty()).unwrap(), Value::Integer(14));
    assert_eq!(eval_expr("(2 + 3) * 4", &empty()).unwrap(), Value::Integer(20));
    assert_eq!(eval_expr("-2 * -3", &empty()).unwrap(), Value::Integer(6));
    assert_eq!(eval_expr("10 % 4 + 7 / 2", &empty()).unwrap(), Value::Float(5.5));
}

#[test]
fn test_mixed_number_types() {
    assert_eq!(eval_expr("0.5 + 0.5", &empty()).unwrap(), Value::Integer(1));
    assert!(matches!(eval_expr("1 + 0.5", &empty()).unwrap(), Value::Float(n) if n == 1.5));
    assert!(matches!(eval_expr("0.5 * 4", &empty()).unwrap(), Value::Integer(2)));
}

#[test]
fn test_string_concatenation() {
    let scope = json_object(vec![("name", Value::from("Ada")), ("n", Value::Integer(3))]);
    assert_eq!(eval_expr("'Hi ' + name", &scope).unwrap(), Value::from("Hi Ada"));
    assert_eq!(eval_expr("n + '1'", &scope).unwrap(), Value::from("31"));
    assert_eq!(eval_expr("'a' + missing", &scope).unwrap(), Value::from("a"));
}

#[test]
fn test_forgiving_undefined_arithmetic() {
    let scope = json_object(vec![("a", Value::Integer(5))]);
    assert_eq!(eval_expr("a + missing", &scope).unwrap(), Value::Integer(5));
    assert_eq!(eval_expr("missing - a", &scope).unwrap(), Value::Integer(-5));
    assert_eq!(eval_expr("-missing", &scope).unwrap(), Value::Integer(0));
    assert_eq!(eval_expr("missing + missing", &scope).unwrap(), Value::Undefined);
}

#[test]
fn test_division_by_zero() {
    assert!(matches!(eval_expr("1 / 0", &empty()).unwrap(), Value::Float(n) if n.is_infinite()));
    assert!(matches!(eval_expr("-1 / 0", &empty()).unwrap(), Value::Float(n) if n == f64::NEG_INFINITY));
}

#[test]
fn test_comparisons() {
    let cases = [
        ("1 < 2", true),
        ("'b' > 'a'", true),
        ("'10' < '9'", true),
        ("'10' < 9", false),
        ("2 >= 2.0", true),
        ("missing < 1", false),
        ("missing >= 1", false),
    ];
    for (source, expected) in cases {
        assert_eq!(
            eval_expr(source, &empty()).unwrap(),
            Value::Boolean(expected),
            "Failed for input: {}",
            source
        );
    }
}

#[test]
fn test_loose_vs_strict_equality() {
    let cases = [
        ("null == undefined", true),
        ("null === undefined", false),
        ("1 == '1'", true),
        ("1 === '1'", false),
        ("1 === 1.0", true),
        ("true == 1", true),
        ("0 == ''", true),
        ("null == 0", false),
        ("'a' != 'a'", false),
        ("1 !== '1'", true),
    ];
    for (source, expected) in cases {
        assert_eq!(
            eval_expr(source, &empty()).unwrap(),
            Value::Boolean(expected),
            "Failed for input: {}",
            source
        );
    }
}

#[test]
fn test_containers_compare_by_identity() {
    let items = Value::array([Value::Integer(1)]);
    let scope = json_object(vec![("a", items.clone()), ("b", items)]);
    assert_eq!(eval_expr("a === b", &scope).unwrap(), Value::Boolean(true));
    assert_eq!(eval_expr("[1] === [1]", &scope).unwrap(), Value::Boolean(false));
    assert_eq!(eval_expr("{} == {}", &scope).unwrap(), Value::Boolean(false));
}

#[test]
fn test_logical_operators_return_operands() {
    let scope = json_object(vec![("name", Value::from("x")), ("zero", Value::Integer(0))]);
    assert_eq!(eval_expr("name || 'default'", &scope).unwrap(), Value::from("x"));
    assert_eq!(eval_expr("zero || 'default'", &scope).unwrap(), Value::from("default"));
    assert_eq!(eval_expr("zero && name", &scope).unwrap(), Value::Integer(0));
    assert_eq!(eval_expr("!zero", &scope).unwrap(), Value::Boolean(true));
    assert_eq!(eval_expr("!!name", &scope).unwrap(), Value::Boolean(true));
}

#[test]
fn test_short_circuit_skips_side_effects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let scope = json_object(vec![
        ("a", Value::Boolean(false)),
        (
            "sideEffect",
            Value::function(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Boolean(true))
            }),
        ),
    ]);

    assert_eq!(eval_expr("a && sideEffect()", &scope).unwrap(), Value::Boolean(false));
    assert_eq!(eval_expr("!a || sideEffect()", &scope).unwrap(), Value::Boolean(true));
    assert_eq!(eval_expr("a ? sideEffect() : 1", &scope).unwrap(), Value::Integer(1));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(eval_expr("!a && sideEffect()", &scope).unwrap(), Value::Boolean(true));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Navigation
// ============================================================================

#[test]
fn test_null_safe_navigation() {
    let scope = json_object(vec![("a", Value::Null)]);
    assert_eq!(eval_expr("a.b.c", &scope).unwrap(), Value::Undefined);
    assert_eq!(eval_expr("missing.b[0].c", &scope).unwrap(), Value::Undefined);
}

#[test]
fn test_computed_key_not_evaluated_on_nullish_object() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let scope = json_object(vec![(
        "key",
        Value::function(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from("x"))
        }),
    )]);
    assert_eq!(eval_expr("missing[key()]", &scope).unwrap(), Value::Undefined);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_array_and_string_members() {
    let scope = json_object(vec![
        ("items", Value::array([Value::from("a"), Value::from("b")])),
        ("word", Value::from("hello")),
        ("i", Value::Integer(1)),
    ]);
    assert_eq!(eval_expr("items[i]", &scope).unwrap(), Value::from("b"));
    assert_eq!(eval_expr("items['0']", &scope).unwrap(), Value::from("a"));
    assert_eq!(eval_expr("items.length", &scope).unwrap(), Value::Integer(2));
    assert_eq!(eval_expr("items[5]", &scope).unwrap(), Value::Undefined);
    assert_eq!(eval_expr("word.length", &scope).unwrap(), Value::Integer(5));
    assert_eq!(eval_expr("word[4]", &scope).unwrap(), Value::from("o"));
}

#[test]
fn test_locals_shadow_scope() {
    let scope = json_object(vec![("a", Value::Integer(1)), ("b", Value::Integer(2))]);
    let locals = json_object(vec![("a", Value::Integer(10))]);
    let expr = Engine::new().parse("a + b").unwrap();
    assert_eq!(expr.evaluate(&scope, Some(&locals)).unwrap(), Value::Integer(12));
    assert_eq!(expr.evaluate(&scope, None).unwrap(), Value::Integer(3));
}

#[test]
fn test_this_and_locals_keywords() {
    let scope = json_object(vec![("a", Value::Integer(1))]);
    let locals = json_object(vec![("a", Value::Integer(2))]);
    let engine = Engine::new();
    let read = |source: &str| engine.parse(source).unwrap().evaluate(&scope, Some(&locals)).unwrap();

    assert_eq!(read("this.a"), Value::Integer(1));
    assert_eq!(read("$locals.a"), Value::Integer(2));
    assert_eq!(read("a"), Value::Integer(2));
    assert_eq!(engine.parse("$locals").unwrap().evaluate(&scope, None).unwrap(), Value::Undefined);
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_literals() {
    let scope = json_object(vec![("v", Value::Integer(7)), ("k", Value::from("dyn"))]);
    assert_eq!(eval_expr("undefined", &scope).unwrap(), Value::Undefined);
    assert_eq!(
        eval_expr("[1, v, 'x',]", &scope).unwrap(),
        Value::array([Value::Integer(1), Value::Integer(7), Value::from("x")])
    );
    assert_eq!(
        eval_expr("{v, 'a b': 1, [k]: 2}", &scope).unwrap(),
        Value::object([
            ("v", Value::Integer(7)),
            ("a b", Value::Integer(1)),
            ("dyn", Value::Integer(2)),
        ])
    );
}

#[test]
fn test_literals_are_fresh_per_evaluation() {
    let expr = Engine::new().parse("{a: []}").unwrap();
    let first = expr.evaluate(&empty(), None).unwrap();
    let second = expr.evaluate(&empty(), None).unwrap();
    assert_eq!(first, second);
    assert!(!bindex::ops::strict_equals(&first, &second));
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_method_calls_receive_this() {
    let user = json_object(vec![("name", Value::from("Ada"))]);
    user.set_member(
        "greet",
        Value::function(|this, args| {
            let greeting = args.first().map(Value::as_string).unwrap_or_default();
            Ok(Value::from(format!("{} {}", greeting, this.get_member("name").as_string())))
        }),
    )
    .unwrap();
    let scope = json_object(vec![
        ("user", user),
        ("whoami", Value::function(|this, _| Ok(Value::from(this.type_name())))),
    ]);

    assert_eq!(eval_expr("user.greet('Hello')", &scope).unwrap(), Value::from("Hello Ada"));
    assert_eq!(eval_expr("user['greet']('Hi')", &scope).unwrap(), Value::from("Hi Ada"));
    assert_eq!(eval_expr("whoami()", &scope).unwrap(), Value::from("undefined"));
}

#[test]
fn test_calling_nullish_yields_undefined() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let scope = json_object(vec![(
        "arg",
        Value::function(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }),
    )]);
    assert_eq!(eval_expr("missing(arg())", &scope).unwrap(), Value::Undefined);
    assert_eq!(eval_expr("missing.method(arg())", &scope).unwrap(), Value::Undefined);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_calling_non_function_is_type_error() {
    let scope = json_object(vec![("n", Value::Integer(1))]);
    let err = eval_expr("n()", &scope).unwrap_err();
    assert!(matches!(&err, EvalError::TypeError(msg) if msg.contains("'n' is not a function")));
}

#[test]
fn test_host_errors_propagate() {
    let scope = json_object(vec![(
        "fail",
        Value::function(|_, _| Err(EvalError::host("boom"))),
    )]);
    let expr = Engine::new().parse("1 + fail()").unwrap();
    assert_eq!(expr.evaluate(&scope, None).unwrap_err(), EvalError::Host("boom".into()));
    // a failed evaluation leaves the expression usable
    assert_eq!(expr.evaluate(&empty(), None).unwrap(), Value::Integer(1));
}

// ============================================================================
// Filters
// ============================================================================

fn math_filters() -> FilterRegistry {
    let mut filters = FilterRegistry::new();
    filters
        .register("double", |input, _| {
            Ok(bindex::ops::add(&input.to_number(), &input.to_number()))
        })
        .register("add", |input, args| {
            Ok(bindex::ops::add(input, args.first().unwrap_or(&Value::Undefined)))
        });
    filters
}

#[test]
fn test_filter_chaining() {
    let engine = Engine::new().with_filters(math_filters());
    let expr = engine.parse("3 | double | double").unwrap();
    assert_eq!(expr.evaluate(&empty(), None).unwrap(), Value::Integer(12));
}

#[test]
fn test_filter_arguments() {
    let engine = Engine::new().with_filters(math_filters());
    let scope = json_object(vec![("x", Value::Integer(2))]);
    let expr = engine.parse("x | add:10 | double").unwrap();
    assert_eq!(expr.evaluate(&scope, None).unwrap(), Value::Integer(24));
}

#[test]
fn test_unknown_filter_fails_at_evaluation() {
    let expr = Engine::new().parse("1 | nope").unwrap();
    assert!(!expr.is_constant());
    assert_eq!(
        expr.evaluate(&empty(), None).unwrap_err(),
        EvalError::UnknownFilter("nope".into())
    );
}

#[test]
fn test_closure_filter_resolver() {
    let engine = Engine::new().with_filters(|name: &str| {
        (name == "len").then(|| {
            bindex::Filter::new(|input, _| Ok(input.get_member("length")))
        })
    });
    let expr = engine.parse("'abc' | len").unwrap();
    assert_eq!(expr.evaluate(&empty(), None).unwrap(), Value::Integer(3));
}
