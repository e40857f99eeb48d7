//! Annotated Call Tests
//!
//! Argument binding, parameter/return checking and the enable switches.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use familiar_annotations::{
    AnnotationConfig, Annotated, BindError, CallError, FailureReason, Param, Schema, Signature,
    Value, ValueType,
};

fn add() -> Annotated {
    let signature = Signature::new([
        Param::new("a").annotated(ValueType::Int),
        Param::new("b").annotated(ValueType::Int).with_default(1),
    ])
    .returning(ValueType::Int);

    Annotated::new("add", signature, |args| {
        let a = args.get("a").and_then(Value::as_int).unwrap_or_default();
        let b = args.get("b").and_then(Value::as_int).unwrap_or_default();
        Ok(Value::Int(a + b))
    })
}

fn check_failure(err: CallError) -> familiar_annotations::ValidationFailure {
    match err {
        CallError::Check(check) => check
            .as_failure()
            .cloned()
            .expect("expected a validation failure"),
        other => panic!("Expected Check error, got {:?}", other),
    }
}

#[test]
fn test_call_checks_parameters() {
    let f = add();
    assert_eq!(f.call(vec![Value::Int(2)]).unwrap(), Value::Int(3));
    assert_eq!(
        f.call_with(vec![], vec![("a".into(), Value::Int(2)), ("b".into(), Value::Int(5))])
            .unwrap(),
        Value::Int(7)
    );

    let failure = check_failure(f.call(vec![Value::Int(2), Value::from("x")]).unwrap_err());
    assert_eq!(failure.param, "b");
    assert_eq!(failure.value, Value::from("x"));
    assert!(failure.trail.is_empty());
}

#[test]
fn test_parameter_failure_skips_body() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let f = Annotated::new(
        "f",
        Signature::new([Param::new("x").annotated(ValueType::Str)]),
        move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(Value::None)
        },
    );

    assert!(f.call(vec![Value::Int(1)]).is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_return_failure_discards_result() {
    let signature = Signature::new([Param::new("x")]).returning(ValueType::Str);
    let f = Annotated::new("echo", signature, |args| {
        Ok(args.get("x").cloned().unwrap_or(Value::None))
    });

    assert_eq!(f.call(vec![Value::from("a")]).unwrap(), Value::from("a"));

    let failure = check_failure(f.call(vec![Value::Int(1)]).unwrap_err());
    assert_eq!(failure.param, "return");
    assert!(matches!(failure.reason, FailureReason::WrongType { .. }));
}

#[test]
fn test_default_is_checked() {
    let signature = Signature::new([Param::new("x")
        .annotated(ValueType::Int)
        .with_default("oops")]);
    let f = Annotated::new("f", signature, |_| Ok(Value::None));

    let failure = check_failure(f.call(vec![]).unwrap_err());
    assert_eq!(failure.value, Value::from("oops"));
}

#[test]
fn test_process_switch_disables_checking() {
    let mut config = AnnotationConfig::default();
    config.checking.enabled = false;

    let signature = Signature::new([Param::new("x").annotated(ValueType::Int)]);
    let f = Annotated::with_config("f", signature, |_| Ok(Value::from("done")), config);

    assert!(!f.is_checking());
    assert_eq!(f.call(vec![Value::from("not an int")]).unwrap(), Value::from("done"));
}

#[test]
fn test_callable_switch_disables_checking() {
    let mut f = add();
    f.set_checking(false);
    assert!(f.call(vec![Value::Int(1), Value::from("x")]).is_ok());

    f.set_checking(true);
    assert!(f.call(vec![Value::Int(1), Value::from("x")]).is_err());
}

#[test]
fn test_bind_error() {
    let err = add().call(vec![]).unwrap_err();
    match err {
        CallError::Bind { name, source } => {
            assert_eq!(name, "add");
            assert_eq!(source, BindError::Missing("a".into()));
        }
        other => panic!("Expected Bind error, got {:?}", other),
    }
}

#[test]
fn test_body_error_propagates() {
    let f = Annotated::new("fails", Signature::default(), |_| {
        anyhow::bail!("body failed")
    });
    let err = f.call(vec![]).unwrap_err();
    assert!(matches!(err, CallError::Body(_)));
    assert_eq!(err.to_string(), "body failed");
}

#[test]
fn test_predicate_parameter() {
    let signature = Signature::new([Param::new("names").annotated(Schema::list_of(
        Schema::predicate("non-empty", |v| v.len().is_some_and(|n| n > 0)),
    ))]);
    let f = Annotated::new("greet", signature, |_| Ok(Value::None));

    assert!(f.call(vec![Value::list([Value::from("ann")])]).is_ok());

    let failure = check_failure(
        f.call(vec![Value::list([Value::from("ann"), Value::from("")])])
            .unwrap_err(),
    );
    assert_eq!(
        failure.trail.segments(),
        vec!["list[1] check: <predicate non-empty>"]
    );
}

#[cfg(feature = "cel")]
#[test]
fn test_expression_over_bound_arguments() {
    let mut config = AnnotationConfig::default();
    config.checking.expressions = true;

    let signature = Signature::new([
        Param::new("lo").annotated(ValueType::Int),
        Param::new("hi").annotated(Schema::expression("lo <= hi")),
    ])
    .returning(Schema::expression("_return >= lo && _return <= hi"));

    let f = Annotated::with_config(
        "midpoint",
        signature,
        |args| {
            let lo = args.get("lo").and_then(Value::as_int).unwrap_or_default();
            let hi = args.get("hi").and_then(Value::as_int).unwrap_or_default();
            Ok(Value::Int((lo + hi) / 2))
        },
        config,
    );

    assert_eq!(f.call(vec![Value::Int(2), Value::Int(8)]).unwrap(), Value::Int(5));

    let failure = check_failure(f.call(vec![Value::Int(8), Value::Int(2)]).unwrap_err());
    assert_eq!(failure.param, "hi");
    assert!(matches!(failure.reason, FailureReason::Rejected { .. }));
}

#[test]
fn test_expression_requires_opt_in() {
    let signature = Signature::new([Param::new("x").annotated(Schema::expression("x > 0"))]);
    let f = Annotated::new("f", signature, |_| Ok(Value::None));

    match f.call(vec![Value::Int(1)]).unwrap_err() {
        CallError::Check(err) => assert!(err.as_inconsistency().is_some()),
        other => panic!("Expected Check error, got {:?}", other),
    }
}
