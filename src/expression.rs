//! Expression evaluation for textual annotations
//!
//! A textual annotation such as `"lo <= x && x <= hi"` is evaluated in a
//! namespace holding the call's bound arguments. Evaluation sits behind the
//! [`ExpressionEvaluator`] trait; the validator only runs expressions when an
//! evaluator is installed.

use std::collections::HashMap;

use crate::error::RaisedError;
use crate::value::Value;

/// Parameter name to bound value
pub type Namespace = HashMap<String, Value>;

/// Evaluates a textual annotation in a namespace
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate `expression`; errors are reported as raised by the annotation
    fn evaluate(&self, expression: &str, namespace: &Namespace) -> Result<Value, RaisedError>;
}

#[cfg(feature = "cel")]
pub use self::cel::CelEvaluator;

#[cfg(feature = "cel")]
mod cel {
    use std::collections::HashMap;

    use cel_interpreter::objects::Key;
    use cel_interpreter::{Context, Program, Value as CelValue};
    use tracing::trace;

    use super::{ExpressionEvaluator, Namespace};
    use crate::error::RaisedError;
    use crate::value::Value;

    /// CEL (Common Expression Language) evaluator
    #[derive(Debug, Default, Clone, Copy)]
    pub struct CelEvaluator;

    impl CelEvaluator {
        pub fn new() -> Self {
            Self
        }
    }

    fn to_key(value: &Value) -> Key {
        match value {
            Value::Str(s) => Key::from(s.clone()),
            Value::Int(i) => Key::from(*i),
            Value::Bool(b) => Key::from(*b),
            other => Key::from(other.to_string()),
        }
    }

    fn to_cel(value: &Value) -> CelValue {
        match value {
            Value::None => CelValue::Null,
            Value::Bool(b) => CelValue::Bool(*b),
            Value::Int(i) => CelValue::Int(*i),
            Value::Float(x) => CelValue::Float(*x),
            Value::Str(s) => CelValue::from(s.clone()),
            Value::List(items)
            | Value::Tuple(items)
            | Value::Set(items)
            | Value::FrozenSet(items) => {
                CelValue::from(items.iter().map(to_cel).collect::<Vec<CelValue>>())
            }
            Value::Dict(entries) => CelValue::from(
                entries
                    .iter()
                    .map(|(k, v)| (to_key(k), to_cel(v)))
                    .collect::<HashMap<Key, CelValue>>(),
            ),
        }
    }

    fn from_cel(value: &CelValue) -> Value {
        match value {
            CelValue::Null => Value::None,
            CelValue::Bool(b) => Value::Bool(*b),
            CelValue::Int(i) => Value::Int(*i),
            CelValue::UInt(u) => i64::try_from(*u).map(Value::Int).unwrap_or(Value::Float(*u as f64)),
            CelValue::Float(x) => Value::Float(*x),
            CelValue::String(s) => Value::Str(s.to_string()),
            CelValue::List(items) => Value::List(items.iter().map(from_cel).collect()),
            other => Value::Str(format!("{:?}", other)),
        }
    }

    impl ExpressionEvaluator for CelEvaluator {
        fn evaluate(&self, expression: &str, namespace: &Namespace) -> Result<Value, RaisedError> {
            let program = Program::compile(expression)
                .map_err(|e| RaisedError::new("ParseError", e.to_string()))?;

            let mut context = Context::default();
            for (name, value) in namespace {
                context.add_variable_from_value(name.clone(), to_cel(value));
            }

            let result = program
                .execute(&context)
                .map_err(|e| RaisedError::new("ExecutionError", e.to_string()))?;
            trace!(expression, ?result, "evaluated expression");
            Ok(from_cel(&result))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn namespace(entries: &[(&str, Value)]) -> Namespace {
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect()
        }

        #[test]
        fn test_boolean_expression() {
            let ns = namespace(&[("x", Value::Int(3)), ("y", Value::Int(5))]);
            let result = CelEvaluator::new().evaluate("x < y", &ns).unwrap();
            assert_eq!(result, Value::Bool(true));
        }

        #[test]
        fn test_collections() {
            let ns = namespace(&[(
                "names",
                Value::list([Value::from("a"), Value::from("b")]),
            )]);
            let result = CelEvaluator::new().evaluate("size(names) == 2", &ns).unwrap();
            assert_eq!(result, Value::Bool(true));
        }

        #[test]
        fn test_unknown_variable_is_raised() {
            let err = CelEvaluator::new()
                .evaluate("missing > 1", &Namespace::new())
                .unwrap_err();
            assert_eq!(err.kind, "ExecutionError");
        }

        #[test]
        fn test_parse_error_is_raised() {
            let err = CelEvaluator::new()
                .evaluate("x >", &Namespace::new())
                .unwrap_err();
            assert_eq!(err.kind, "ParseError");
        }
    }
}
