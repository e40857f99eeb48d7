//! Annotation checking by schema shape
//!
//! [`Validator::check`] classifies the annotation and applies the matching
//! rule, recursing for nested element annotations:
//!
//! | Annotation            | Rule                                               |
//! |-----------------------|----------------------------------------------------|
//! | `Any`                 | always passes                                      |
//! | `Type(T)`             | `isinstance(value, T)`                             |
//! | `List` / `Tuple`      | one element: every item; more: fixed length        |
//! | `Dict`                | exactly one `(key, value)` pair, every entry       |
//! | `Set` / `FrozenSet`   | exactly one member annotation, every member        |
//! | `Predicate`           | unary, must return `true`                          |
//! | `Expression`          | evaluated over the bound arguments, must be `true` |
//! | `Custom`              | delegated to the checker, errors wrapped           |
//!
//! Literal cardinality is checked before the value is looked at: a malformed
//! `Dict` or `Set` annotation raises whatever the value is.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::checker::CheckAnnotation;
use crate::error::{
    CheckError, FailureReason, Inconsistency, RaisedError, Result, SchemaDefinitionError,
    ValidationFailure,
};
use crate::expression::{ExpressionEvaluator, Namespace};
use crate::schema::{panic_message, Predicate, Schema};
use crate::trail::Trail;
use crate::value::{Value, ValueType};

/// Trail handed to the key and value checks of a mapping annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingTrail {
    /// Start from an empty trail, dropping the caller's path
    #[default]
    Fresh,
    /// Extend the caller's trail with a `dict key/value check` segment
    Inherit,
}

/// Options controlling diagnostics
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    pub mapping_trail: MappingTrail,
}

/// Checks values against annotations
///
/// Holds no mutable state; a single validator may check any number of
/// values. The expression evaluator and namespace are only needed for
/// textual annotations.
#[derive(Clone, Copy, Default)]
pub struct Validator<'a> {
    options: CheckOptions,
    evaluator: Option<&'a dyn ExpressionEvaluator>,
    namespace: Option<&'a Namespace>,
}

impl<'a> Validator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable textual annotations, evaluated over `namespace`
    pub fn with_expressions(
        mut self,
        evaluator: &'a dyn ExpressionEvaluator,
        namespace: &'a Namespace,
    ) -> Self {
        self.evaluator = Some(evaluator);
        self.namespace = Some(namespace);
        self
    }

    pub fn options(&self) -> CheckOptions {
        self.options
    }

    /// Check `value` against `schema` for parameter `param`
    pub fn check(&self, param: &str, schema: &Schema, value: &Value, trail: &Trail) -> Result<()> {
        trace!(param, annotation = %schema, depth = trail.len(), "checking annotation");
        match schema {
            Schema::Any => Ok(()),
            Schema::Type(expected) => self.check_type(param, *expected, value, trail),
            Schema::List(items) => {
                self.check_sequence(param, schema, ValueType::List, items, value, trail)
            }
            Schema::Tuple(items) => {
                self.check_sequence(param, schema, ValueType::Tuple, items, value, trail)
            }
            Schema::Dict(pairs) => self.check_dict(param, schema, pairs, value, trail),
            Schema::Set(items) => {
                self.check_set(param, schema, ValueType::Set, items, value, trail)
            }
            Schema::FrozenSet(items) => {
                self.check_set(param, schema, ValueType::FrozenSet, items, value, trail)
            }
            Schema::Predicate(predicate) => self.check_predicate(param, predicate, value, trail),
            Schema::Expression(text) => self.check_expression(param, schema, text, value, trail),
            Schema::Custom(checker) => self.check_custom(param, checker.as_ref(), value, trail),
        }
    }

    fn wrong_type(param: &str, expected: ValueType, value: &Value, trail: &Trail) -> CheckError {
        ValidationFailure::new(
            param,
            value.clone(),
            FailureReason::WrongType {
                actual: value.type_of().to_string(),
                expected: expected.to_string(),
            },
            trail.clone(),
        )
        .into()
    }

    fn check_type(&self, param: &str, expected: ValueType, value: &Value, trail: &Trail) -> Result<()> {
        if value.is_instance(expected) {
            Ok(())
        } else {
            Err(Self::wrong_type(param, expected, value, trail))
        }
    }

    fn check_sequence(
        &self,
        param: &str,
        schema: &Schema,
        kind: ValueType,
        items: &[Schema],
        value: &Value,
        trail: &Trail,
    ) -> Result<()> {
        if items.is_empty() {
            return Err(SchemaDefinitionError::new(
                param,
                schema.to_string(),
                Inconsistency::EmptySequence { kind: kind.name() },
                trail.clone(),
            )
            .into());
        }

        let elements = match (kind, value) {
            (ValueType::List, Value::List(elements)) | (ValueType::Tuple, Value::Tuple(elements)) => {
                elements
            }
            _ => return Err(Self::wrong_type(param, kind, value, trail)),
        };

        if let [item] = items {
            for (index, element) in elements.iter().enumerate() {
                let step = trail.push(format!("{}[{}] check: {}", kind, index, item));
                self.check(param, item, element, &step)?;
            }
            return Ok(());
        }

        if items.len() != elements.len() {
            return Err(ValidationFailure::new(
                param,
                value.clone(),
                FailureReason::ElementCount {
                    annotation: schema.to_string(),
                    expected: items.len(),
                    actual: elements.len(),
                },
                trail.clone(),
            )
            .into());
        }
        for (index, (item, element)) in items.iter().zip(elements).enumerate() {
            let step = trail.push(format!("{}[{}] check: {}", kind, index, item));
            self.check(param, item, element, &step)?;
        }
        Ok(())
    }

    fn check_dict(
        &self,
        param: &str,
        schema: &Schema,
        pairs: &[(Schema, Schema)],
        value: &Value,
        trail: &Trail,
    ) -> Result<()> {
        let (key_schema, value_schema) = match pairs {
            [(k, v)] => (k, v),
            _ => {
                return Err(SchemaDefinitionError::new(
                    param,
                    schema.to_string(),
                    Inconsistency::Cardinality {
                        kind: "dict",
                        found: pairs.len(),
                    },
                    trail.clone(),
                )
                .into())
            }
        };

        let Value::Dict(entries) = value else {
            return Err(Self::wrong_type(param, ValueType::Dict, value, trail));
        };

        let (key_trail, value_trail) = match self.options.mapping_trail {
            MappingTrail::Fresh => (Trail::new(), Trail::new()),
            MappingTrail::Inherit => (
                trail.push(format!("dict key check: {}", key_schema)),
                trail.push(format!("dict value check: {}", value_schema)),
            ),
        };
        for (k, v) in entries {
            self.check(param, key_schema, k, &key_trail)?;
            self.check(param, value_schema, v, &value_trail)?;
        }
        Ok(())
    }

    fn check_set(
        &self,
        param: &str,
        schema: &Schema,
        kind: ValueType,
        items: &[Schema],
        value: &Value,
        trail: &Trail,
    ) -> Result<()> {
        let [item] = items else {
            return Err(SchemaDefinitionError::new(
                param,
                schema.to_string(),
                Inconsistency::Cardinality {
                    kind: kind.name(),
                    found: items.len(),
                },
                trail.clone(),
            )
            .into());
        };

        let members = match (kind, value) {
            (ValueType::Set, Value::Set(members))
            | (ValueType::FrozenSet, Value::FrozenSet(members)) => members,
            _ => return Err(Self::wrong_type(param, kind, value, trail)),
        };

        let step = trail.push(format!("{} value check: {}", kind, item));
        for member in members {
            self.check(param, item, member, &step)?;
        }
        Ok(())
    }

    fn check_predicate(
        &self,
        param: &str,
        predicate: &Predicate,
        value: &Value,
        trail: &Trail,
    ) -> Result<()> {
        if predicate.arity() != 1 {
            return Err(SchemaDefinitionError::new(
                param,
                predicate.to_string(),
                Inconsistency::PredicateArity {
                    arity: predicate.arity(),
                },
                trail.clone(),
            )
            .into());
        }
        Self::verdict(param, predicate.to_string(), predicate.call(value), value, trail)
    }

    fn check_expression(
        &self,
        param: &str,
        schema: &Schema,
        text: &str,
        value: &Value,
        trail: &Trail,
    ) -> Result<()> {
        let Some(evaluator) = self.evaluator else {
            return Err(SchemaDefinitionError::new(
                param,
                schema.to_string(),
                Inconsistency::NoEvaluator,
                trail.clone(),
            )
            .into());
        };
        let empty = Namespace::new();
        let namespace = self.namespace.unwrap_or(&empty);
        Self::verdict(
            param,
            schema.to_string(),
            evaluator.evaluate(text, namespace),
            value,
            trail,
        )
    }

    /// Only a boolean `true` passes
    fn verdict(
        param: &str,
        predicate: String,
        outcome: std::result::Result<Value, RaisedError>,
        value: &Value,
        trail: &Trail,
    ) -> Result<()> {
        let reason = match outcome {
            Ok(Value::Bool(true)) => return Ok(()),
            Ok(_) => FailureReason::Rejected { predicate },
            Err(error) => FailureReason::Raised { predicate, error },
        };
        Err(ValidationFailure::new(param, value.clone(), reason, trail.clone()).into())
    }

    fn check_custom(
        &self,
        param: &str,
        checker: &dyn CheckAnnotation,
        value: &Value,
        trail: &Trail,
    ) -> Result<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            checker.check_annotation(self, param, value, trail)
        }));

        let (error, cause) = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => match classify(err) {
                Classified::Inconsistent(e) => return Err(e.into()),
                Classified::Failed(failure) => (
                    RaisedError::new("ValidationFailure", failure.to_string()),
                    Some(Box::new(failure)),
                ),
                Classified::Other(error) => (error, None),
            },
            Err(payload) => (RaisedError::new("panic", panic_message(payload.as_ref())), None),
        };

        Err(ValidationFailure::new(
            param,
            value.clone(),
            FailureReason::CheckerRaised {
                checker: checker.to_string(),
                error,
                cause,
            },
            trail.clone(),
        )
        .into())
    }
}

enum Classified {
    Failed(ValidationFailure),
    Inconsistent(SchemaDefinitionError),
    Other(RaisedError),
}

fn classify(err: anyhow::Error) -> Classified {
    let err = match err.downcast::<CheckError>() {
        Ok(CheckError::Failed(failure)) => return Classified::Failed(failure),
        Ok(CheckError::Inconsistent(e)) => return Classified::Inconsistent(e),
        Err(err) => err,
    };
    let err = match err.downcast::<ValidationFailure>() {
        Ok(failure) => return Classified::Failed(failure),
        Err(err) => err,
    };
    match err.downcast::<SchemaDefinitionError>() {
        Ok(e) => Classified::Inconsistent(e),
        Err(err) => Classified::Other(RaisedError::new("Error", format!("{:#}", err))),
    }
}

/// Check with a default validator and an empty trail
pub fn check(param: &str, schema: &Schema, value: &Value) -> Result<()> {
    Validator::new()
        .check(param, schema, value, &Trail::new())
        .inspect_err(|err| debug!(param, annotation = %schema, error = %err, "annotation check failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_and_type() {
        assert!(check("x", &Schema::Any, &Value::None).is_ok());
        assert!(check("x", &ValueType::Int.into(), &Value::Bool(true)).is_ok());

        let err = check("x", &ValueType::Int.into(), &Value::from("a")).unwrap_err();
        let failure = err.as_failure().unwrap();
        assert!(matches!(
            &failure.reason,
            FailureReason::WrongType { actual, expected } if actual == "str" && expected == "int"
        ));
    }

    #[test]
    fn test_list_is_not_tuple() {
        let schema = Schema::list_of(ValueType::Int);
        let err = check("x", &schema, &Value::tuple([Value::Int(1)])).unwrap_err();
        assert!(err.is_failure());
    }

    #[test]
    fn test_empty_sequence_annotation() {
        let err = check("x", &Schema::List(vec![]), &Value::list([])).unwrap_err();
        assert!(matches!(
            err.as_inconsistency().map(|e| &e.kind),
            Some(Inconsistency::EmptySequence { kind: "list" })
        ));
    }

    #[test]
    fn test_fresh_mapping_trail() {
        let schema = Schema::list_of(Schema::dict_of(ValueType::Str, ValueType::Int));
        let value = Value::list([Value::dict([(Value::from("a"), Value::from("b"))])]);
        let err = check("x", &schema, &value).unwrap_err();
        assert!(err.as_failure().unwrap().trail.is_empty());
    }

    #[test]
    fn test_inherited_mapping_trail() {
        let schema = Schema::list_of(Schema::dict_of(ValueType::Str, ValueType::Int));
        let value = Value::list([Value::dict([(Value::from("a"), Value::from("b"))])]);
        let validator = Validator::new().with_options(CheckOptions {
            mapping_trail: MappingTrail::Inherit,
        });
        let err = validator
            .check("x", &schema, &value, &Trail::new())
            .unwrap_err();
        assert_eq!(
            err.as_failure().unwrap().trail.segments(),
            vec!["list[0] check: {str: int}", "dict value check: int"]
        );
    }

    #[test]
    fn test_expression_without_evaluator() {
        let err = check("x", &Schema::expression("x > 0"), &Value::Int(1)).unwrap_err();
        assert!(matches!(
            err.as_inconsistency().map(|e| &e.kind),
            Some(Inconsistency::NoEvaluator)
        ));
    }

    #[test]
    fn test_predicate_non_bool_result_is_rejected() {
        let predicate = Predicate::with_arity("one", 1, |_| Ok(Value::Int(1)));
        let err = check("x", &predicate.into(), &Value::Int(1)).unwrap_err();
        assert!(matches!(
            err.as_failure().unwrap().reason,
            FailureReason::Rejected { .. }
        ));
    }
}
