//! Annotated callables
//!
//! [`Annotated`] wraps a function body with a [`Signature`] whose parameters
//! (and return value) may carry annotations. Each call binds its arguments,
//! checks every annotated parameter, runs the body and checks the result.
//! Checking is skipped when either the process-level switch
//! ([`AnnotationConfig`]) or the callable's own switch is off.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::AnnotationConfig;
use crate::error::CheckError;
use crate::expression::{ExpressionEvaluator, Namespace};
use crate::schema::Schema;
use crate::trail::Trail;
use crate::validator::Validator;
use crate::value::Value;

/// Name the result is bound to in the expression namespace
pub const RETURN_BINDING: &str = "_return";

/// Param name used when checking the return annotation
pub const RETURN_PARAM: &str = "return";

/// Errors binding arguments to a signature
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("takes {expected} positional arguments but {given} were given")]
    TooManyPositional { expected: usize, given: usize },

    #[error("got an unexpected keyword argument '{0}'")]
    UnexpectedKeyword(String),

    #[error("got multiple values for argument '{0}'")]
    MultipleValues(String),

    #[error("missing required argument '{0}'")]
    Missing(String),
}

/// Errors from calling an annotated function
#[derive(Error, Debug)]
pub enum CallError {
    #[error("{name}() {source}")]
    Bind {
        name: String,
        #[source]
        source: BindError,
    },

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    Body(anyhow::Error),
}

/// A single parameter of a signature
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Schema>,
    pub default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    pub fn annotated(mut self, schema: impl Into<Schema>) -> Self {
        self.annotation = Some(schema.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Ordered parameters plus an optional return annotation
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Param>,
    returns: Option<Schema>,
}

impl Signature {
    pub fn new(params: impl IntoIterator<Item = Param>) -> Self {
        Self {
            params: params.into_iter().collect(),
            returns: None,
        }
    }

    pub fn returning(mut self, schema: impl Into<Schema>) -> Self {
        self.returns = Some(schema.into());
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn returns(&self) -> Option<&Schema> {
        self.returns.as_ref()
    }

    /// Bind positional then keyword arguments, filling in defaults
    pub fn bind(
        &self,
        positional: Vec<Value>,
        keyword: Vec<(String, Value)>,
    ) -> Result<BoundArguments, BindError> {
        if positional.len() > self.params.len() {
            return Err(BindError::TooManyPositional {
                expected: self.params.len(),
                given: positional.len(),
            });
        }

        let mut slots: Vec<Option<Value>> = vec![None; self.params.len()];
        for (slot, value) in slots.iter_mut().zip(positional) {
            *slot = Some(value);
        }

        for (name, value) in keyword {
            let index = self
                .params
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| BindError::UnexpectedKeyword(name.clone()))?;
            if slots[index].is_some() {
                return Err(BindError::MultipleValues(name));
            }
            slots[index] = Some(value);
        }

        let arguments = self
            .params
            .iter()
            .zip(slots)
            .map(|(param, slot)| {
                slot.or_else(|| param.default.clone())
                    .map(|value| (param.name.clone(), value))
                    .ok_or_else(|| BindError::Missing(param.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BoundArguments { arguments })
    }
}

/// Parameter bindings in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArguments {
    arguments: Vec<(String, Value)>,
}

impl BoundArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.arguments.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Namespace for textual annotations
    pub fn namespace(&self) -> Namespace {
        self.arguments.iter().cloned().collect()
    }
}

type Body = dyn Fn(&BoundArguments) -> anyhow::Result<Value> + Send + Sync;

/// A function whose parameters and result are checked against annotations
pub struct Annotated {
    name: String,
    signature: Signature,
    body: Box<Body>,
    config: AnnotationConfig,
    checking_on: bool,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
}

impl Annotated {
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(&BoundArguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::with_config(name, signature, body, AnnotationConfig::default())
    }

    /// Build with an explicit process-level configuration
    pub fn with_config<F>(
        name: impl Into<String>,
        signature: Signature,
        body: F,
        config: AnnotationConfig,
    ) -> Self
    where
        F: Fn(&BoundArguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let evaluator = default_evaluator(&config);
        Self {
            name: name.into(),
            signature,
            body: Box::new(body),
            config,
            checking_on: true,
            evaluator,
        }
    }

    /// Install an evaluator for textual annotations
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Per-callable switch
    pub fn set_checking(&mut self, on: bool) {
        self.checking_on = on;
    }

    pub fn is_checking(&self) -> bool {
        self.config.checking.enabled && self.checking_on
    }

    /// Call with positional arguments only
    pub fn call(&self, positional: Vec<Value>) -> Result<Value, CallError> {
        self.call_with(positional, Vec::new())
    }

    #[instrument(skip_all, fields(function = %self.name))]
    pub fn call_with(
        &self,
        positional: Vec<Value>,
        keyword: Vec<(String, Value)>,
    ) -> Result<Value, CallError> {
        let bound = self
            .signature
            .bind(positional, keyword)
            .map_err(|source| CallError::Bind {
                name: self.name.clone(),
                source,
            })?;

        if !self.is_checking() {
            return (self.body)(&bound).map_err(CallError::Body);
        }

        let mut namespace = bound.namespace();
        {
            let validator = self.validator(&namespace);
            for (param, (_, value)) in self.signature.params.iter().zip(bound.iter()) {
                if let Some(schema) = &param.annotation {
                    validator
                        .check(&param.name, schema, value, &Trail::new())
                        .inspect_err(|err| log_failure(&param.name, schema, err))?;
                }
            }
        }

        let result = (self.body)(&bound).map_err(CallError::Body)?;

        if let Some(schema) = &self.signature.returns {
            namespace.insert(RETURN_BINDING.to_string(), result.clone());
            self.validator(&namespace)
                .check(RETURN_PARAM, schema, &result, &Trail::new())
                .inspect_err(|err| log_failure(RETURN_PARAM, schema, err))?;
        }
        debug!(result = %result, "annotated call passed");
        Ok(result)
    }

    fn validator<'a>(&'a self, namespace: &'a Namespace) -> Validator<'a> {
        let validator = Validator::new().with_options(self.config.check_options());
        match &self.evaluator {
            Some(evaluator) => validator.with_expressions(evaluator.as_ref(), namespace),
            None => validator,
        }
    }
}

fn log_failure(param: &str, schema: &Schema, err: &CheckError) {
    debug!(param, annotation = %schema, error = %err, "annotation check failed");
}

#[cfg(feature = "cel")]
fn default_evaluator(config: &AnnotationConfig) -> Option<Arc<dyn ExpressionEvaluator>> {
    if config.checking.expressions {
        Some(Arc::new(crate::expression::CelEvaluator::new()))
    } else {
        None
    }
}

#[cfg(not(feature = "cel"))]
fn default_evaluator(_config: &AnnotationConfig) -> Option<Arc<dyn ExpressionEvaluator>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn signature() -> Signature {
        Signature::new([
            Param::new("a").annotated(ValueType::Int),
            Param::new("b"),
            Param::new("c").with_default(10),
        ])
    }

    #[test]
    fn test_bind_fills_defaults() {
        let bound = signature()
            .bind(vec![Value::Int(1)], vec![("b".into(), Value::from("x"))])
            .unwrap();
        assert_eq!(bound.get("c"), Some(&Value::Int(10)));
        let names: Vec<_> = bound.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_bind_errors() {
        let sig = signature();
        assert_eq!(
            sig.bind(vec![Value::Int(1)], vec![]),
            Err(BindError::Missing("b".into()))
        );
        assert_eq!(
            sig.bind(vec![Value::Int(1); 4], vec![]),
            Err(BindError::TooManyPositional {
                expected: 3,
                given: 4
            })
        );
        assert_eq!(
            sig.bind(vec![Value::Int(1), Value::Int(2)], vec![("a".into(), Value::Int(3))]),
            Err(BindError::MultipleValues("a".into()))
        );
        assert_eq!(
            sig.bind(vec![], vec![("z".into(), Value::Int(3))]),
            Err(BindError::UnexpectedKeyword("z".into()))
        );
    }
}
