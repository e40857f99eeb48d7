//! Error types for annotation checking

use std::fmt;

use thiserror::Error;

use crate::trail::Trail;
use crate::value::Value;

/// Result type for check operations
pub type Result<T> = std::result::Result<T, CheckError>;

/// Errors raised while checking a value against an annotation
#[derive(Error, Debug, Clone)]
pub enum CheckError {
    /// The value does not satisfy the annotation
    #[error(transparent)]
    Failed(#[from] ValidationFailure),

    /// The annotation itself is malformed
    #[error(transparent)]
    Inconsistent(#[from] SchemaDefinitionError),
}

impl CheckError {
    pub fn is_failure(&self) -> bool {
        matches!(self, CheckError::Failed(_))
    }

    pub fn as_failure(&self) -> Option<&ValidationFailure> {
        match self {
            CheckError::Failed(f) => Some(f),
            CheckError::Inconsistent(_) => None,
        }
    }

    pub fn as_inconsistency(&self) -> Option<&SchemaDefinitionError> {
        match self {
            CheckError::Inconsistent(e) => Some(e),
            CheckError::Failed(_) => None,
        }
    }
}

/// An error raised by foreign code (predicate, expression, custom checker)
///
/// Only the type name and message survive; the original error type never
/// leaks to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RaisedError {
    pub kind: String,
    pub message: String,
}

impl RaisedError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Capture an error's short type name and message
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        Self::new(short_type_name::<E>(), error.to_string())
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Keep generic arguments intact, strip the module path in front of them
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Why a value failed its annotation
#[derive(Debug, Clone)]
pub enum FailureReason {
    /// Runtime type is not the expected one
    WrongType { actual: String, expected: String },

    /// Fixed-length sequence annotation with a different element count
    ElementCount {
        annotation: String,
        expected: usize,
        actual: usize,
    },

    /// Predicate or expression returned something other than `true`
    Rejected { predicate: String },

    /// Predicate or expression raised an error
    Raised {
        predicate: String,
        error: RaisedError,
    },

    /// A custom checker returned an error; `cause` keeps a nested failure
    CheckerRaised {
        checker: String,
        error: RaisedError,
        cause: Option<Box<ValidationFailure>>,
    },

    /// Every alternative of an `AnyOf` failed
    NoneMatched { combinator: String, tried: usize },

    /// Failure reported by a custom checker in its own words
    Custom(String),
}

/// A value did not satisfy its annotation
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub param: String,
    pub value: Value,
    pub reason: FailureReason,
    pub trail: Trail,
}

impl ValidationFailure {
    pub fn new(
        param: impl Into<String>,
        value: Value,
        reason: FailureReason,
        trail: Trail,
    ) -> Self {
        Self {
            param: param.into(),
            value,
            reason,
            trail,
        }
    }

    /// The failure that started a chain of wrapped checker failures
    pub fn innermost(&self) -> &ValidationFailure {
        let mut current = self;
        while let FailureReason::CheckerRaised {
            cause: Some(cause), ..
        } = &current.reason
        {
            current = cause;
        }
        current
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let param = &self.param;
        let value = &self.value;
        match &self.reason {
            FailureReason::WrongType { actual, expected } => write!(
                f,
                "'{param}' failed annotation check(wrong type): value = {value}\n  was type {actual} ...should be type {expected}"
            )?,
            FailureReason::ElementCount {
                annotation,
                expected,
                actual,
            } => write!(
                f,
                "'{param}' failed annotation check(wrong number of elements): value = {value}\n  annotation had {expected} elements {annotation} but value had {actual}"
            )?,
            FailureReason::Rejected { predicate } => write!(
                f,
                "'{param}' failed annotation check: value = {value}\n  predicate = {predicate}"
            )?,
            FailureReason::Raised { predicate, error } => write!(
                f,
                "'{param}' annotation predicate({predicate}) raised exception: value = {value}\n  exception = {error}"
            )?,
            FailureReason::CheckerRaised { checker, error, .. } => write!(
                f,
                "'{param}' annotation protocol({checker}) raised exception: value = {value}\n  exception = {error}"
            )?,
            FailureReason::NoneMatched { combinator, tried } => write!(
                f,
                "'{param}' failed annotation check(AnyOf): value = {value}\n  tried {combinator} ({tried} alternatives failed)"
            )?,
            FailureReason::Custom(message) => write!(
                f,
                "'{param}' failed annotation check: value = {value}\n  {message}"
            )?,
        }
        f.write_str(&self.trail.suffix())
    }
}

impl std::error::Error for ValidationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.reason {
            FailureReason::CheckerRaised {
                cause: Some(cause), ..
            } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// What is wrong with a malformed annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// Mapping or set literal without exactly one element
    Cardinality { kind: &'static str, found: usize },
    /// Sequence literal with no element annotation
    EmptySequence { kind: &'static str },
    /// Predicate not declaring exactly one parameter
    PredicateArity { arity: usize },
    /// Textual annotation but no evaluator installed
    NoEvaluator,
}

/// The annotation is malformed, independent of the checked value
#[derive(Debug, Clone)]
pub struct SchemaDefinitionError {
    pub param: String,
    pub annotation: String,
    pub kind: Inconsistency,
    pub trail: Trail,
}

impl SchemaDefinitionError {
    pub fn new(
        param: impl Into<String>,
        annotation: impl Into<String>,
        kind: Inconsistency,
        trail: Trail,
    ) -> Self {
        Self {
            param: param.into(),
            annotation: annotation.into(),
            kind,
            trail,
        }
    }
}

impl fmt::Display for SchemaDefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let param = &self.param;
        let annotation = &self.annotation;
        match &self.kind {
            Inconsistency::Cardinality { kind, found } => write!(
                f,
                "'{param}' annotation inconsistency: {kind} should have 1 value but had {found}\n  annotation = {annotation}"
            )?,
            Inconsistency::EmptySequence { kind } => write!(
                f,
                "'{param}' annotation inconsistency: {kind} should have at least 1 value but had 0\n  annotation = {annotation}"
            )?,
            Inconsistency::PredicateArity { arity } => write!(
                f,
                "'{param}' annotation inconsistency: predicate should have 1 parameter but had {arity}\n  predicate = {annotation}"
            )?,
            Inconsistency::NoEvaluator => write!(
                f,
                "'{param}' annotation inconsistency: no expression evaluator installed\n  annotation = {annotation}"
            )?,
        }
        f.write_str(&self.trail.suffix())
    }
}

impl std::error::Error for SchemaDefinitionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_raised_error_type_name() {
        let raised = RaisedError::from_error(&Boom);
        assert_eq!(raised.kind, "Boom");
        assert_eq!(raised.to_string(), "Boom: boom");
    }

    #[test]
    fn test_failure_message_carries_trail() {
        let failure = ValidationFailure::new(
            "x",
            Value::from("a"),
            FailureReason::WrongType {
                actual: "str".into(),
                expected: "int".into(),
            },
            Trail::new().push("list[0] check: int"),
        );
        assert_eq!(
            failure.to_string(),
            "'x' failed annotation check(wrong type): value = 'a'\n  was type str ...should be type int\nlist[0] check: int"
        );
    }

    #[test]
    fn test_innermost() {
        let inner = ValidationFailure::new(
            "x",
            Value::Int(-5),
            FailureReason::Rejected {
                predicate: "<predicate positive>".into(),
            },
            Trail::new(),
        );
        let outer = ValidationFailure::new(
            "x",
            Value::Int(-5),
            FailureReason::CheckerRaised {
                checker: "AllOf(<predicate positive>)".into(),
                error: RaisedError::new("ValidationFailure", inner.to_string()),
                cause: Some(Box::new(inner)),
            },
            Trail::new(),
        );
        assert!(matches!(
            outer.innermost().reason,
            FailureReason::Rejected { .. }
        ));
    }
}
