//! Custom-checker protocol and the `AllOf` / `AnyOf` combinators
//!
//! Any type implementing [`CheckAnnotation`] can be used as an annotation
//! through [`Schema::Custom`]. The validator hands the checker a live
//! [`Validator`] so it can check its own embedded annotations.
//!
//! ```text
//! AllOf(int,<predicate positive>)    every sub-annotation, first failure wins
//! AnyOf(int,str)                     at least one sub-annotation
//! ```
//!
//! Errors returned by a checker are wrapped by the validator into a
//! `CheckerRaised` failure; schema-definition errors pass through untouched.

use std::fmt;

use tracing::debug;

use crate::error::{CheckError, FailureReason, ValidationFailure};
use crate::schema::Schema;
use crate::trail::Trail;
use crate::validator::Validator;
use crate::value::Value;

/// Capability that plugs a new annotation kind into the validator
pub trait CheckAnnotation: fmt::Display + Send + Sync {
    /// Check `value`, recursing through `validator` for nested annotations
    ///
    /// The validator reference must not outlive the call.
    fn check_annotation(
        &self,
        validator: &Validator<'_>,
        param: &str,
        value: &Value,
        trail: &Trail,
    ) -> anyhow::Result<()>;
}

fn write_schemas(f: &mut fmt::Formatter<'_>, name: &str, schemas: &[Schema]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, schema) in schemas.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", schema)?;
    }
    f.write_str(")")
}

/// Conjunction: every sub-annotation must hold
///
/// Sub-annotations are tried in order and the first failure propagates
/// immediately.
#[derive(Clone, Debug)]
pub struct AllOf {
    schemas: Vec<Schema>,
}

impl AllOf {
    pub fn new(schemas: impl IntoIterator<Item = Schema>) -> Self {
        Self {
            schemas: schemas.into_iter().collect(),
        }
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }
}

impl fmt::Display for AllOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_schemas(f, "AllOf", &self.schemas)
    }
}

impl CheckAnnotation for AllOf {
    fn check_annotation(
        &self,
        validator: &Validator<'_>,
        param: &str,
        value: &Value,
        trail: &Trail,
    ) -> anyhow::Result<()> {
        for schema in &self.schemas {
            let step = trail.push(format!("AllOf check: {} while trying: {}", schema, self));
            validator.check(param, schema, value, &step)?;
        }
        Ok(())
    }
}

/// Disjunction: at least one sub-annotation must hold
///
/// Every sub-annotation is tried, even after a success, and only value
/// failures are counted; a malformed sub-annotation aborts the check.
#[derive(Clone, Debug)]
pub struct AnyOf {
    schemas: Vec<Schema>,
}

impl AnyOf {
    pub fn new(schemas: impl IntoIterator<Item = Schema>) -> Self {
        Self {
            schemas: schemas.into_iter().collect(),
        }
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }
}

impl fmt::Display for AnyOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_schemas(f, "AnyOf", &self.schemas)
    }
}

impl CheckAnnotation for AnyOf {
    fn check_annotation(
        &self,
        validator: &Validator<'_>,
        param: &str,
        value: &Value,
        trail: &Trail,
    ) -> anyhow::Result<()> {
        let mut failed = 0;
        for schema in &self.schemas {
            match validator.check(param, schema, value, trail) {
                Ok(()) => {}
                Err(CheckError::Failed(failure)) => {
                    debug!(param, alternative = %schema, %failure, "AnyOf alternative failed");
                    failed += 1;
                }
                Err(err @ CheckError::Inconsistent(_)) => return Err(err.into()),
            }
        }

        if failed == self.schemas.len() {
            let failure = ValidationFailure::new(
                param,
                value.clone(),
                FailureReason::NoneMatched {
                    combinator: self.to_string(),
                    tried: failed,
                },
                trail.clone(),
            );
            return Err(CheckError::from(failure).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    #[test]
    fn test_display() {
        let any = AnyOf::new([Schema::Type(ValueType::Int), Schema::Type(ValueType::Str)]);
        assert_eq!(any.to_string(), "AnyOf(int,str)");

        let all = AllOf::new([Schema::Type(ValueType::Int), Schema::predicate("positive", |_| true)]);
        assert_eq!(all.to_string(), "AllOf(int,<predicate positive>)");
    }

    #[test]
    fn test_empty_combinators() {
        let validator = Validator::new();
        let value = Value::Int(1);

        assert!(AllOf::new([])
            .check_annotation(&validator, "x", &value, &Trail::new())
            .is_ok());
        assert!(AnyOf::new([])
            .check_annotation(&validator, "x", &value, &Trail::new())
            .is_err());
    }
}
