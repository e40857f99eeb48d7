//! Familiar Annotations
//!
//! Schema-directed checking of runtime values: an annotation describes the
//! expected shape of a value and the validator reports, with a nested trail,
//! where a value departs from it.
//!
//! ## Features
//!
//! - **Shape Dispatch**: types, sequence/mapping/set literals, predicates,
//!   textual expressions and custom checkers
//! - **Combinators**: `AllOf` (first failure wins) and `AnyOf` (every
//!   alternative tried)
//! - **Diagnostic Trails**: persistent, append-only paths through nested
//!   annotations
//! - **Annotated Callables**: bind arguments, check parameters and results
//!
//! ## Annotation language
//!
//! ```text
//! int                    isinstance(value, int)
//! [int]                  list, every element int
//! (int, str)             tuple of exactly two elements
//! {str: [int]}           dict, every key str, every value a list of int
//! {int} / frozenset({int})
//! <predicate positive>   unary predicate returning true
//! 'x < y'                expression over the bound arguments
//! AllOf(...) / AnyOf(...)
//! ```

pub mod annotated;
pub mod checker;
pub mod config;
pub mod error;
pub mod expression;
pub mod schema;
pub mod trail;
pub mod validator;
pub mod value;

pub use annotated::{Annotated, BindError, BoundArguments, CallError, Param, Signature};
pub use checker::{AllOf, AnyOf, CheckAnnotation};
pub use config::AnnotationConfig;
pub use error::{
    CheckError, FailureReason, Inconsistency, RaisedError, Result, SchemaDefinitionError,
    ValidationFailure,
};
#[cfg(feature = "cel")]
pub use expression::CelEvaluator;
pub use expression::{ExpressionEvaluator, Namespace};
pub use schema::{Predicate, Schema};
pub use trail::Trail;
pub use validator::{check, CheckOptions, MappingTrail, Validator};
pub use value::{Value, ValueType};
