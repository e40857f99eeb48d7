//! Annotation (schema) language

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::checker::{AllOf, AnyOf, CheckAnnotation};
use crate::error::RaisedError;
use crate::value::{Value, ValueType};

type PredicateFn = dyn Fn(&[&Value]) -> Result<Value, RaisedError> + Send + Sync;

fn shared<F>(f: F) -> Arc<PredicateFn>
where
    F: Fn(&[&Value]) -> Result<Value, RaisedError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A named function used as an annotation
///
/// Only unary predicates are valid annotations; the declared arity is kept
/// so that a predicate with the wrong number of parameters is reported as a
/// malformed annotation rather than a failing value.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    arity: usize,
    func: Arc<PredicateFn>,
}

impl Predicate {
    /// Infallible unary predicate
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity: 1,
            func: shared(move |args| Ok(Value::Bool(f(args[0])))),
        }
    }

    /// Unary predicate that may fail; errors are reported with their type name
    pub fn try_new<F, E>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, E> + Send + Sync + 'static,
        E: std::error::Error,
    {
        Self {
            name: name.into(),
            arity: 1,
            func: shared(move |args| {
                f(args[0])
                    .map(Value::Bool)
                    .map_err(|e| RaisedError::from_error(&e))
            }),
        }
    }

    /// Predicate declaring `arity` parameters, returning any value
    pub fn with_arity<F>(name: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(&[&Value]) -> Result<Value, RaisedError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            func: shared(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Invoke with a single argument; panics are reported as raised errors
    pub(crate) fn call(&self, value: &Value) -> Result<Value, RaisedError> {
        let func = &self.func;
        panic::catch_unwind(AssertUnwindSafe(|| func(&[value])))
            .unwrap_or_else(|payload| Err(RaisedError::new("panic", panic_message(payload.as_ref()))))
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<predicate {}>", self.name)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// An immutable description of an expected value shape
///
/// Literal variants (`List`, `Tuple`, `Dict`, `Set`, `FrozenSet`) hold their
/// element annotations as written, so malformed literals are representable
/// and rejected when checked.
#[derive(Clone)]
pub enum Schema {
    /// Matches everything
    Any,
    /// `isinstance` check
    Type(ValueType),
    /// One element: every item; several: fixed-length, position by position
    List(Vec<Schema>),
    /// Same rules as `List`, for tuples
    Tuple(Vec<Schema>),
    /// Exactly one `(key, value)` pair
    Dict(Vec<(Schema, Schema)>),
    /// Exactly one member annotation
    Set(Vec<Schema>),
    /// Exactly one member annotation
    FrozenSet(Vec<Schema>),
    Predicate(Predicate),
    /// Text evaluated against the bound arguments
    Expression(String),
    /// Any type implementing the custom-checker protocol
    Custom(Arc<dyn CheckAnnotation>),
}

impl Schema {
    /// `[item]`
    pub fn list_of(item: impl Into<Schema>) -> Self {
        Schema::List(vec![item.into()])
    }

    /// `(item,)`
    pub fn tuple_of(item: impl Into<Schema>) -> Self {
        Schema::Tuple(vec![item.into()])
    }

    /// `{key: value}`
    pub fn dict_of(key: impl Into<Schema>, value: impl Into<Schema>) -> Self {
        Schema::Dict(vec![(key.into(), value.into())])
    }

    /// `{item}`
    pub fn set_of(item: impl Into<Schema>) -> Self {
        Schema::Set(vec![item.into()])
    }

    /// `frozenset({item})`
    pub fn frozenset_of(item: impl Into<Schema>) -> Self {
        Schema::FrozenSet(vec![item.into()])
    }

    pub fn predicate<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Schema::Predicate(Predicate::new(name, f))
    }

    pub fn expression(text: impl Into<String>) -> Self {
        Schema::Expression(text.into())
    }

    pub fn custom(checker: impl CheckAnnotation + 'static) -> Self {
        Schema::Custom(Arc::new(checker))
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Schema]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Any => f.write_str("None"),
            Schema::Type(t) => write!(f, "{}", t),
            Schema::List(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Schema::Tuple(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Schema::Dict(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Schema::Set(items) => {
                f.write_str("{")?;
                write_list(f, items)?;
                f.write_str("}")
            }
            Schema::FrozenSet(items) => {
                f.write_str("frozenset({")?;
                write_list(f, items)?;
                f.write_str("})")
            }
            Schema::Predicate(p) => write!(f, "{}", p),
            Schema::Expression(text) => write!(f, "{}", Value::Str(text.clone())),
            Schema::Custom(checker) => write!(f, "{}", checker),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema({})", self)
    }
}

impl From<ValueType> for Schema {
    fn from(t: ValueType) -> Self {
        Schema::Type(t)
    }
}

impl From<Predicate> for Schema {
    fn from(p: Predicate) -> Self {
        Schema::Predicate(p)
    }
}

impl From<AllOf> for Schema {
    fn from(all: AllOf) -> Self {
        Schema::custom(all)
    }
}

impl From<AnyOf> for Schema {
    fn from(any: AnyOf) -> Self {
        Schema::custom(any)
    }
}

impl<T: Into<Schema>> From<Option<T>> for Schema {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Schema::Any)
    }
}
