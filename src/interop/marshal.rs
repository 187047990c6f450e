//! Type marshaling - host values ↔ native Rust values
//!
//! Design: loading an argument never fails loudly. A value that does not fit
//! the native parameter yields `None`, which tells the dispatcher to move on
//! to the next overload.

use smallvec::SmallVec;

use super::types::TypeHint;
use crate::errors::BindResult;
use crate::objects::Value;

/// Host → native conversion for a parameter type
pub trait FromValue: Sized + 'static {
    fn from_value(value: &Value) -> Option<Self>;

    fn type_hint() -> TypeHint;
}

/// Native → host conversion for a return type
pub trait IntoValue {
    fn into_value(self) -> BindResult<Value>;

    fn type_hint() -> TypeHint
    where
        Self: Sized;
}

/// Convert a native value into a host value explicitly
pub fn cast<T: IntoValue>(value: T) -> BindResult<Value> {
    value.into_value()
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    fn type_hint() -> TypeHint {
        TypeHint::Int
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| i32::try_from(i).ok())
    }

    fn type_hint() -> TypeHint {
        TypeHint::Int
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn type_hint() -> TypeHint {
        TypeHint::Bool
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn type_hint() -> TypeHint {
        TypeHint::Str
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }

    fn type_hint() -> TypeHint {
        TypeHint::Object
    }
}

impl IntoValue for () {
    fn into_value(self) -> BindResult<Value> {
        Ok(Value::None)
    }

    fn type_hint() -> TypeHint {
        TypeHint::None
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> BindResult<Value> {
        Ok(Value::Int(self))
    }

    fn type_hint() -> TypeHint {
        TypeHint::Int
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> BindResult<Value> {
        Ok(Value::Int(i64::from(self)))
    }

    fn type_hint() -> TypeHint {
        TypeHint::Int
    }
}

impl IntoValue for bool {
    fn into_value(self) -> BindResult<Value> {
        Ok(Value::Bool(self))
    }

    fn type_hint() -> TypeHint {
        TypeHint::Bool
    }
}

impl IntoValue for String {
    fn into_value(self) -> BindResult<Value> {
        Ok(Value::Str(self))
    }

    fn type_hint() -> TypeHint {
        TypeHint::Str
    }
}

impl IntoValue for &'static str {
    fn into_value(self) -> BindResult<Value> {
        Ok(Value::Str(self.to_string()))
    }

    fn type_hint() -> TypeHint {
        TypeHint::Str
    }
}

impl IntoValue for Value {
    fn into_value(self) -> BindResult<Value> {
        Ok(self)
    }

    fn type_hint() -> TypeHint {
        TypeHint::Object
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> BindResult<Value> {
        match self {
            Some(v) => v.into_value(),
            None => Ok(Value::None),
        }
    }

    fn type_hint() -> TypeHint {
        T::type_hint()
    }
}

/// Arguments of a host-side call: positional values and keyword pairs
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: SmallVec<[Value; 4]>,
    pub keywords: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same call without its first positional argument
    pub(crate) fn split_first(&self) -> Option<(Value, Self)> {
        let (first, rest) = self.positional.split_first()?;
        Some((
            first.clone(),
            Self {
                positional: rest.iter().cloned().collect(),
                keywords: self.keywords.clone(),
            },
        ))
    }
}

impl From<Vec<Value>> for CallArgs {
    fn from(values: Vec<Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keywords: Vec::new(),
        }
    }
}

impl<const N: usize> From<[Value; N]> for CallArgs {
    fn from(values: [Value; N]) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keywords: Vec::new(),
        }
    }
}

impl From<()> for CallArgs {
    fn from(_: ()) -> Self {
        Self::default()
    }
}
