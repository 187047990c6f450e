//! Host value model - what the host runtime holds and operates on
//!
//! Design: a closed enum over the host object categories. Instances of bound
//! classes are `Object` handles; functions and types are shared records from
//! the binding layer. Attribute lookup, calls and `repr` follow the host's
//! data-model rules closely enough to exercise every binding path.

use std::sync::Arc;

use crate::bindings::{EnumType, EnumValue, Member, Module, TypeObject};
use crate::errors::{AttributeOwner, BindError, BindResult, ErrorKind};
use crate::ffi::Handle;
use crate::interop::{CallArgs, CallFrame, Function, ObjectType};
use crate::logging::log_attribute_miss;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    Enum(EnumValue),
    /// Instance of a bound class
    Object(Handle),
    Function(Arc<Function>),
    /// Function bound to its receiver
    Method(Handle, Arc<Function>),
    Type(Arc<TypeObject>),
    EnumType(Arc<EnumType>),
    Module(Arc<Module>),
}

/// Binary operators supported between host values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
        }
    }

    fn apply(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::And => lhs & rhs,
            Self::Or => lhs | rhs,
            Self::Xor => lhs ^ rhs,
        }
    }
}

impl Value {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::None => ObjectType::None,
            Self::Bool(_) => ObjectType::Bool,
            Self::Int(_) => ObjectType::Int,
            Self::Str(_) => ObjectType::Str,
            Self::Enum(_) => ObjectType::Enum,
            Self::Object(_) => ObjectType::Instance,
            Self::Function(_) => ObjectType::Function,
            Self::Method(..) => ObjectType::Method,
            Self::Type(_) | Self::EnumType(_) => ObjectType::Type,
            Self::Module(_) => ObjectType::Module,
        }
    }

    /// `type(v).__name__`
    pub fn type_name(&self) -> String {
        match self {
            Self::Enum(v) => v.ty.name().to_string(),
            Self::Object(h) => h.host_type().name().to_string(),
            other => other.builtin_type_name(),
        }
    }

    /// Module-qualified type name, as used in error messages
    pub fn qualified_type_name(&self) -> String {
        match self {
            Self::Enum(v) => v.ty.qualified_name(),
            Self::Object(h) => h.host_type().qualified_name(),
            other => other.builtin_type_name(),
        }
    }

    fn builtin_type_name(&self) -> String {
        self.object_type().builtin_name().unwrap_or("object").to_string()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Self::Object(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Self::Enum(v) => Some(v),
            _ => None,
        }
    }

    /// `isinstance(v, ty)` for bound classes
    pub fn is_instance_of(&self, ty: &TypeObject) -> bool {
        match self {
            Self::Object(h) => h.host_type().is_subtype_of(ty),
            _ => false,
        }
    }

    /// `repr(v)`, running a bound `__repr__` when the class defines one
    pub fn repr(&self) -> BindResult<String> {
        Ok(match self {
            Self::None => "None".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Str(s) => quote(s),
            Self::Enum(v) => v.repr(),
            Self::Object(h) => match h.host_type().lookup("__repr__") {
                Some(Member::Method(repr)) => {
                    match repr.call(&CallFrame::method(h), &CallArgs::new())? {
                        Self::Str(s) => s,
                        other => other.repr()?,
                    }
                }
                _ => format!("<{} object at {:#x}>", h.host_type().qualified_name(), h.id()),
            },
            Self::Function(f) => format!("<built-in function {}>", f.name()),
            Self::Method(h, f) => format!(
                "<bound method {}.{} of {}>",
                h.host_type().name(),
                f.name(),
                Self::Object(h.clone()).repr()?
            ),
            Self::Type(ty) => format!("<class '{}'>", ty.qualified_name()),
            Self::EnumType(ty) => format!("<class '{}'>", ty.qualified_name()),
            Self::Module(m) => format!("<module '{}'>", m.name()),
        })
    }

    /// `str(v)`
    pub fn str(&self) -> BindResult<String> {
        match self {
            Self::Str(s) => Ok(s.clone()),
            Self::Enum(v) => Ok(v.str()),
            other => other.repr(),
        }
    }

    /// `dir(v)`: attribute names visible through `v`, sorted
    pub fn dir(&self) -> Vec<String> {
        let mut names: Vec<String> = match self {
            Self::Object(h) => {
                let mut names = h.dict_keys();
                names.extend(h.host_type().mro().flat_map(|ty| ty.member_names()));
                names
            }
            Self::Type(ty) => ty.mro().flat_map(|ty| ty.member_names()).collect(),
            Self::EnumType(ty) => ty.members().into_iter().map(|(name, _)| name).collect(),
            Self::Module(m) => m.dir(),
            _ => Vec::new(),
        };
        names.sort();
        names.dedup();
        names
    }

    /// `v.name`
    pub fn getattr(&self, name: &str) -> BindResult<Value> {
        let found = match self {
            Self::Object(h) => return instance_getattr(h, name),
            Self::Type(ty) => type_getattr(ty, name),
            Self::EnumType(ty) => match name {
                "__name__" => Some(Self::Str(ty.name().to_string())),
                "__doc__" => Some(ty.doc().map(|d| Self::Str(d.to_string())).unwrap_or(Self::None)),
                _ => ty
                    .member_value(name)
                    .map(|value| Self::Enum(EnumValue::new(ty.clone(), value))),
            },
            Self::Enum(v) => match name {
                "name" => Some(Self::Str(v.name())),
                "value" => Some(Self::Int(v.value())),
                "__class__" => Some(Self::EnumType(v.ty.clone())),
                _ => None,
            },
            Self::Module(m) => return m.getattr(name),
            Self::Function(f) | Self::Method(_, f) => match name {
                "__name__" => Some(Self::Str(f.name().to_string())),
                "__doc__" => Some(Self::Str(f.doc())),
                _ => None,
            },
            _ => None,
        };

        found.ok_or_else(|| {
            let owner = match self {
                Self::Type(ty) => AttributeOwner::Type(ty.qualified_name()),
                Self::EnumType(ty) => AttributeOwner::Type(ty.qualified_name()),
                other => AttributeOwner::Instance(other.qualified_type_name()),
            };
            log_attribute_miss(&self.qualified_type_name(), name);
            BindError::missing_attribute(owner, name)
        })
    }

    /// `v.name = value`
    pub fn setattr(&self, name: &str, value: impl Into<Value>) -> BindResult<()> {
        let value = value.into();
        match self {
            Self::Object(h) => {
                if let Some(Member::Property(property)) = h.host_type().lookup(name) {
                    return property.set(h, value);
                }
                if h.dict_set(name, value) {
                    return Ok(());
                }
                Err(BindError::missing_attribute(
                    AttributeOwner::Instance(h.host_type().qualified_name()),
                    name,
                ))
            }
            Self::Type(ty) => {
                ty.set_member(name, Member::Attr(value));
                Ok(())
            }
            Self::Module(m) => {
                m.setattr(name, value);
                Ok(())
            }
            other => Err(BindError::missing_attribute(
                AttributeOwner::Instance(other.qualified_type_name()),
                name,
            )),
        }
    }

    /// `v(*args, **kwargs)`
    pub fn call(&self, args: impl Into<CallArgs>) -> BindResult<Value> {
        let args = args.into();
        match self {
            Self::Function(f) => f.call(&CallFrame::function(), &args),
            Self::Method(h, f) => f.call(&CallFrame::method(h), &args),
            Self::Type(ty) => TypeObject::construct(ty, &args),
            Self::EnumType(ty) => construct_enum(ty, &args),
            other => Err(BindError::not_callable(other.type_name())),
        }
    }

    /// `v.name(*args, **kwargs)`
    pub fn call_method(&self, name: &str, args: impl Into<CallArgs>) -> BindResult<Value> {
        self.getattr(name)?.call(args)
    }

    /// `v == other`. Enum values compare equal to integers of the same value.
    pub fn host_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => Arc::ptr_eq(&a.ty, &b.ty) && a.value == b.value,
            (Self::Enum(e), n) | (n, Self::Enum(e)) => n.as_int() == Some(e.value),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            (Self::Method(ha, fa), Self::Method(hb, fb)) => ha.ptr_eq(hb) && Arc::ptr_eq(fa, fb),
            (Self::Type(a), Self::Type(b)) => Arc::ptr_eq(a, b),
            (Self::EnumType(a), Self::EnumType(b)) => Arc::ptr_eq(a, b),
            (Self::Module(a), Self::Module(b)) => Arc::ptr_eq(a, b),
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// `v <op> rhs`
    pub fn binary_op(&self, op: BinaryOp, rhs: &Value) -> BindResult<Value> {
        match (self, rhs) {
            (Self::Str(a), Self::Str(b)) if op == BinaryOp::Add => Ok(Self::Str(format!("{}{}", a, b))),
            (Self::Enum(_), _) | (_, Self::Enum(_)) => {
                let arithmetic = [self, rhs]
                    .iter()
                    .filter_map(|v| v.as_enum())
                    .all(|v| v.ty.is_arithmetic());
                match (arithmetic, enum_or_int(self), enum_or_int(rhs)) {
                    (true, Some(a), Some(b)) => Ok(Self::Int(op.apply(a, b))),
                    _ => Err(self.unsupported(op, rhs)),
                }
            }
            _ => match (self.as_int(), rhs.as_int()) {
                (Some(a), Some(b)) => Ok(Self::Int(op.apply(a, b))),
                _ => Err(self.unsupported(op, rhs)),
            },
        }
    }

    fn unsupported(&self, op: BinaryOp, rhs: &Value) -> BindError {
        BindError::new(ErrorKind::UnsupportedOperand {
            op: op.symbol().to_string(),
            lhs: self.type_name(),
            rhs: rhs.type_name(),
        })
    }
}

fn enum_or_int(value: &Value) -> Option<i64> {
    match value {
        Value::Enum(v) => Some(v.value),
        other => other.as_int(),
    }
}

/// Data descriptors, then the instance dictionary, then class members
fn instance_getattr(h: &Handle, name: &str) -> BindResult<Value> {
    let ty = h.host_type();
    let member = ty.lookup(name);
    if let Some(Member::Property(property)) = &member {
        return property.get(h);
    }
    if let Some(value) = h.dict_get(name) {
        return Ok(value);
    }
    match member {
        Some(Member::Method(method)) => Ok(Value::Method(h.clone(), method)),
        Some(Member::Attr(value)) => Ok(value),
        _ if name == "__class__" => Ok(Value::Type(ty.clone())),
        _ => {
            log_attribute_miss(ty.name(), name);
            Err(BindError::missing_attribute(
                AttributeOwner::Instance(ty.qualified_name()),
                name,
            ))
        }
    }
}

fn type_getattr(ty: &Arc<TypeObject>, name: &str) -> Option<Value> {
    match name {
        "__name__" => return Some(Value::Str(ty.name().to_string())),
        "__module__" => return Some(Value::Str(ty.module().to_string())),
        "__doc__" => return Some(ty.doc().map(|d| Value::Str(d.to_string())).unwrap_or(Value::None)),
        "__base__" => return ty.base().map(|base| Value::Type(base.clone())),
        _ => {}
    }
    match ty.lookup(name)? {
        Member::Method(method) => Some(Value::Function(method)),
        Member::Property(property) => Some(Value::Function(property.getter().clone())),
        Member::Attr(value) => Some(value),
    }
}

/// `Kind(1)`: any integer is accepted, unnamed values render as `???`
fn construct_enum(ty: &Arc<EnumType>, args: &CallArgs) -> BindResult<Value> {
    let value = match (args.positional.as_slice(), args.keywords.as_slice()) {
        ([v], []) => v.as_int(),
        ([], [(name, v)]) if name == "value" => v.as_int(),
        _ => None,
    };
    match value {
        Some(value) => Ok(Value::Enum(EnumValue::new(ty.clone(), value))),
        None => {
            let shown: Vec<String> = args
                .positional
                .iter()
                .map(|v| v.repr().unwrap_or_else(|_| v.qualified_type_name()))
                .collect();
            Err(BindError::new(ErrorKind::IncompatibleArguments {
                function: "__init__".to_string(),
                constructor: true,
                signatures: vec![format!("(self: {}, value: int) -> None", ty.qualified_name())],
                invoked_with: shown.join(", "),
            }))
        }
    }
}

/// Host `repr` of text: single quotes unless the text contains them
fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.host_eq(other)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object(h) => write!(f, "{:?}", h),
            other => match other.repr() {
                Ok(repr) => f.write_str(&repr),
                Err(_) => write!(f, "<{}>", other.qualified_type_name()),
            },
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Self::Object(h)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Self::Enum(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_builtins() {
        assert_eq!(Value::None.repr().unwrap(), "None");
        assert_eq!(Value::Bool(true).repr().unwrap(), "True");
        assert_eq!(Value::Int(-3).repr().unwrap(), "-3");
        assert_eq!(Value::from("World").repr().unwrap(), "'World'");
    }

    #[test]
    fn test_repr_quotes() {
        assert_eq!(Value::from("it's").repr().unwrap(), "\"it's\"");
        assert_eq!(Value::from("a\\b").repr().unwrap(), "'a\\\\b'");
        assert_eq!(Value::from("'\"").repr().unwrap(), "'\\'\"'");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::from("x").type_name(), "str");
        assert_eq!(Value::None.qualified_type_name(), "NoneType");
        assert_eq!(Value::Bool(false).object_type(), ObjectType::Bool);
    }

    #[test]
    fn test_host_eq() {
        assert_eq!(Value::Int(1), Value::Bool(true));
        assert_eq!(Value::from("a"), Value::from("a"));
        assert_ne!(Value::from("1"), Value::Int(1));
        assert_ne!(Value::None, Value::Int(0));
    }

    #[test]
    fn test_int_arithmetic() {
        let sum = Value::Int(40).binary_op(BinaryOp::Add, &Value::Int(2)).unwrap();
        assert_eq!(sum.as_int(), Some(42));
        let xor = Value::Int(6).binary_op(BinaryOp::Xor, &Value::Int(3)).unwrap();
        assert_eq!(xor.as_int(), Some(5));
        let concat = Value::from("ab").binary_op(BinaryOp::Add, &Value::from("c")).unwrap();
        assert_eq!(concat.as_str(), Some("abc"));
    }

    #[test]
    fn test_unsupported_operand() {
        let err = Value::from("a").binary_op(BinaryOp::Sub, &Value::Int(1)).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(
            err.to_string(),
            "TypeError: unsupported operand type(s) for -: 'str' and 'int'"
        );
    }

    #[test]
    fn test_builtins_not_callable() {
        let err = Value::Int(3).call(()).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: 'int' object is not callable");
    }

    #[test]
    fn test_builtin_attribute_miss() {
        let err = Value::Int(3).getattr("bark").unwrap_err();
        assert!(err.is_attribute_error());
        assert_eq!(
            err.to_string(),
            "AttributeError: 'int' object has no attribute 'bark'"
        );
    }
}
