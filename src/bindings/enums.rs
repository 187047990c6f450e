//! Bound enumerations.

use std::any::{type_name, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Scope;
use crate::errors::{BindError, BindResult, ErrorKind};
use crate::interop::{registry, FromValue, IntoValue, TypeHint};
use crate::logging::log_registration;
use crate::objects::Value;

/// A fieldless Rust enum that can be bound as a host enumeration
pub trait NativeEnum: Copy + Send + Sync + 'static {
    fn discriminant(self) -> i64;

    fn from_discriminant(value: i64) -> Option<Self>;
}

#[derive(Debug, Clone, Default)]
pub struct EnumOptions {
    doc: Option<String>,
    arithmetic: bool,
}

impl EnumOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `+ - & | ^` on the integer values
    pub fn arithmetic(mut self) -> Self {
        self.arithmetic = true;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

pub struct EnumType {
    name: String,
    scope: String,
    doc: Option<String>,
    native: TypeId,
    arithmetic: bool,
    members: RwLock<Vec<(String, i64)>>,
}

impl EnumType {
    pub(crate) fn register<E: NativeEnum>(
        name: &str,
        scope: &str,
        options: EnumOptions,
    ) -> BindResult<Arc<Self>> {
        let ty = Arc::new(Self {
            name: name.to_string(),
            scope: scope.to_string(),
            doc: options.doc,
            native: TypeId::of::<E>(),
            arithmetic: options.arithmetic,
            members: RwLock::new(Vec::new()),
        });
        registry().register_enum(ty.clone())?;
        log_registration("enum", name);
        Ok(ty)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `example.Pet.Kind`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.scope, self.name)
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn native_type_id(&self) -> TypeId {
        self.native
    }

    pub fn is_arithmetic(&self) -> bool {
        self.arithmetic
    }

    /// Members in declaration order
    pub fn members(&self) -> Vec<(String, i64)> {
        self.members.read().clone()
    }

    pub fn member_name(&self, value: i64) -> Option<String> {
        self.members
            .read()
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.clone())
    }

    pub fn member_value(&self, name: &str) -> Option<i64> {
        self.members
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    fn add_member(&self, name: &str, value: i64) {
        self.members.write().push((name.to_string(), value));
    }
}

impl std::fmt::Debug for EnumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<class '{}'>", self.qualified_name())
    }
}

/// An enumeration value as the host holds it
#[derive(Clone)]
pub struct EnumValue {
    pub(crate) ty: Arc<EnumType>,
    pub(crate) value: i64,
}

impl EnumValue {
    pub fn new(ty: Arc<EnumType>, value: i64) -> Self {
        Self { ty, value }
    }

    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.ty
    }

    /// Member name, `???` for values outside the declared members
    pub fn name(&self) -> String {
        self.ty.member_name(self.value).unwrap_or_else(|| "???".to_string())
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    /// `<Kind.Dog: 0>`
    pub fn repr(&self) -> String {
        format!("<{}.{}: {}>", self.ty.name, self.name(), self.value)
    }

    /// `Kind.Dog`
    pub fn str(&self) -> String {
        format!("{}.{}", self.ty.name, self.name())
    }
}

impl std::fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.repr())
    }
}

impl<E: NativeEnum> FromValue for E {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Enum(v) if v.ty.native == TypeId::of::<E>() => E::from_discriminant(v.value),
            _ => None,
        }
    }

    fn type_hint() -> TypeHint {
        TypeHint::native::<E>()
    }
}

impl<E: NativeEnum> IntoValue for E {
    fn into_value(self) -> BindResult<Value> {
        let ty = registry().enum_type(TypeId::of::<E>()).ok_or_else(|| {
            BindError::new(ErrorKind::UnregisteredType {
                native: type_name::<E>().to_string(),
            })
        })?;
        Ok(Value::Enum(EnumValue::new(ty, self.discriminant())))
    }

    fn type_hint() -> TypeHint {
        TypeHint::native::<E>()
    }
}

/// Builder returned by `enum_`, mirroring `enum_<E>`
pub struct EnumBuilder<'a, E: NativeEnum> {
    ty: Arc<EnumType>,
    scope: &'a dyn Scope,
    _marker: PhantomData<fn() -> E>,
}

impl<'a, E: NativeEnum> EnumBuilder<'a, E> {
    pub(crate) fn new(ty: Arc<EnumType>, scope: &'a dyn Scope) -> Self {
        Self {
            ty,
            scope,
            _marker: PhantomData,
        }
    }

    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.ty
    }

    pub fn value(&self, name: &str, value: E) -> &Self {
        self.ty.add_member(name, value.discriminant());
        self
    }

    /// Copy every member into the enclosing scope
    pub fn export_values(&self) -> &Self {
        for (name, value) in self.ty.members() {
            self.scope
                .export(&name, Value::Enum(EnumValue::new(self.ty.clone(), value)));
        }
        self
    }
}
