//! Owning holder - exclusive ownership handed from native code to the host

use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;

use super::{upcast_mut, upcast_ref, Inherits, NativeClass, Upcast, UpcastMut};
use crate::errors::BindResult;
use crate::interop::{registry, IntoValue, TypeHint};
use crate::objects::Value;

/// A native object returned to the host as type `T`.
///
/// The payload may be a subclass of `T`. Whether the host sees `T` or the
/// subclass depends on `T::POLYMORPHIC`.
pub struct Owned<T: NativeClass> {
    native: Box<dyn Any + Send + Sync>,
    /// Upcast from the payload to `T` when the payload is a subclass
    declared: Option<(Upcast, UpcastMut)>,
    _declared: PhantomData<fn() -> T>,
}

impl<T: NativeClass> Owned<T> {
    pub fn new(value: T) -> Self {
        Self {
            native: Box::new(value),
            declared: None,
            _declared: PhantomData,
        }
    }

    /// Hold a derived object behind its base type
    pub fn from_derived<D: Inherits<T>>(value: D) -> Self {
        Self {
            native: Box::new(value),
            declared: Some((upcast_ref::<D, T> as Upcast, upcast_mut::<D, T> as UpcastMut)),
            _declared: PhantomData,
        }
    }

    /// `TypeId` of the object actually held
    pub fn concrete_type_id(&self) -> TypeId {
        (*self.native).type_id()
    }
}

impl<T: NativeClass> IntoValue for Owned<T> {
    fn into_value(self) -> BindResult<Value> {
        registry().cast_owned(
            self.native,
            self.declared,
            TypeId::of::<T>(),
            type_name::<T>(),
            T::POLYMORPHIC,
        )
    }

    fn type_hint() -> TypeHint {
        TypeHint::native::<T>()
    }
}

impl<T: NativeClass> std::fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owned").field("declared", &type_name::<T>()).finish()
    }
}
