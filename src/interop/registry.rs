//! Process-wide table of bound native types, keyed by `TypeId`.
//!
//! Every class and enum registered by any module lands here, so a native
//! value crossing the boundary can always find its host type.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::bindings::{BaseLink, EnumType, TypeObject};
use crate::errors::{BindError, BindResult, ErrorKind};
use crate::ffi::{Handle, Upcast, UpcastMut};
use crate::logging::log_type_recovery;
use crate::objects::Value;

static REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// Global registry shared by all modules in the process
pub fn registry() -> &'static TypeRegistry {
    &REGISTRY
}

pub struct TypeRegistry {
    classes: DashMap<TypeId, Arc<TypeObject>>,
    enums: DashMap<TypeId, Arc<EnumType>>,
}

impl TypeRegistry {
    fn new() -> Self {
        Self {
            classes: DashMap::new(),
            enums: DashMap::new(),
        }
    }

    pub(crate) fn register_class(&self, ty: Arc<TypeObject>) -> BindResult<()> {
        match self.classes.entry(ty.native_type_id()) {
            Entry::Occupied(existing) => Err(BindError::new(ErrorKind::DuplicateRegistration {
                name: existing.get().name().to_string(),
            })),
            Entry::Vacant(slot) => {
                slot.insert(ty);
                Ok(())
            }
        }
    }

    pub(crate) fn register_enum(&self, ty: Arc<EnumType>) -> BindResult<()> {
        match self.enums.entry(ty.native_type_id()) {
            Entry::Occupied(existing) => Err(BindError::new(ErrorKind::DuplicateRegistration {
                name: existing.get().name().to_string(),
            })),
            Entry::Vacant(slot) => {
                slot.insert(ty);
                Ok(())
            }
        }
    }

    pub fn class(&self, id: TypeId) -> Option<Arc<TypeObject>> {
        self.classes.get(&id).map(|entry| entry.value().clone())
    }

    pub fn enum_type(&self, id: TypeId) -> Option<Arc<EnumType>> {
        self.enums.get(&id).map(|entry| entry.value().clone())
    }

    pub fn is_registered(&self, id: TypeId) -> bool {
        self.classes.contains_key(&id) || self.enums.contains_key(&id)
    }

    /// Hand a native object over to the host.
    ///
    /// `declared` is the static type the native code returned it as. For a
    /// polymorphic declared type the concrete type of the object decides the
    /// host type; otherwise the host only ever sees the declared type.
    pub(crate) fn cast_owned(
        &self,
        native: Box<dyn Any + Send + Sync>,
        upcast: Option<(Upcast, UpcastMut)>,
        declared: TypeId,
        declared_name: &'static str,
        polymorphic: bool,
    ) -> BindResult<Value> {
        let declared_ty = self.class(declared).ok_or_else(|| {
            BindError::new(ErrorKind::UnregisteredType {
                native: declared_name.to_string(),
            })
        })?;
        let concrete_ty = self.class((*native).type_id());

        // the payload stays viewable as the declared type even when its own
        // class was never bound
        let declared_link = upcast.map(|(upcast, upcast_mut)| BaseLink {
            ty: declared_ty.clone(),
            upcast,
            upcast_mut,
        });

        let host_ty = match (&concrete_ty, polymorphic) {
            (Some(concrete), true) => {
                if !Arc::ptr_eq(concrete, &declared_ty) {
                    log_type_recovery(declared_ty.name(), concrete.name());
                }
                concrete.clone()
            }
            _ => declared_ty,
        };

        Ok(Value::Object(Handle::new(host_ty, concrete_ty, declared_link, native)))
    }
}
