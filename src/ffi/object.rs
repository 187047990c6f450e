//! Object lifecycle - host handles to native instances
//!
//! A handle is a reference-counted pointer to an instance. The instance owns
//! the native payload; dropping the last handle drops the payload exactly
//! once.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bindings::{BaseLink, TypeObject};
use crate::errors::{BindError, BindResult, ErrorKind};
use crate::logging::log_instance_release;
use crate::objects::Value;

struct Instance {
    /// Type the host sees
    ty: Arc<TypeObject>,
    /// Registered class of the payload itself, used to walk upcasts
    native_ty: Option<Arc<TypeObject>>,
    /// View of the payload as the type it was returned as
    declared: Option<BaseLink>,
    native: RwLock<Box<dyn Any + Send + Sync>>,
    dict: Option<RwLock<HashMap<String, Value>>>,
}

impl Drop for Instance {
    fn drop(&mut self) {
        log_instance_release(self.ty.name());
    }
}

#[derive(Clone)]
pub struct Handle(Arc<Instance>);

impl Handle {
    pub(crate) fn new(
        ty: Arc<TypeObject>,
        native_ty: Option<Arc<TypeObject>>,
        declared: Option<BaseLink>,
        native: Box<dyn Any + Send + Sync>,
    ) -> Self {
        let dict = ty.has_dynamic_attr().then(|| RwLock::new(HashMap::new()));
        Self(Arc::new(Instance {
            ty,
            native_ty,
            declared,
            native: RwLock::new(native),
            dict,
        }))
    }

    /// Type the host sees for this instance
    pub fn host_type(&self) -> &Arc<TypeObject> {
        &self.0.ty
    }

    /// Number of live host references
    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address used as the instance identity
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Borrow the payload as `T`, upcasting through registered bases
    pub fn with_ref<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> BindResult<R> {
        let guard = self.0.native.read();
        let native: &dyn Any = &**guard;
        let target = resolve_ref::<T>(native, self.0.native_ty.as_deref()).or_else(|| {
            let link = self.0.declared.as_ref()?;
            resolve_ref::<T>((link.upcast)(native)?, Some(&*link.ty))
        });
        match target {
            Some(target) => Ok(f(target)),
            None => Err(self.self_mismatch::<T>()),
        }
    }

    /// Mutably borrow the payload as `T`, upcasting through registered bases
    pub fn with_mut<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> BindResult<R> {
        let mut guard = self.0.native.write();
        let native: &mut dyn Any = &mut **guard;
        let target = if resolve_ref::<T>(&*native, self.0.native_ty.as_deref()).is_some() {
            resolve_mut::<T>(native, self.0.native_ty.as_deref())
        } else {
            self.0
                .declared
                .as_ref()
                .and_then(|link| resolve_mut::<T>((link.upcast_mut)(native)?, Some(&*link.ty)))
        };
        match target {
            Some(target) => Ok(f(target)),
            None => Err(self.self_mismatch::<T>()),
        }
    }

    /// Whether the payload can be viewed as `T`
    pub fn holds<T: 'static>(&self) -> bool {
        self.with_ref(|_: &T| ()).is_ok()
    }

    fn self_mismatch<T: 'static>(&self) -> BindError {
        BindError::new(ErrorKind::SelfMismatch {
            expected: type_name::<T>().to_string(),
            found: self.0.ty.qualified_name(),
        })
    }

    pub(crate) fn dict_get(&self, name: &str) -> Option<Value> {
        self.0.dict.as_ref()?.read().get(name).cloned()
    }

    /// Store into the per-instance attribute table; false if there is none
    pub(crate) fn dict_set(&self, name: &str, value: Value) -> bool {
        match &self.0.dict {
            Some(dict) => {
                dict.write().insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Names stored in the per-instance attribute table, sorted
    pub(crate) fn dict_keys(&self) -> Vec<String> {
        match &self.0.dict {
            Some(dict) => {
                let mut keys: Vec<String> = dict.read().keys().cloned().collect();
                keys.sort();
                keys
            }
            None => Vec::new(),
        }
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} object at {:#x}>", self.0.ty.qualified_name(), self.id())
    }
}

fn resolve_ref<'a, T: 'static>(native: &'a dyn Any, ty: Option<&TypeObject>) -> Option<&'a T> {
    if native.is::<T>() {
        return native.downcast_ref::<T>();
    }
    let link = ty?.base_link()?;
    let base = (link.upcast)(native)?;
    resolve_ref::<T>(base, Some(&*link.ty))
}

fn resolve_mut<'a, T: 'static>(native: &'a mut dyn Any, ty: Option<&TypeObject>) -> Option<&'a mut T> {
    if native.is::<T>() {
        return native.downcast_mut::<T>();
    }
    let link = ty?.base_link()?;
    let base = (link.upcast_mut)(native)?;
    resolve_mut::<T>(base, Some(&*link.ty))
}
