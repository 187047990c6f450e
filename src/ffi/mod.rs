//! Native objects across the boundary
//!
//! Design:
//! 1. `NativeClass` marks a Rust type as bindable and says whether it is
//!    polymorphic (its concrete type can be probed at runtime)
//! 2. `Inherits` links a derived native type to its base
//! 3. `Owned` carries exclusive ownership of a native object to the host
//! 4. `Handle` is the host's reference-counted reference to an instance

mod holder;
mod object;

pub use holder::Owned;
pub use object::Handle;

use std::any::Any;

/// A Rust type that can be bound as a host class.
///
/// `POLYMORPHIC` plays the role of a virtual destructor: when set on a base
/// type, values returned as that base are reported to the host under their
/// most-derived registered type.
pub trait NativeClass: Any + Send + Sync {
    const POLYMORPHIC: bool = false;
}

/// Static inheritance between two native types
pub trait Inherits<B: NativeClass>: NativeClass {
    fn base(&self) -> &B;

    fn base_mut(&mut self) -> &mut B;
}

pub(crate) type Upcast = fn(&dyn Any) -> Option<&dyn Any>;
pub(crate) type UpcastMut = fn(&mut dyn Any) -> Option<&mut dyn Any>;

pub(crate) fn upcast_ref<D, B>(native: &dyn Any) -> Option<&dyn Any>
where
    D: Inherits<B>,
    B: NativeClass,
{
    native.downcast_ref::<D>().map(|d| d.base() as &dyn Any)
}

pub(crate) fn upcast_mut<D, B>(native: &mut dyn Any) -> Option<&mut dyn Any>
where
    D: Inherits<B>,
    B: NativeClass,
{
    native.downcast_mut::<D>().map(|d| d.base_mut() as &mut dyn Any)
}
