//! Declarative binding surface: modules, classes and enums.
//!
//! A module is populated by builder calls that mirror the usual binding
//! toolkit vocabulary (`def`, `class`, `def_init`, `def_property`,
//! `enum_` ...). Everything registered ends up as host values reachable
//! through attribute lookup.

mod class;
mod enums;
mod module;

pub(crate) use class::BaseLink;
pub use class::{ClassBuilder, ClassOptions, Member, Property, TypeObject};
pub use enums::{EnumBuilder, EnumOptions, EnumType, EnumValue, NativeEnum};
pub use module::Module;

use crate::objects::Value;

/// A namespace enum members can be exported into
pub(crate) trait Scope {
    fn export(&self, name: &str, value: Value);
}

impl Scope for TypeObject {
    fn export(&self, name: &str, value: Value) {
        self.set_member(name, Member::Attr(value));
    }
}
