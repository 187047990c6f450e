//! `example` - native entities exposed to a dynamic host through a binding layer
//!
//! The crate carries its own binding runtime (registry, marshaling, overload
//! dispatch, reference-counted handles and a host value model) and the
//! `example` catalog written against it. With the `python` feature the same
//! catalog also builds as a CPython extension module.

pub mod bindings;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod ffi;
pub mod interop;
pub mod logging;
pub mod objects;

#[cfg(feature = "python")]
mod python;

// Re-export commonly used items
pub use bindings::{ClassBuilder, ClassOptions, EnumOptions, EnumValue, Module, NativeEnum, TypeObject};
pub use catalog::{init_module, module};
pub use config::Options;
pub use errors::{BindError, BindResult, ErrorKind, ExceptionKind};
pub use ffi::{Handle, Inherits, NativeClass, Owned};
pub use interop::{arg, cast, ArgLiteral, CallArgs, FromValue, IntoValue};
pub use objects::{BinaryOp, Value};
