//! Interoperability - marshal values and dispatch calls across the boundary
//!
//! Design: type-erased overload sets with automatic argument marshaling
//!
//! Architecture:
//! - `types.rs` - host object categories and signature type hints
//! - `marshal.rs` - host ↔ native value conversions, call arguments
//! - `call.rs` - argument annotations, signatures, overload dispatch
//! - `registry.rs` - process-wide table of bound native types

mod types;
mod marshal;
mod call;
mod registry;

pub use types::{ObjectType, TypeHint};
pub use marshal::{cast, CallArgs, FromValue, IntoValue};
pub use call::{
    arg, Arg, ArgLiteral, CallFrame, Extra, Extras, Function, FunctionExtras, FunctionKind, Mut,
    NativeFn, NativeMethod, Ref, Signature,
};
pub use registry::{registry, TypeRegistry};

pub(crate) use call::{Invoker, Overload};

#[cfg(test)]
mod tests;
