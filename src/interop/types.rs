//! Type descriptors shared by marshalling and signature rendering.

use std::any::TypeId;

use super::registry::registry;

/// Host-side object category, used for dispatch and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectType {
    None = 0,
    Bool = 1,
    Int = 2,
    Str = 3,
    Enum = 4,
    Instance = 5,
    Function = 6,
    Method = 7,
    Type = 8,
    Module = 9,
}

impl ObjectType {
    /// Host name of the builtin type; `None` for user-registered types
    pub const fn builtin_name(self) -> Option<&'static str> {
        match self {
            Self::None => Some("NoneType"),
            Self::Bool => Some("bool"),
            Self::Int => Some("int"),
            Self::Str => Some("str"),
            Self::Function => Some("builtin_function_or_method"),
            Self::Method => Some("method"),
            Self::Type => Some("type"),
            Self::Module => Some("module"),
            Self::Enum | Self::Instance => None,
        }
    }
}

/// Type annotation of a parameter or return value, as shown in signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    None,
    Bool,
    Int,
    Str,
    Object,
    /// A bound native class or enum, named by its registration
    Native { id: TypeId, rust_name: &'static str },
}

impl TypeHint {
    pub fn native<T: 'static>() -> Self {
        Self::Native {
            id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
        }
    }

    /// Render the hint the way the host shows it in docstrings.
    ///
    /// Native types render by their qualified host name once registered,
    /// and by their Rust path before that.
    pub fn render(self) -> String {
        match self {
            Self::None => "None".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Int => "int".to_string(),
            Self::Str => "str".to_string(),
            Self::Object => "object".to_string(),
            Self::Native { id, rust_name } => {
                let registry = registry();
                if let Some(class) = registry.class(id) {
                    class.qualified_name()
                } else if let Some(enum_type) = registry.enum_type(id) {
                    enum_type.qualified_name()
                } else {
                    rust_name.to_string()
                }
            }
        }
    }
}
