//! Host-visible errors raised by the binding layer.
//!
//! Native code bound through this crate never fails; every error here is
//! produced by marshalling, attribute lookup, or module registration.

use std::fmt;

/// Exception category a [`BindError`] surfaces as on the host side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    TypeError,
    AttributeError,
    ImportError,
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeError => write!(f, "TypeError"),
            Self::AttributeError => write!(f, "AttributeError"),
            Self::ImportError => write!(f, "ImportError"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No overload accepted the call
    IncompatibleArguments {
        function: String,
        constructor: bool,
        signatures: Vec<String>,
        invoked_with: String,
    },
    NoConstructor { ty: String },
    NotCallable { ty: String },
    MissingAttribute { owner: AttributeOwner, attr: String },
    ReadOnlyAttribute { attr: String },
    UnregisteredType { native: String },
    UnsupportedOperand { op: String, lhs: String, rhs: String },
    SelfMismatch { expected: String, found: String },
    DuplicateRegistration { name: String },
    InvalidAnnotations { function: String, expected: usize, found: usize },
    DefaultOrdering { function: String, param: String },
    PropertyArity { property: String },
}

/// What an attribute lookup was performed on, for error wording
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOwner {
    Instance(String),
    Type(String),
    Module(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompatibleArguments { function, constructor, signatures, invoked_with } => {
                let what = if *constructor { "constructor" } else { "function" };
                writeln!(
                    f,
                    "{}(): incompatible {} arguments. The following argument types are supported:",
                    function, what
                )?;
                for (i, sig) in signatures.iter().enumerate() {
                    writeln!(f, "    {}. {}", i + 1, sig)?;
                }
                write!(f, "\nInvoked with: {}", invoked_with)
            }
            Self::NoConstructor { ty } => write!(f, "{}: No constructor defined!", ty),
            Self::NotCallable { ty } => write!(f, "'{}' object is not callable", ty),
            Self::MissingAttribute { owner, attr } => match owner {
                AttributeOwner::Instance(ty) => {
                    write!(f, "'{}' object has no attribute '{}'", ty, attr)
                }
                AttributeOwner::Type(ty) => {
                    write!(f, "type object '{}' has no attribute '{}'", ty, attr)
                }
                AttributeOwner::Module(name) => {
                    write!(f, "module '{}' has no attribute '{}'", name, attr)
                }
            },
            Self::ReadOnlyAttribute { attr } => write!(f, "can't set attribute '{}'", attr),
            Self::UnregisteredType { native } => write!(
                f,
                "Unable to convert function return value to a Python type! ({} is not registered)",
                native
            ),
            Self::UnsupportedOperand { op, lhs, rhs } => write!(
                f,
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op, lhs, rhs
            ),
            Self::SelfMismatch { expected, found } => write!(
                f,
                "self argument of type '{}' cannot be used as '{}'",
                found, expected
            ),
            Self::DuplicateRegistration { name } => {
                write!(f, "generic_type: type \"{}\" is already registered!", name)
            }
            Self::InvalidAnnotations { function, expected, found } => write!(
                f,
                "{}(): the number of argument annotations ({}) does not match the number of function arguments ({})",
                function, found, expected
            ),
            Self::DefaultOrdering { function, param } => write!(
                f,
                "{}(): non-default argument '{}' follows default argument",
                function, param
            ),
            Self::PropertyArity { property } => write!(
                f,
                "property '{}': getter must take no arguments and setter exactly one",
                property
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindError {
    pub kind: ErrorKind,
}

impl BindError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    pub fn missing_attribute(owner: AttributeOwner, attr: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingAttribute { owner, attr: attr.into() })
    }

    pub fn not_callable(ty: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotCallable { ty: ty.into() })
    }

    /// Host exception class this error is raised as
    pub fn exception(&self) -> ExceptionKind {
        match &self.kind {
            ErrorKind::MissingAttribute { .. } | ErrorKind::ReadOnlyAttribute { .. } => {
                ExceptionKind::AttributeError
            }
            ErrorKind::DuplicateRegistration { .. }
            | ErrorKind::InvalidAnnotations { .. }
            | ErrorKind::DefaultOrdering { .. }
            | ErrorKind::PropertyArity { .. } => ExceptionKind::ImportError,
            _ => ExceptionKind::TypeError,
        }
    }

    pub fn is_type_error(&self) -> bool {
        self.exception() == ExceptionKind::TypeError
    }

    pub fn is_attribute_error(&self) -> bool {
        self.exception() == ExceptionKind::AttributeError
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.exception(), self.kind)
    }
}

impl std::error::Error for BindError {}

impl From<ErrorKind> for BindError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

pub type BindResult<T> = Result<T, BindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_mapping() {
        let err = BindError::missing_attribute(AttributeOwner::Instance("example.Pet".into()), "bark");
        assert!(err.is_attribute_error());
        assert_eq!(err.to_string(), "AttributeError: 'example.Pet' object has no attribute 'bark'");

        let err = BindError::not_callable("int");
        assert!(err.is_type_error());

        let err = BindError::new(ErrorKind::DuplicateRegistration { name: "Pet".into() });
        assert_eq!(err.exception(), ExceptionKind::ImportError);
    }

    #[test]
    fn test_incompatible_arguments_layout() {
        let err = BindError::new(ErrorKind::IncompatibleArguments {
            function: "add1".into(),
            constructor: false,
            signatures: vec!["(arg0: int, arg1: int) -> int".into()],
            invoked_with: "1, 'a'".into(),
        });

        assert_eq!(
            err.kind.to_string(),
            "add1(): incompatible function arguments. The following argument types are supported:\n    \
             1. (arg0: int, arg1: int) -> int\n\nInvoked with: 1, 'a'"
        );
    }
}
