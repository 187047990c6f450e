//! Docstring rendering options, the equivalent of a binding toolkit's
//! global `options` block.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Include the docstring passed at registration time
    #[serde(default = "default_true")]
    pub show_user_defined_docstrings: bool,

    /// Prepend generated signatures (`add2(i: int, j: int) -> int`)
    #[serde(default = "default_true")]
    pub show_function_signatures: bool,

    /// Module prefix used in qualified type names (`example.Pet`)
    #[serde(default = "default_module_name")]
    pub module_name: String,
}

fn default_true() -> bool {
    true
}

fn default_module_name() -> String {
    "example".to_string()
}

impl Default for Options {
    fn default() -> Self {
        Self {
            show_user_defined_docstrings: true,
            show_function_signatures: true,
            module_name: default_module_name(),
        }
    }
}

impl Options {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Options for a module of the given name, everything else default
    pub fn for_module(name: impl Into<String>) -> Self {
        Self {
            module_name: name.into(),
            ..Self::default()
        }
    }

    pub fn disable_function_signatures(mut self) -> Self {
        self.show_function_signatures = false;
        self
    }

    pub fn disable_user_defined_docstrings(mut self) -> Self {
        self.show_user_defined_docstrings = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "Failed to read options: {}", msg),
            Self::Parse(msg) => write!(f, "Failed to parse options: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
