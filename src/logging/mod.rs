//! Logging infrastructure - structured tracing for the binding runtime
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log level through environment variables
//! - Zero-cost when disabled
//! - Console or file output, human-readable or JSON

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub use tracing::{debug, error, info, trace, warn};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path; console (stderr) output when unset
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // EXAMPLE_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("EXAMPLE_LOG_LEVEL") {
            config.level = parse_level(&level_str).unwrap_or(Level::WARN);
        }

        if let Ok(path) = std::env::var("EXAMPLE_LOG_FILE") {
            config.log_path = Some(path);
        }

        config.json_format = std::env::var("EXAMPLE_LOG_JSON").is_ok();
        config.show_spans = std::env::var("EXAMPLE_LOG_SPANS").is_ok();

        config
    }

    /// Verbose config for debugging dispatch
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            log_path: None,
            json_format: false,
            show_spans: true,
        }
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging with configuration taken from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration
///
/// Only the first call installs a subscriber. If the embedding process already
/// set a global subscriber, that one is left in place.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("example={}", config.level.as_str().to_lowercase()))
        });

        let layer = match config.log_path.as_deref() {
            Some(path) => {
                let path = Path::new(path);
                let directory = path.parent().unwrap_or_else(|| Path::new("."));
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "example.log".to_string());
                format_layer(
                    tracing_appender::rolling::never(directory, file_name),
                    &config,
                    false,
                )
            }
            None => format_layer(io::stderr, &config, true),
        };

        let _ = tracing_subscriber::registry()
            .with(layer)
            .with(env_filter)
            .try_init();
    });
}

fn format_layer<W>(writer: W, config: &LogConfig, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let span_events = if config.show_spans {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_span_events(span_events)
        .with_target(true)
        .with_line_number(cfg!(debug_assertions));

    if config.json_format {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Binding-specific logging functions
// ============================================================================

/// Log a host-visible name being bound
#[inline]
pub fn log_registration(kind: &str, name: &str) {
    debug!(event = "register", kind = kind, name = name, "Binding registered");
}

/// Log a call dispatched to a native overload
#[inline]
pub fn log_dispatch(function: &str, overload: usize, arg_count: usize) {
    trace!(
        event = "dispatch",
        function = function,
        overload = overload,
        args = arg_count,
        "Native overload selected"
    );
}

/// Log a call no overload accepted
pub fn log_dispatch_failure(function: &str, overloads: usize) {
    debug!(
        event = "dispatch_failure",
        function = function,
        overloads = overloads,
        "No overload accepted the arguments"
    );
}

/// Log the concrete type recovered for a polymorphic return value
pub fn log_type_recovery(declared: &str, concrete: &str) {
    debug!(
        event = "type_recovery",
        declared = declared,
        concrete = concrete,
        "Resolved most-derived type"
    );
}

/// Log native object release (last host reference dropped)
#[inline]
pub fn log_instance_release(ty: &str) {
    trace!(event = "instance_release", ty = ty, "Native instance released");
}

/// Log a host attribute miss
#[inline]
pub fn log_attribute_miss(owner: &str, attr: &str) {
    trace!(event = "attribute_miss", owner = owner, attr = attr, "Attribute lookup failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(config.log_path.is_none());

        let debug_config = LogConfig::debug();
        assert_eq!(debug_config.level, Level::TRACE);
        assert!(debug_config.show_spans);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_init_idempotent() {
        init();
        init(); // Should not panic
        assert!(is_initialized());
    }
}
