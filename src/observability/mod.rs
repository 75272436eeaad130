//! Observability Infrastructure (AU-2, AU-3, AU-12)
//!
//! Structured logging for the gateway. Application code uses standard
//! `tracing` macros plus the [`security_event!`] macro for audit-relevant
//! decisions; this module wires the subscriber at startup.
//!
//! # Usage
//!
//! ```ignore
//! use postern::observability::{init_observability, LogFormat};
//!
//! // Honors RUST_LOG when set, LOG_FORMAT selects the output shape
//! init_observability(LogFormat::from_env())?;
//! ```

mod events;

pub use events::{security_event, SecurityEvent, Severity};

use std::fmt;
use tracing_subscriber::{fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "postern=info,tower_http=info";

/// Output shape for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human-readable output with source locations.
    Pretty,
    /// One JSON object per record, for log shippers.
    Json,
    /// Single-line human-readable output.
    #[default]
    Compact,
}

impl LogFormat {
    /// Read `LOG_FORMAT` from the environment (`pretty`, `json`, or
    /// anything else for compact).
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").map(|v| v.to_lowercase()).as_deref() {
            Ok("pretty") => LogFormat::Pretty,
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the built-in default filter. Calling
/// this twice in one process returns an error from the second call.
pub fn init_observability(format: LogFormat) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .map_err(|e| ObservabilityError::Config(format!("invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                subscriber_fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| ObservabilityError::Init(e.to_string()))?,
        LogFormat::Json => registry
            .with(subscriber_fmt::layer().json())
            .try_init()
            .map_err(|e| ObservabilityError::Init(e.to_string()))?,
        LogFormat::Compact => registry
            .with(subscriber_fmt::layer().compact().with_target(true))
            .try_init()
            .map_err(|e| ObservabilityError::Init(e.to_string()))?,
    }

    Ok(())
}

/// Errors from observability setup.
#[derive(Debug)]
pub enum ObservabilityError {
    /// Invalid configuration
    Config(String),
    /// Subscriber initialization failed
    Init(String),
}

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservabilityError::Config(msg) => write!(f, "observability config error: {}", msg),
            ObservabilityError::Init(msg) => write!(f, "observability init error: {}", msg),
        }
    }
}

impl std::error::Error for ObservabilityError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format_is_compact() {
        assert_eq!(LogFormat::default(), LogFormat::Compact);
    }

    #[test]
    fn test_error_display() {
        let err = ObservabilityError::Config("bad filter".to_string());
        assert_eq!(
            err.to_string(),
            "observability config error: bad filter"
        );
    }
}
