//! Security Event Logging
//!
//! Provides structured logging for security-relevant events as required by
//! NIST SP 800-53 AU-2 (Audit Events), AU-3 (Content of Audit Records).
//!
//! # Usage
//!
//! ```ignore
//! use postern::observability::{SecurityEvent, security_event};
//!
//! // Log a rejected session
//! security_event!(
//!     SecurityEvent::SessionRejected,
//!     reason = "signature_invalid",
//!     path = %request_path,
//!     "Session verification failed"
//! );
//!
//! // Log a cross-user access attempt
//! security_event!(
//!     SecurityEvent::IsolationViolation,
//!     requested_subject = %requested,
//!     token_subject = %owner,
//!     "Cross-user access denied"
//! );
//! ```

use std::fmt;

/// Security event categories for audit logging.
///
/// These categories align with NIST SP 800-53 AU-2 auditable events and
/// cover the gateway's decision points: session verification, isolation
/// enforcement, upstream relay health, and process lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// A presented token verified successfully
    SessionVerified,
    /// A presented token was rejected (missing, malformed, forged, expired)
    SessionRejected,
    /// A verified session crossed the expiry warning threshold
    SessionNearingExpiry,

    // Authorization events
    /// A verified session requested another subject's data
    IsolationViolation,

    // Upstream events
    /// The upstream service could not be reached
    UpstreamUnreachable,
    /// The upstream service missed its deadline
    UpstreamTimeout,

    // System events
    /// Gateway accepted its configuration and began listening
    GatewayStartup,
    /// Gateway stopped serving
    GatewayShutdown,
    /// Configuration failed validation; the gateway refused to start
    ConfigurationRejected,
}

impl SecurityEvent {
    /// Event category for filtering and aggregation.
    pub fn category(&self) -> &'static str {
        match self {
            SecurityEvent::SessionVerified
            | SecurityEvent::SessionRejected
            | SecurityEvent::SessionNearingExpiry => "authentication",
            SecurityEvent::IsolationViolation => "authorization",
            SecurityEvent::UpstreamUnreachable | SecurityEvent::UpstreamTimeout => "upstream",
            SecurityEvent::GatewayStartup
            | SecurityEvent::GatewayShutdown
            | SecurityEvent::ConfigurationRejected => "system",
        }
    }

    /// Severity level for the event.
    pub fn severity(&self) -> Severity {
        match self {
            SecurityEvent::SessionVerified
            | SecurityEvent::SessionNearingExpiry
            | SecurityEvent::GatewayStartup
            | SecurityEvent::GatewayShutdown => Severity::Low,
            SecurityEvent::SessionRejected
            | SecurityEvent::IsolationViolation
            | SecurityEvent::UpstreamUnreachable
            | SecurityEvent::UpstreamTimeout => Severity::High,
            SecurityEvent::ConfigurationRejected => Severity::Critical,
        }
    }

    /// Event name for structured logging.
    pub fn name(&self) -> &'static str {
        match self {
            SecurityEvent::SessionVerified => "session_verified",
            SecurityEvent::SessionRejected => "session_rejected",
            SecurityEvent::SessionNearingExpiry => "session_nearing_expiry",
            SecurityEvent::IsolationViolation => "isolation_violation",
            SecurityEvent::UpstreamUnreachable => "upstream_unreachable",
            SecurityEvent::UpstreamTimeout => "upstream_timeout",
            SecurityEvent::GatewayStartup => "gateway_startup",
            SecurityEvent::GatewayShutdown => "gateway_shutdown",
            SecurityEvent::ConfigurationRejected => "configuration_rejected",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Severity levels for security events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational, expected during normal operation
    Low,
    /// Notable, may warrant attention in aggregate
    Medium,
    /// Important, should be reviewed
    High,
    /// Urgent, requires immediate attention
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Log a security event with structured fields.
///
/// The macro automatically includes the event name, category, and severity
/// in the log record, and maps severity to the appropriate tracing level.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let event_name = event.name();
        let category = event.category();
        let severity = event.severity();

        match severity {
            $crate::observability::Severity::Critical => {
                ::tracing::error!(
                    security_event = event_name,
                    category = category,
                    severity = "critical",
                    $($field)*
                );
            }
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;
