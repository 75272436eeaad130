//! Per-user data isolation (AC-3, AC-4)
//!
//! A verified session only proves who the caller is; it says nothing about
//! whose data they may touch. This module makes the second decision: the
//! subject named in the request path must be the subject the token was
//! issued to. Exact string equality decides, and every denial is audited.

use crate::observability::SecurityEvent;
use crate::session::Principal;

/// Outcome of an isolation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsolationDecision {
    /// The request targets the caller's own data.
    Authorized(Principal),
    /// The request targets another subject's data.
    Forbidden {
        /// Subject the request path named.
        requested_subject: String,
        /// Subject the verified token belongs to.
        token_subject: String,
    },
}

impl IsolationDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, IsolationDecision::Authorized(_))
    }
}

/// Decide whether `principal` may act on `requested_subject`'s data.
///
/// Comparison is exact and case-sensitive; "Alice" and "alice" are
/// different subjects. A `Forbidden` decision emits a structured
/// `isolation_violation` security event before returning, so the audit
/// record exists no matter what the caller does with the decision.
pub fn authorize(requested_subject: &str, principal: Principal) -> IsolationDecision {
    if requested_subject == principal.subject {
        return IsolationDecision::Authorized(principal);
    }

    crate::security_event!(
        SecurityEvent::IsolationViolation,
        requested_subject = %requested_subject,
        token_subject = %principal.subject,
        "Cross-user access denied"
    );

    IsolationDecision::Forbidden {
        requested_subject: requested_subject.to_string(),
        token_subject: principal.subject,
    }
}
