//! Deterministic test doubles and token minting (SA-11)
//!
//! Compiled only for this crate's tests and for consumers that enable the
//! `test-support` feature. Production builds carry none of it.
//!
//! # Usage
//!
//! ```ignore
//! use postern::testing::StaticVerifier;
//! use postern::{AuthState, SessionConfig};
//! use std::sync::Arc;
//!
//! let verifier = StaticVerifier::new().with_subject("alice-token", "alice");
//! let auth = AuthState::new(Arc::new(verifier), SessionConfig::default());
//! // Requests presenting "alice-token" now verify as alice, with no key
//! // material and no clock involved.
//! ```

use std::collections::HashMap;

use crate::session::{Principal, SessionVerifier, ValidationOutcome};
use crate::token::{self, TokenClaims};

// ============================================================================
// Static Verifier
// ============================================================================

/// Table-driven [`SessionVerifier`] double.
///
/// Verification is a lookup: tokens registered in the table verify as
/// their principal, everything else is rejected. No cryptography, no
/// clock, fully deterministic.
#[derive(Debug, Clone, Default)]
pub struct StaticVerifier {
    principals: HashMap<String, Principal>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` as verifying to `principal`.
    pub fn with_principal(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.principals.insert(token.into(), principal);
        self
    }

    /// Register `token` as verifying to a far-future session for `subject`.
    pub fn with_subject(self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        let principal = Principal {
            email: format!("{}@example.com", subject),
            subject,
            issued_at: 0,
            expires_at: i64::MAX,
        };
        self.with_principal(token, principal)
    }
}

impl SessionVerifier for StaticVerifier {
    fn verify(&self, raw: Option<&str>, _now: i64) -> ValidationOutcome {
        let raw = match raw {
            Some(r) if !r.trim().is_empty() => r,
            _ => return ValidationOutcome::MissingToken,
        };
        match self.principals.get(raw) {
            Some(principal) => ValidationOutcome::Valid(principal.clone()),
            None => ValidationOutcome::InvalidSignature,
        }
    }
}

// ============================================================================
// Token Minting
// ============================================================================

/// Mint a real signed token for exercising [`crate::session::HmacVerifier`].
///
/// `ttl_seconds` may be negative to mint an already-expired token.
pub fn mint_token(secret: &str, subject: &str, email: &str, now: i64, ttl_seconds: i64) -> String {
    mint_with_claims(
        secret,
        &TokenClaims {
            sub: Some(subject.to_string()),
            email: Some(email.to_string()),
            iat: Some(now),
            exp: Some(now + ttl_seconds),
            ..Default::default()
        },
    )
}

/// Mint a signed token with full control over the claims.
pub fn mint_with_claims(secret: &str, claims: &TokenClaims) -> String {
    token::sign(claims, secret.as_bytes()).expect("token serialization cannot fail for these claims")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::HmacVerifier;

    #[test]
    fn test_static_verifier_table_behavior() {
        let v = StaticVerifier::new().with_subject("good-token", "alice");
        assert!(v.verify(Some("good-token"), 0).is_valid());
        assert_eq!(
            v.verify(Some("unknown"), 0),
            ValidationOutcome::InvalidSignature
        );
        assert_eq!(v.verify(None, 0), ValidationOutcome::MissingToken);
        assert_eq!(v.verify(Some(""), 0), ValidationOutcome::MissingToken);
    }

    #[test]
    fn test_with_subject_fills_in_defaults() {
        let v = StaticVerifier::new().with_subject("t", "alice");
        match v.verify(Some("t"), 0) {
            ValidationOutcome::Valid(principal) => {
                assert_eq!(principal.subject, "alice");
                assert_eq!(principal.email, "alice@example.com");
                assert_eq!(principal.expires_at, i64::MAX);
            }
            other => panic!("expected Valid, got {:?}", other),
        }
    }

    #[test]
    fn test_minted_token_verifies_against_hmac_verifier() {
        let secret = "0123456789abcdef0123456789abcdef";
        let config = SessionConfig::builder().secret(secret).build();
        let v = HmacVerifier::new(&config);

        let now = 1_700_000_000;
        let raw = mint_token(secret, "alice", "alice@example.com", now, 3600);
        match v.verify(Some(&raw), now) {
            ValidationOutcome::Valid(principal) => {
                assert_eq!(principal.subject, "alice");
                assert_eq!(principal.expires_at, now + 3600);
            }
            other => panic!("expected Valid, got {:?}", other),
        }
    }

    #[test]
    fn test_verifiers_are_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StaticVerifier>();
        assert_send_sync::<HmacVerifier>();
    }
}
