//! Session token verification (IA-2, SC-13)
//!
//! The trust decision for every inbound request: given the raw token a
//! client presented (or its absence) and the current time, produce a
//! [`ValidationOutcome`]. Verification is a pure function of its inputs.
//! It performs no I/O, reads no clock, and consults no global state, so
//! any outcome can be reproduced exactly in a test by replaying the same
//! token and timestamp.
//!
//! # Security Rationale
//!
//! Every rejection reason maps to the same 401 at the HTTP boundary. The
//! distinct [`ValidationOutcome`] variants exist for audit logging and
//! tests only; handing clients a different response per failure mode
//! would give forgers an oracle for which part of a guess was wrong.

use std::fmt;
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::token;

// ============================================================================
// Principal
// ============================================================================

/// The verified identity a request acts as.
///
/// Only a successful [`SessionVerifier::verify`] call produces one; holding
/// a `Principal` means the token's signature and temporal claims already
/// passed. Downstream code never re-checks the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable subject identifier the token was issued to.
    pub subject: String,
    /// Contact address carried in the token; empty when the issuer omits it.
    pub email: String,
    /// Unix seconds the token was issued at; 0 when the issuer omits it.
    pub issued_at: i64,
    /// Unix seconds the token expires at.
    pub expires_at: i64,
}

// ============================================================================
// Validation Outcome
// ============================================================================

/// Result of verifying a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Signature and claims check out; the request acts as this principal.
    Valid(Principal),
    /// Correctly signed, but expired beyond the configured leeway.
    Expired,
    /// Signature mismatch, unacceptable algorithm, or untrusted claims.
    InvalidSignature,
    /// Not parseable as a three-segment token.
    Malformed,
    /// No token was presented at all.
    MissingToken,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    /// Stable snake_case reason for audit logs. Never sent to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationOutcome::Valid(_) => "valid",
            ValidationOutcome::Expired => "token_expired",
            ValidationOutcome::InvalidSignature => "signature_invalid",
            ValidationOutcome::Malformed => "token_malformed",
            ValidationOutcome::MissingToken => "token_missing",
        }
    }
}

// ============================================================================
// Verifier Trait
// ============================================================================

/// Verifies presented session tokens.
///
/// The seam between HTTP plumbing and trust decisions. Production wires in
/// [`HmacVerifier`]; tests substitute a deterministic double without
/// touching key material or constructing real tokens.
pub trait SessionVerifier: Send + Sync {
    /// Verify `raw` as of `now` (Unix seconds).
    ///
    /// `None` means no token was presented; implementations must return
    /// [`ValidationOutcome::MissingToken`] for it rather than treating
    /// absence as any other failure.
    fn verify(&self, raw: Option<&str>, now: i64) -> ValidationOutcome;
}

/// Shared handle to the verifier installed at startup.
pub type SharedVerifier = Arc<dyn SessionVerifier>;

// ============================================================================
// HMAC Verifier
// ============================================================================

/// HS256 verifier backed by a shared secret.
#[derive(Clone)]
pub struct HmacVerifier {
    secret: Vec<u8>,
    leeway_seconds: i64,
    clock_skew_seconds: i64,
    expected_issuer: Option<String>,
    expected_audience: Option<String>,
}

impl fmt::Debug for HmacVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacVerifier")
            .field("secret", &"[REDACTED]")
            .field("leeway_seconds", &self.leeway_seconds)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .field("expected_issuer", &self.expected_issuer)
            .field("expected_audience", &self.expected_audience)
            .finish()
    }
}

impl HmacVerifier {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            secret: config.secret.as_bytes().to_vec(),
            leeway_seconds: config.leeway_seconds,
            clock_skew_seconds: config.clock_skew_seconds,
            expected_issuer: config.issuer.clone(),
            expected_audience: config.audience.clone(),
        }
    }
}

impl SessionVerifier for HmacVerifier {
    fn verify(&self, raw: Option<&str>, now: i64) -> ValidationOutcome {
        // 1. Absence is its own outcome; an empty string is absence too.
        let raw = match raw {
            Some(r) if !r.trim().is_empty() => r,
            _ => return ValidationOutcome::MissingToken,
        };

        // 2. Structure before cryptography.
        let decoded = match token::decode(raw) {
            Ok(decoded) => decoded,
            Err(_) => return ValidationOutcome::Malformed,
        };

        // 3. Pin the algorithm before looking at the signature. A token
        //    declaring `none` or a foreign algorithm never reaches the
        //    comparison.
        if decoded.header.alg != token::TOKEN_ALGORITHM {
            return ValidationOutcome::InvalidSignature;
        }

        // 4. Constant-time tag comparison.
        match token::verify_signature(raw, &self.secret) {
            Ok(true) => {}
            _ => return ValidationOutcome::InvalidSignature,
        }

        // 5. A signed token without identity or lifetime is untrusted,
        //    not merely incomplete. Fail closed.
        let claims = decoded.claims;
        let (Some(subject), Some(expires_at)) = (claims.sub, claims.exp) else {
            return ValidationOutcome::InvalidSignature;
        };

        // 6. Expiry, with leeway absorbing clock drift between issuer
        //    and verifier.
        if now > expires_at + self.leeway_seconds {
            return ValidationOutcome::Expired;
        }

        // 7. A token issued in the future beyond tolerable skew was not
        //    produced by a well-behaved issuer.
        let issued_at = claims.iat.unwrap_or(0);
        if issued_at > now + self.clock_skew_seconds {
            return ValidationOutcome::InvalidSignature;
        }

        // 8. Issuer and audience are checked only when configured.
        if let Some(expected) = &self.expected_issuer {
            if claims.iss.as_deref() != Some(expected.as_str()) {
                return ValidationOutcome::InvalidSignature;
            }
        }
        if let Some(expected) = &self.expected_audience {
            if claims.aud.as_deref() != Some(expected.as_str()) {
                return ValidationOutcome::InvalidSignature;
            }
        }

        ValidationOutcome::Valid(Principal {
            subject,
            email: claims.email.unwrap_or_default(),
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::crypto;
    use crate::token::TokenClaims;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    const NOW: i64 = 1_700_000_000;
    const SECRET: &str = "test-secret-with-enough-length-0";

    fn verifier() -> HmacVerifier {
        let config = SessionConfig::builder()
            .secret(SECRET)
            .leeway_seconds(10)
            .clock_skew_seconds(30)
            .build();
        HmacVerifier::new(&config)
    }

    fn verifier_with_leeway(leeway: i64) -> HmacVerifier {
        let config = SessionConfig::builder()
            .secret(SECRET)
            .leeway_seconds(leeway)
            .clock_skew_seconds(30)
            .build();
        HmacVerifier::new(&config)
    }

    fn claims(sub: &str, exp: i64) -> TokenClaims {
        TokenClaims {
            sub: Some(sub.to_string()),
            email: Some(format!("{}@example.com", sub)),
            iat: Some(NOW - 60),
            exp: Some(exp),
            ..Default::default()
        }
    }

    fn mint(claims: &TokenClaims) -> String {
        token::sign(claims, SECRET.as_bytes()).unwrap()
    }

    /// Hand-assemble a token with an arbitrary header, correctly signed.
    fn mint_with_header(header_json: &str, claims: &TokenClaims) -> String {
        let encoded_header = URL_SAFE_NO_PAD.encode(header_json.as_bytes());
        let encoded_claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        let signing_input = format!("{}.{}", encoded_header, encoded_claims);
        let tag = crypto::hmac_sha256(SECRET.as_bytes(), signing_input.as_bytes());
        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(tag))
    }

    #[test]
    fn test_missing_token() {
        let v = verifier();
        assert_eq!(v.verify(None, NOW), ValidationOutcome::MissingToken);
        assert_eq!(v.verify(Some(""), NOW), ValidationOutcome::MissingToken);
        assert_eq!(v.verify(Some("   "), NOW), ValidationOutcome::MissingToken);
    }

    #[test]
    fn test_malformed_token() {
        let v = verifier();
        assert_eq!(
            v.verify(Some("not-a-token"), NOW),
            ValidationOutcome::Malformed
        );
        assert_eq!(v.verify(Some("a.b"), NOW), ValidationOutcome::Malformed);
        assert_eq!(
            v.verify(Some("!!!.!!!.!!!"), NOW),
            ValidationOutcome::Malformed
        );
    }

    #[test]
    fn test_valid_token_yields_principal() {
        let v = verifier();
        let raw = mint(&claims("alice", NOW + 3600));
        match v.verify(Some(&raw), NOW) {
            ValidationOutcome::Valid(principal) => {
                assert_eq!(principal.subject, "alice");
                assert_eq!(principal.email, "alice@example.com");
                assert_eq!(principal.issued_at, NOW - 60);
                assert_eq!(principal.expires_at, NOW + 3600);
            }
            other => panic!("expected Valid, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let v = verifier();
        let raw = mint(&claims("alice", NOW + 3600));
        // Flip the leading signature character; the segment still decodes
        // but the tag no longer matches.
        let parts: Vec<&str> = raw.split('.').collect();
        let sig = parts[2];
        let flipped = if sig.starts_with('A') {
            format!("B{}", &sig[1..])
        } else {
            format!("A{}", &sig[1..])
        };
        let forged = format!("{}.{}.{}", parts[0], parts[1], flipped);
        assert_eq!(
            v.verify(Some(&forged), NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let v = verifier();
        let raw = token::sign(&claims("alice", NOW + 3600), b"some-other-secret").unwrap();
        assert_eq!(
            v.verify(Some(&raw), NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_foreign_algorithm_rejected_even_when_signed() {
        // A correctly HMAC-signed token that merely claims HS512 must be
        // refused before any signature comparison.
        let v = verifier();
        let raw = mint_with_header(
            r#"{"alg":"HS512","typ":"JWT"}"#,
            &claims("alice", NOW + 3600),
        );
        assert_eq!(
            v.verify(Some(&raw), NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_alg_none_rejected() {
        let v = verifier();
        let raw = mint_with_header(r#"{"alg":"none"}"#, &claims("alice", NOW + 3600));
        assert_eq!(
            v.verify(Some(&raw), NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_expired_beyond_leeway() {
        let v = verifier();
        let raw = mint(&claims("alice", NOW - 11));
        assert_eq!(v.verify(Some(&raw), NOW), ValidationOutcome::Expired);
    }

    #[test]
    fn test_expired_within_leeway_still_valid() {
        let v = verifier();
        let raw = mint(&claims("alice", NOW - 1));
        assert!(v.verify(Some(&raw), NOW).is_valid());
    }

    #[test]
    fn test_leeway_boundary_is_inclusive() {
        // now == exp + leeway is the last instant the token is accepted.
        let v = verifier();
        let raw = mint(&claims("alice", NOW - 10));
        assert!(v.verify(Some(&raw), NOW).is_valid());
        assert_eq!(v.verify(Some(&raw), NOW + 1), ValidationOutcome::Expired);
    }

    #[test]
    fn test_zero_leeway_expires_immediately() {
        let v = verifier_with_leeway(0);
        let raw = mint(&claims("alice", NOW - 1));
        assert_eq!(v.verify(Some(&raw), NOW), ValidationOutcome::Expired);
    }

    #[test]
    fn test_missing_subject_rejected() {
        let v = verifier();
        let raw = mint(&TokenClaims {
            sub: None,
            exp: Some(NOW + 3600),
            ..Default::default()
        });
        assert_eq!(
            v.verify(Some(&raw), NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_missing_expiry_rejected() {
        let v = verifier();
        let raw = mint(&TokenClaims {
            sub: Some("alice".to_string()),
            exp: None,
            ..Default::default()
        });
        assert_eq!(
            v.verify(Some(&raw), NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_future_issued_at_beyond_skew_rejected() {
        let v = verifier();
        let mut c = claims("alice", NOW + 3600);
        c.iat = Some(NOW + 31);
        assert_eq!(
            v.verify(Some(&mint(&c)), NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_future_issued_at_within_skew_accepted() {
        let v = verifier();
        let mut c = claims("alice", NOW + 3600);
        c.iat = Some(NOW + 30);
        assert!(v.verify(Some(&mint(&c)), NOW).is_valid());
    }

    #[test]
    fn test_issuer_expectation() {
        let config = SessionConfig::builder()
            .secret(SECRET)
            .issuer("https://issuer.example.com")
            .build();
        let v = HmacVerifier::new(&config);

        let mut matching = claims("alice", NOW + 3600);
        matching.iss = Some("https://issuer.example.com".to_string());
        assert!(v.verify(Some(&mint(&matching)), NOW).is_valid());

        let mut wrong = claims("alice", NOW + 3600);
        wrong.iss = Some("https://evil.example.com".to_string());
        assert_eq!(
            v.verify(Some(&mint(&wrong)), NOW),
            ValidationOutcome::InvalidSignature
        );

        // Absent issuer fails a configured expectation too.
        let absent = claims("alice", NOW + 3600);
        assert_eq!(
            v.verify(Some(&mint(&absent)), NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_audience_expectation() {
        let config = SessionConfig::builder()
            .secret(SECRET)
            .audience("gateway")
            .build();
        let v = HmacVerifier::new(&config);

        let mut matching = claims("alice", NOW + 3600);
        matching.aud = Some("gateway".to_string());
        assert!(v.verify(Some(&mint(&matching)), NOW).is_valid());

        let mut wrong = claims("alice", NOW + 3600);
        wrong.aud = Some("somewhere-else".to_string());
        assert_eq!(
            v.verify(Some(&mint(&wrong)), NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_missing_email_defaults_to_empty() {
        let v = verifier();
        let raw = mint(&TokenClaims {
            sub: Some("alice".to_string()),
            email: None,
            iat: Some(NOW - 60),
            exp: Some(NOW + 3600),
            ..Default::default()
        });
        match v.verify(Some(&raw), NOW) {
            ValidationOutcome::Valid(principal) => assert_eq!(principal.email, ""),
            other => panic!("expected Valid, got {:?}", other),
        }
    }

    #[test]
    fn test_verification_is_pure() {
        // Same inputs, same outcome, any number of times.
        let v = verifier();
        let raw = mint(&claims("alice", NOW + 3600));
        let first = v.verify(Some(&raw), NOW);
        let second = v.verify(Some(&raw), NOW);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reason_strings_are_stable() {
        assert_eq!(ValidationOutcome::Expired.reason(), "token_expired");
        assert_eq!(
            ValidationOutcome::InvalidSignature.reason(),
            "signature_invalid"
        );
        assert_eq!(ValidationOutcome::Malformed.reason(), "token_malformed");
        assert_eq!(ValidationOutcome::MissingToken.reason(), "token_missing");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let v = verifier();
        let rendered = format!("{:?}", v);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains(SECRET));
    }
}
