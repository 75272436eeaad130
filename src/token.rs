//! Compact signed-token wire format (IA-5, SC-13)
//!
//! Encoding, decoding, and signing of the three-segment dot-delimited token
//! format: `base64url(header).base64url(claims).base64url(signature)`, all
//! segments unpadded. This module owns the byte-level format only. Policy
//! decisions (algorithm acceptance, expiry, issuer checks) belong to
//! [`crate::session`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::crypto;

/// The only signing algorithm this crate produces or accepts.
///
/// Accepting the algorithm a token declares for itself is the classic
/// confusion attack (IA-5). Verification pins HS256 and rejects everything
/// else before any signature comparison happens.
pub const TOKEN_ALGORITHM: &str = "HS256";

/// Errors from parsing or producing a token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("expected 3 dot-delimited token segments, found {0}")]
    SegmentCount(usize),
    #[error("token segment is not valid unpadded base64url")]
    SegmentEncoding,
    #[error("token segment is not valid JSON")]
    SegmentJson,
    #[error("failed to serialize token part: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Token header. Only `alg` participates in verification decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Claims carried in the token payload.
///
/// Every field is optional at parse time; the session validator decides
/// which absences are fatal. Numeric dates tolerate floating-point values
/// since some issuers emit fractional timestamps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<i64>,
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// A structurally valid token, decoded but not yet verified.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub claims: TokenClaims,
}

fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))))
}

fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::SegmentEncoding)
}

/// Parse a raw token into its header and claims.
///
/// All three segments must decode as unpadded base64url and the first two
/// must hold valid JSON. No signature check happens here; a decoded token
/// carries no trust until [`verify_signature`] accepts it.
pub fn decode(raw: &str) -> Result<DecodedToken, TokenError> {
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::SegmentCount(parts.len()));
    }

    let header_bytes = decode_segment(parts[0])?;
    let claims_bytes = decode_segment(parts[1])?;
    // The signature segment must be well-formed even though its value is
    // only inspected during verification.
    decode_segment(parts[2])?;

    let header: TokenHeader =
        serde_json::from_slice(&header_bytes).map_err(|_| TokenError::SegmentJson)?;
    let claims: TokenClaims =
        serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::SegmentJson)?;

    Ok(DecodedToken { header, claims })
}

/// Produce a signed HS256 token for the given claims.
pub fn sign(claims: &TokenClaims, secret: &[u8]) -> Result<String, TokenError> {
    let header = TokenHeader {
        alg: TOKEN_ALGORITHM.to_string(),
        typ: Some("JWT".to_string()),
    };
    let encoded_header = encode_segment(&serde_json::to_vec(&header)?);
    let encoded_claims = encode_segment(&serde_json::to_vec(claims)?);
    let signing_input = format!("{}.{}", encoded_header, encoded_claims);
    let tag = crypto::hmac_sha256(secret, signing_input.as_bytes());
    Ok(format!("{}.{}", signing_input, encode_segment(&tag)))
}

/// Check a token's signature against `secret`.
///
/// Returns `Ok(false)` for a well-formed token whose tag does not match;
/// structural problems surface as errors. The comparison is constant-time.
pub fn verify_signature(raw: &str, secret: &[u8]) -> Result<bool, TokenError> {
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::SegmentCount(parts.len()));
    }
    let presented = decode_segment(parts[2])?;
    let signing_input = &raw[..parts[0].len() + 1 + parts[1].len()];
    let expected = crypto::hmac_sha256(secret, signing_input.as_bytes());
    Ok(crypto::constant_time_eq(&presented, &expected))
}
