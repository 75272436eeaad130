//! Cryptographic primitives for token verification (SC-13)
//!
//! Two operations, both used on the signature path:
//!
//! - **HMAC-SHA256**: the tag computed over a token's signing input
//! - **Constant-Time Comparison**: prevents timing attacks when a presented
//!   signature is checked against the recomputed one

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute an HMAC-SHA256 tag over `message` with `key`.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Performs constant-time comparison of two byte slices.
///
/// Standard `==` on slices exits at the first mismatching byte, which leaks
/// how much of a forged signature was correct through response timing. The
/// `subtle` comparison touches every byte regardless of where the inputs
/// differ; slices of unequal length compare unequal in the same way.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq_same() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_constant_time_eq_different() {
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }

    #[test]
    fn test_hmac_is_deterministic() {
        let a = hmac_sha256(b"key", b"message");
        let b = hmac_sha256(b"key", b"message");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_hmac_varies_with_key_and_message() {
        let base = hmac_sha256(b"key", b"message");
        assert_ne!(base, hmac_sha256(b"other-key", b"message"));
        assert_ne!(base, hmac_sha256(b"key", b"other message"));
    }

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2
        let tag = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        let expected = [
            0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
            0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
            0x64, 0xec, 0x38, 0x43,
        ];
        assert_eq!(tag, expected);
    }
}
