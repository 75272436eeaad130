//! Session expiry accounting (AC-12)
//!
//! Computes how much life a verified session has left and whether the
//! holder should be warned. Advisory only: nothing here extends, refreshes,
//! or terminates a session. The hard expiry decision already happened in
//! [`crate::session`] before a [`Principal`] existed.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::session::Principal;

/// Snapshot of a session's remaining lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryStatus {
    /// Whole seconds until expiry, clamped to zero. A session inside the
    /// verification leeway can be valid with nothing left on the clock.
    pub remaining_seconds: i64,
    /// True once `remaining_seconds` is at or below the threshold.
    pub nearing_expiry: bool,
    /// The threshold the flag was computed against, echoed so clients need
    /// no separate config lookup to render a countdown.
    pub threshold_seconds: i64,
}

/// Compute the expiry status of `principal` as of `now`.
///
/// The warning flips exactly when the remaining time reaches the
/// threshold: `remaining == threshold` warns, `remaining == threshold + 1`
/// does not.
pub fn status(principal: &Principal, now: i64, threshold_seconds: i64) -> ExpiryStatus {
    let remaining_seconds = (principal.expires_at - now).max(0);
    ExpiryStatus {
        remaining_seconds,
        nearing_expiry: remaining_seconds <= threshold_seconds,
        threshold_seconds,
    }
}

/// Current Unix time in whole seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;
    const THRESHOLD: i64 = 600;

    fn principal(expires_at: i64) -> Principal {
        Principal {
            subject: "alice".to_string(),
            email: "alice@example.com".to_string(),
            issued_at: NOW - 60,
            expires_at,
        }
    }

    #[test]
    fn test_remaining_clamps_to_zero() {
        let s = status(&principal(NOW - 5), NOW, THRESHOLD);
        assert_eq!(s.remaining_seconds, 0);
        assert!(s.nearing_expiry);
    }

    #[test]
    fn test_warning_flips_exactly_at_threshold() {
        let at = status(&principal(NOW + THRESHOLD), NOW, THRESHOLD);
        assert_eq!(at.remaining_seconds, THRESHOLD);
        assert!(at.nearing_expiry);

        let above = status(&principal(NOW + THRESHOLD + 1), NOW, THRESHOLD);
        assert_eq!(above.remaining_seconds, THRESHOLD + 1);
        assert!(!above.nearing_expiry);
    }

    #[test]
    fn test_far_future_session_not_warned() {
        let s = status(&principal(NOW + 3600), NOW, THRESHOLD);
        assert_eq!(s.remaining_seconds, 3600);
        assert!(!s.nearing_expiry);
    }

    #[test]
    fn test_threshold_is_echoed() {
        let s = status(&principal(NOW + 100), NOW, 42);
        assert_eq!(s.threshold_seconds, 42);
    }

    #[test]
    fn test_unix_now_is_recent() {
        // 2023-11-14 in Unix seconds; anything earlier means a broken clock.
        assert!(unix_now() > 1_700_000_000);
    }
}
