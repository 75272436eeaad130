//! Request-side authentication glue (IA-2, AC-3)
//!
//! Connects the pure verification and isolation logic to Axum: pulls the
//! presented token off the request, runs the verifier, stashes the
//! resulting [`Principal`] in request extensions, and enforces subject
//! isolation for path-scoped routes. Handlers downstream never see an
//! unverified request.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::config::SessionConfig;
use crate::error::AppError;
use crate::expiry;
use crate::isolation::{self, IsolationDecision};
use crate::observability::SecurityEvent;
use crate::session::{Principal, SessionVerifier, SharedVerifier, ValidationOutcome};

// ============================================================================
// Auth State
// ============================================================================

/// Shared state for the authentication middleware.
///
/// Holds the verifier behind a trait object so tests can substitute a
/// deterministic double for [`crate::session::HmacVerifier`].
#[derive(Clone)]
pub struct AuthState {
    pub verifier: SharedVerifier,
    pub config: Arc<SessionConfig>,
}

impl AuthState {
    pub fn new(verifier: SharedVerifier, config: SessionConfig) -> Self {
        Self {
            verifier,
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Token Extraction
// ============================================================================

/// Pull the presented token from the request, if any.
///
/// An `Authorization: Bearer` header takes precedence over the session
/// cookie; API clients send the header, browsers send the cookie.
fn presented_token(headers: &HeaderMap, jar: &CookieJar, cookie_name: &str) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string())
        .or_else(|| jar.get(cookie_name).map(|c| c.value().to_string()))
}

// ============================================================================
// Session Middleware
// ============================================================================

/// Middleware gate: only verified requests pass (IA-2).
///
/// On success the verified [`Principal`] is inserted into request
/// extensions for handlers and inner middleware. Every rejection reason
/// collapses into the same 401 response; the specific reason goes to the
/// audit log only.
pub async fn require_session(
    State(state): State<AuthState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = presented_token(req.headers(), &jar, &state.config.cookie_name);
    let outcome = state.verifier.verify(token.as_deref(), expiry::unix_now());

    match outcome {
        ValidationOutcome::Valid(principal) => {
            crate::security_event!(
                SecurityEvent::SessionVerified,
                subject = %principal.subject,
                path = %req.uri().path(),
                "Session verified"
            );
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
        outcome => {
            crate::security_event!(
                SecurityEvent::SessionRejected,
                reason = %outcome.reason(),
                path = %req.uri().path(),
                "Session verification failed"
            );
            Err(AppError::unauthorized(outcome.reason()))
        }
    }
}

// ============================================================================
// Principal Extractor
// ============================================================================

/// Extractor handing handlers the verified identity.
///
/// Only usable behind [`require_session`]. If the middleware was not
/// applied, extraction fails with a 500: a route wired outside the gate is
/// a deployment bug and must not serve as anonymous.
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| AppError::internal("no verified principal in request extensions"))
    }
}

// ============================================================================
// Isolation Middleware
// ============================================================================

/// Middleware gate: the `user_id` path segment must match the verified
/// subject (AC-3).
///
/// Applied via the router builder together with [`require_session`], with
/// `require_session` as the outer layer, so this middleware always sees a
/// request that already carries a [`Principal`].
pub async fn enforce_subject_isolation(
    Path(params): Path<HashMap<String, String>>,
    CurrentPrincipal(principal): CurrentPrincipal,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let requested = params
        .get("user_id")
        .ok_or_else(|| AppError::internal("isolation middleware on a route without {user_id}"))?;

    match isolation::authorize(requested, principal) {
        IsolationDecision::Authorized(_) => Ok(next.run(req).await),
        IsolationDecision::Forbidden {
            requested_subject,
            token_subject,
        } => Err(AppError::forbidden(format!(
            "subject {:?} requested {:?}",
            token_subject, requested_subject
        ))),
    }
}
