//! Gateway HTTP surface
//!
//! The locally answered endpoints: health, advertised auth configuration,
//! and per-subject session introspection. Everything under
//! `/api/{user_id}` is wrapped by the session gate and the isolation gate
//! through [`subject_scoped`]; the router builder applies both layers, so
//! individual handlers cannot opt out of either check.

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::expiry;
use crate::extract::{enforce_subject_isolation, require_session, AuthState, CurrentPrincipal};
use crate::observability::SecurityEvent;

const SESSION_VALID_MESSAGE: &str = "Session is valid";
const SESSION_EXPIRING_MESSAGE: &str = "Session will expire soon. Please save your work.";

// ============================================================================
// Response Bodies
// ============================================================================

/// Session introspection payload.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: String,
    pub is_nearing_expiry: bool,
    pub remaining_time_seconds: i64,
    pub threshold_minutes: i64,
    pub message: &'static str,
}

/// Advertised authentication parameters. Safe to expose; the secret and
/// internal tolerances stay out.
#[derive(Debug, Serialize)]
pub struct AuthConfigInfo {
    pub access_token_expire_minutes: i64,
    pub session_warning_threshold_minutes: i64,
    pub algorithm: String,
    pub debug: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Report the verified session's remaining lifetime (AC-12).
///
/// Runs behind both gates, so the principal here already passed
/// verification and subject isolation.
async fn session_info(
    State(state): State<AuthState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Json<SessionInfo> {
    let status = expiry::status(
        &principal,
        expiry::unix_now(),
        state.config.warning_threshold_seconds(),
    );

    if status.nearing_expiry {
        crate::security_event!(
            SecurityEvent::SessionNearingExpiry,
            subject = %principal.subject,
            remaining_seconds = status.remaining_seconds,
            "Session approaching expiry"
        );
    }

    let message = if status.nearing_expiry {
        SESSION_EXPIRING_MESSAGE
    } else {
        SESSION_VALID_MESSAGE
    };

    Json(SessionInfo {
        user_id: principal.subject,
        email: principal.email,
        is_nearing_expiry: status.nearing_expiry,
        remaining_time_seconds: status.remaining_seconds,
        threshold_minutes: state.config.warning_threshold_minutes,
        message,
    })
}

/// Advertise token lifetime parameters for client countdown displays.
async fn auth_config(State(state): State<AuthState>) -> Json<AuthConfigInfo> {
    Json(AuthConfigInfo {
        access_token_expire_minutes: state.config.access_token_expire_minutes,
        session_warning_threshold_minutes: state.config.warning_threshold_minutes,
        algorithm: state.config.algorithm.clone(),
        debug: state.config.debug,
    })
}

/// Liveness probe. Deliberately outside the session gate.
async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

// ============================================================================
// Router Assembly
// ============================================================================

/// Wrap `routes` with the session gate and the isolation gate.
///
/// `require_session` is the outer layer; by the time
/// `enforce_subject_isolation` runs, a verified [`crate::session::Principal`]
/// is already in request extensions.
pub fn subject_scoped(auth: &AuthState, routes: Router<AuthState>) -> Router<AuthState> {
    routes
        .route_layer(middleware::from_fn(enforce_subject_isolation))
        .route_layer(middleware::from_fn_with_state(auth.clone(), require_session))
}

/// Build the gateway's locally answered routes.
///
/// `/health` and `/api/auth/config` are reachable without a session;
/// everything nested under `/api/{user_id}` is not.
pub fn session_router(auth: AuthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/config", get(auth_config))
        .nest(
            "/api/{user_id}",
            subject_scoped(
                &auth,
                Router::new().route("/session-info", get(session_info)),
            ),
        )
        .with_state(auth)
}
