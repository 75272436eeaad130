//! # Postern
//!
//! Stateless session security for Axum services: HS256 session
//! verification, per-user isolation enforcement, and a cookie-to-bearer
//! relay in front of an upstream application tier.
//!
//! ## Trust chain
//!
//! ```text
//! cookie / Authorization header
//!        │
//!        ▼
//! SessionVerifier (HS256, pinned algorithm, exp leeway)
//!        │ Valid
//!        ▼
//! Principal ──▶ isolation gate ({user_id} must match subject)
//!        │ Authorized
//!        ▼
//! handler (session introspection, expiry warning)
//! ```
//!
//! The expiry monitor is advisory: it reports remaining lifetime and a
//! warning flag, never extends or terminates a session.
//!
//! ## Features
//!
//! - **Session Verification** (IA-2, SC-13): HS256 only, constant-time
//!   signature comparison, configurable expiry leeway
//! - **Subject Isolation** (AC-3, AC-4): `{user_id}` routes only serve
//!   the token's own subject, denials audited
//! - **Uniform Rejections** (SI-11): every 401 reads the same; reasons
//!   live in the audit log, not the response
//! - **Cookie-to-Bearer Relay**: browser cookie in, `Authorization:
//!   Bearer` out, 502/504 mapped from upstream failures
//! - **Security Headers and CORS** (SC-8): hardened response defaults
//!   via [`SecureRouter`]
//! - **Structured Audit Events** (AU-2): [`security_event!`] with
//!   category and severity on every decision point
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use postern::observability::{init_observability, LogFormat};
//! use postern::{AuthState, HmacVerifier, SecureRouter, SessionConfig};
//! use postern::{proxy::ProxyState, routes::session_router};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_observability(LogFormat::from_env())?;
//!
//!     // Refuses weak secrets and foreign algorithms at startup
//!     let config = SessionConfig::from_env()?;
//!
//!     let auth = AuthState::new(Arc::new(HmacVerifier::new(&config)), config.clone());
//!     let proxy = ProxyState::new(&config)?;
//!
//!     let app = session_router(auth)
//!         .merge(proxy.into_router())
//!         .with_security(&config);
//!
//!     let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
mod crypto;
pub mod error;
pub mod expiry;
pub mod extract;
pub mod isolation;
mod layers;
pub mod observability;
pub mod proxy;
pub mod routes;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod token;

// Re-exports
pub use config::{generate_secret, ConfigError, SessionConfig, SessionConfigBuilder};
pub use crypto::{constant_time_eq, hmac_sha256};
pub use error::{AppError, ErrorKind};
pub use expiry::ExpiryStatus;
pub use extract::{AuthState, CurrentPrincipal};
pub use isolation::IsolationDecision;
pub use layers::SecureRouter;
pub use session::{HmacVerifier, Principal, SessionVerifier, SharedVerifier, ValidationOutcome};
