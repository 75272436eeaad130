//! Boundary error handling (SI-11)
//!
//! Every failure a client can observe flows through [`AppError`]. The
//! internal detail string and source chain go to the structured log; the
//! HTTP response carries only a fixed generic message per [`ErrorKind`].
//!
//! # Security Rationale
//!
//! Rejection responses must not explain themselves. If a missing token, a
//! garbled token, and a forged signature produced three different bodies,
//! an attacker could tell which hurdle a guess cleared. All of them render
//! as the same 401; the distinction lives only in the audit log.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::error::Error;
use std::fmt;

// ============================================================================
// Error Kind
// ============================================================================

/// Classification of a boundary failure.
///
/// The kind alone determines the status code and the client-visible
/// message. Anything more specific stays server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No acceptable session was presented (401).
    Unauthorized,
    /// The session is valid but targets another subject's data (403).
    Forbidden,
    /// The upstream service could not be reached (502).
    UpstreamUnavailable,
    /// The upstream service did not answer within the deadline (504).
    UpstreamTimeout,
    /// Anything that should never happen (500).
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The one message clients ever see for this kind.
    pub fn client_message(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Invalid or expired session",
            ErrorKind::Forbidden => "Access denied",
            ErrorKind::UpstreamUnavailable => "Upstream request failed",
            ErrorKind::UpstreamTimeout => "Upstream request timed out",
            ErrorKind::Internal => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::UpstreamTimeout => "upstream_timeout",
            ErrorKind::Internal => "internal_error",
        };
        write!(f, "{}", code)
    }
}

// ============================================================================
// Application Error
// ============================================================================

/// Application-level error with a server-side detail string.
///
/// `detail` is written for operators and never leaves the process; the
/// response body is derived from `kind` alone.
pub struct AppError {
    pub kind: ErrorKind,
    pub detail: String,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            source: None,
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, detail)
    }

    pub fn upstream_unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, detail)
    }

    pub fn upstream_timeout(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamTimeout, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, detail)
    }

    /// Attach the underlying cause for the log's error chain.
    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Log at a severity matching the kind. Internal faults are errors;
    /// everything else is the system working as intended on a bad request.
    fn log(&self) {
        match self.kind {
            ErrorKind::Internal => {
                tracing::error!(
                    error_kind = %self.kind,
                    detail = %self.detail,
                    source = ?self.source,
                    "Request failed"
                );
            }
            ErrorKind::UpstreamUnavailable | ErrorKind::UpstreamTimeout => {
                tracing::warn!(
                    error_kind = %self.kind,
                    detail = %self.detail,
                    source = ?self.source,
                    "Upstream relay failed"
                );
            }
            ErrorKind::Unauthorized | ErrorKind::Forbidden => {
                tracing::warn!(
                    error_kind = %self.kind,
                    detail = %self.detail,
                    "Request rejected"
                );
            }
        }
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("detail", &self.detail)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn Error + 'static))
    }
}

// ============================================================================
// HTTP Response
// ============================================================================

/// Client-facing error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.kind.status_code();
        let body = ErrorResponse {
            detail: self.kind.client_message(),
        };
        let mut response = (status, Json(body)).into_response();

        // 401s advertise the expected scheme without describing what was
        // wrong with the attempt.
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer error=\"invalid_token\""),
            );
        }

        response
    }
}

/// Convenience alias for handler signatures.
pub type Result<T> = std::result::Result<T, AppError>;
