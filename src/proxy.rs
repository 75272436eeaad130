//! Cookie-to-header relay (AC-4, SC-8)
//!
//! Browsers keep the session token in an HttpOnly cookie; the upstream
//! application tier expects `Authorization: Bearer`. This relay rewrites
//! one into the other and forwards the request otherwise untouched. It
//! deliberately does not verify the token: a missing cookie is answered
//! locally with a 401, anything else is the upstream's decision. One
//! outbound call per inbound request, an explicit per-request deadline,
//! and no retries at this layer.

use std::time::Duration;

use axum::{
    body::{to_bytes, Bytes},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use axum_extra::extract::CookieJar;

use crate::config::{ConfigError, SessionConfig};
use crate::error::AppError;
use crate::observability::SecurityEvent;

/// Upper bound on a buffered relay body. The outer body-limit layer is
/// configured tighter; this is the relay's own backstop.
const MAX_RELAY_BYTES: usize = 2 * 1024 * 1024;

// ============================================================================
// Proxy State
// ============================================================================

/// Shared state for the relay: one pooled HTTP client for the process.
#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    upstream_base: String,
    cookie_name: String,
    timeout: Duration,
}

impl ProxyState {
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConfigError::UpstreamClient(e.to_string()))?;
        Ok(Self {
            client,
            upstream_base: config.upstream_base_url.trim_end_matches('/').to_string(),
            cookie_name: config.cookie_name.clone(),
            timeout: Duration::from_secs(config.upstream_timeout_seconds),
        })
    }

    /// Turn the relay into a router that catches every unmatched path.
    pub fn into_router(self) -> Router {
        Router::new().fallback(forward).with_state(self)
    }
}

// ============================================================================
// Forward Spec
// ============================================================================

/// Everything the outbound call is built from.
///
/// Assembled in one place so tests can assert exactly what leaves the
/// gateway: target URL, verb, bearer header, and whether a body rides
/// along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyForwardSpec {
    pub target_url: String,
    pub method: Method,
    pub bearer: String,
    pub body: Option<Bytes>,
}

impl ProxyForwardSpec {
    /// Build the outbound call description.
    ///
    /// Bodies ride along only for POST, PUT, and PATCH; other verbs
    /// forward without one even if the inbound request carried bytes.
    pub fn build(
        upstream_base: &str,
        method: Method,
        path_and_query: &str,
        token: &str,
        body: Bytes,
    ) -> Self {
        let include_body = matches!(method, Method::POST | Method::PUT | Method::PATCH);
        Self {
            target_url: format!("{}{}", upstream_base, path_and_query),
            bearer: format!("Bearer {}", token),
            body: (include_body && !body.is_empty()).then_some(body),
            method,
        }
    }
}

// ============================================================================
// Relay Handler
// ============================================================================

/// Fallback handler relaying a request to the upstream tier.
///
/// The handler future is dropped if the caller disconnects, which aborts
/// the in-flight upstream call; nothing is spawned detached.
pub async fn forward(
    State(state): State<ProxyState>,
    jar: CookieJar,
    req: Request,
) -> Result<Response, AppError> {
    // Missing cookie: answer locally, zero upstream traffic. A cookie
    // that is present but invalid still relays; the upstream owns that
    // verdict.
    let Some(cookie) = jar.get(&state.cookie_name) else {
        return Err(AppError::unauthorized("no session cookie presented"));
    };
    let token = cookie.value().to_string();

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().clone();

    let body = to_bytes(req.into_body(), MAX_RELAY_BYTES)
        .await
        .map_err(|e| AppError::internal("failed to buffer inbound request body").with_source(e))?;

    let spec = ProxyForwardSpec::build(&state.upstream_base, method, &path_and_query, &token, body);
    relay(&state, spec).await
}

async fn relay(state: &ProxyState, spec: ProxyForwardSpec) -> Result<Response, AppError> {
    let ProxyForwardSpec {
        target_url,
        method,
        bearer,
        body,
    } = spec;

    let mut request = state
        .client
        .request(method, &target_url)
        .header(header::AUTHORIZATION, bearer)
        .header(header::CONTENT_TYPE, "application/json")
        .timeout(state.timeout);
    if let Some(bytes) = body {
        request = request.body(bytes);
    }

    let upstream = match request.send().await {
        Ok(upstream) => upstream,
        Err(err) if err.is_timeout() => {
            crate::security_event!(
                SecurityEvent::UpstreamTimeout,
                target = %target_url,
                "Upstream call exceeded its deadline"
            );
            return Err(
                AppError::upstream_timeout(format!("relay to {} timed out", target_url))
                    .with_source(err),
            );
        }
        Err(err) => {
            crate::security_event!(
                SecurityEvent::UpstreamUnreachable,
                target = %target_url,
                "Upstream call failed"
            );
            return Err(
                AppError::upstream_unavailable(format!("relay to {} failed", target_url))
                    .with_source(err),
            );
        }
    };

    let status = upstream.status();

    // 204 and 304 carry no payload by definition; skip body handling
    // entirely.
    if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return Ok(status.into_response());
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| AppError::upstream_unavailable("failed to read upstream body").with_source(e))?;

    Ok((status, [(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
