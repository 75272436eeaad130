//! Security layer application for Axum routers
//!
//! Provides the `SecureRouter` trait that wraps any router with the
//! gateway's outer security layers.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::SessionConfig;

/// Extension trait for applying security layers to an Axum Router.
///
/// Layers applied, outermost first:
/// 1. Request tracing (AU-2)
/// 2. CORS policy (AC-4)
/// 3. Security response headers (SC-8)
/// 4. Request body size limit
/// 5. Request timeout
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::get};
/// use postern::{SessionConfig, SecureRouter};
///
/// async fn handler() -> &'static str { "Hello" }
///
/// let config = SessionConfig::from_env()?;
/// let app = Router::new()
///     .route("/", get(handler))
///     .with_security(&config);
/// ```
pub trait SecureRouter {
    /// Apply the outer security layers per `config`.
    fn with_security(self, config: &SessionConfig) -> Self;
}

impl<S> SecureRouter for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security(self, config: &SessionConfig) -> Self {
        let mut router = self;

        // Layers added later wrap layers added earlier, so the order here
        // is innermost to outermost.
        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_seconds,
        )));
        router = router.layer(RequestBodyLimitLayer::new(config.max_request_bytes));

        if config.security_headers_enabled {
            router = router
                .layer(SetResponseHeaderLayer::overriding(
                    header::STRICT_TRANSPORT_SECURITY,
                    HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
                ))
                // Session responses carry identity data; keep caches out.
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_XSS_PROTECTION,
                    HeaderValue::from_static("0"),
                ));
        }

        router = router.layer(build_cors_layer(config));
        router = router.layer(TraceLayer::new_for_http());

        router
    }
}

/// Build the CORS layer from the configured origin list.
///
/// Three modes:
/// - empty list: no origins allowed (cross-origin requests denied)
/// - `["*"]`: any origin, without credentials
/// - explicit list: exactly those origins, with credentials
fn build_cors_layer(config: &SessionConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600));

    if config.cors_is_restrictive() {
        base
    } else if config.cors_is_permissive() {
        base.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        base.allow_origin(origins).allow_credentials(true)
    }
}
