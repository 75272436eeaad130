//! Session gateway binary.
//!
//! Wires the verified session surface and the cookie-to-bearer relay into
//! one listener. Configuration comes from the environment and is validated
//! before the socket is bound; an unsafe configuration means no gateway.

use std::sync::Arc;

use postern::observability::{init_observability, LogFormat, SecurityEvent};
use postern::proxy::ProxyState;
use postern::routes::session_router;
use postern::{AuthState, HmacVerifier, SecureRouter, SessionConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_observability(LogFormat::from_env())?;

    let config = match SessionConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            postern::security_event!(
                SecurityEvent::ConfigurationRejected,
                reason = %err,
                "Refusing to start with unsafe configuration"
            );
            return Err(err.into());
        }
    };

    tracing::info!(
        algorithm = %config.algorithm,
        access_token_expire_minutes = config.access_token_expire_minutes,
        warning_threshold_minutes = config.warning_threshold_minutes,
        leeway_seconds = config.leeway_seconds,
        upstream = %config.upstream_base_url,
        "Session gateway configured"
    );

    let auth = AuthState::new(Arc::new(HmacVerifier::new(&config)), config.clone());
    let proxy = ProxyState::new(&config)?;

    // Locally answered routes first; everything unmatched falls through
    // to the relay.
    let app = session_router(auth)
        .merge(proxy.into_router())
        .with_security(&config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    postern::security_event!(
        SecurityEvent::GatewayStartup,
        bind_addr = %config.bind_addr,
        "Session gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    postern::security_event!(SecurityEvent::GatewayShutdown, "Session gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
