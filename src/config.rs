//! Gateway configuration
//!
//! One immutable [`SessionConfig`] built at startup, validated once, then
//! shared read-only for the life of the process. Hot paths never read
//! ambient global state; everything they need was captured here.

use std::fmt;
use thiserror::Error;

use crate::token::TOKEN_ALGORITHM;

/// Minimum signing-secret length in bytes (IA-5).
///
/// HS256's security rests entirely on the secret's entropy. 32 bytes
/// matches the hash output width; anything shorter weakens the tag.
pub const MIN_SECRET_BYTES: usize = 32;

// ============================================================================
// Session Config
// ============================================================================

/// Runtime configuration for the session gateway.
///
/// # Example
///
/// ```ignore
/// use postern::SessionConfig;
///
/// // Load from environment variables, refusing unsafe values
/// let config = SessionConfig::from_env()?;
///
/// // Or build programmatically
/// let config = SessionConfig::builder()
///     .secret(my_secret)
///     .warning_threshold_minutes(5)
///     .upstream_base_url("http://backend:8000")
///     .build();
/// ```
#[derive(Clone)]
pub struct SessionConfig {
    /// Shared HMAC signing secret (IA-5). Never logged, never serialized.
    pub secret: String,

    /// Declared signing algorithm. Validation refuses anything but HS256;
    /// the field exists so a misconfigured deployment fails loudly at
    /// startup instead of silently downgrading (SC-13).
    pub algorithm: String,

    /// Advertised token lifetime in minutes. Informational; actual expiry
    /// comes from each token's `exp` claim.
    pub access_token_expire_minutes: i64,

    /// Minutes before expiry at which clients are told to warn (AC-12).
    pub warning_threshold_minutes: i64,

    /// Seconds past `exp` a token is still accepted, absorbing clock
    /// drift between issuer and gateway.
    pub leeway_seconds: i64,

    /// Seconds into the future an `iat` claim may sit before the token
    /// is rejected as not-yet-issued.
    pub clock_skew_seconds: i64,

    /// Expected `iss` claim; unset means no issuer check.
    pub issuer: Option<String>,

    /// Expected `aud` claim; unset means no audience check.
    pub audience: Option<String>,

    /// Cookie the browser-facing surface reads the session token from.
    pub cookie_name: String,

    /// Allowed CORS origins. Empty denies cross-origin; `["*"]` allows any.
    pub allowed_origins: Vec<String>,

    /// Base URL of the upstream application tier the relay forwards to.
    pub upstream_base_url: String,

    /// Deadline in seconds for each relayed upstream call.
    pub upstream_timeout_seconds: u64,

    /// Deadline in seconds for handling any inbound request.
    pub request_timeout_seconds: u64,

    /// Maximum inbound request body size in bytes.
    pub max_request_bytes: usize,

    /// Whether responses carry the hardening header set (SC-8).
    pub security_headers_enabled: bool,

    /// Debug mode flag, surfaced to clients via the config endpoint.
    pub debug: bool,

    /// Address the gateway binds to.
    pub bind_addr: String,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field(
                "access_token_expire_minutes",
                &self.access_token_expire_minutes,
            )
            .field("warning_threshold_minutes", &self.warning_threshold_minutes)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("cookie_name", &self.cookie_name)
            .field("allowed_origins", &self.allowed_origins)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_timeout_seconds", &self.upstream_timeout_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("max_request_bytes", &self.max_request_bytes)
            .field("security_headers_enabled", &self.security_headers_enabled)
            .field("debug", &self.debug)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: TOKEN_ALGORITHM.to_string(),
            access_token_expire_minutes: 60,
            warning_threshold_minutes: 10,
            leeway_seconds: 10,
            clock_skew_seconds: 30,
            issuer: None,
            audience: None,
            cookie_name: "session_token".to_string(),
            allowed_origins: Vec::new(),
            upstream_base_url: "http://127.0.0.1:8000".to_string(),
            upstream_timeout_seconds: 30,
            request_timeout_seconds: 30,
            max_request_bytes: 1024 * 1024,
            security_headers_enabled: true,
            debug: false,
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl SessionConfig {
    /// Create a builder for programmatic configuration.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: SessionConfig::default(),
        }
    }

    /// Load configuration from environment variables and validate it.
    ///
    /// Environment variables:
    /// - `AUTH_SECRET` - HMAC signing secret (required, min 32 bytes)
    /// - `JWT_ALGORITHM` - signing algorithm (default: HS256; only HS256 passes validation)
    /// - `ACCESS_TOKEN_EXPIRE_MINUTES` - advertised token lifetime (default: 60)
    /// - `SESSION_WARNING_THRESHOLD_MINUTES` - expiry warning threshold (default: 10)
    /// - `JWT_LEEWAY_SECONDS` - post-expiry acceptance window (default: 10)
    /// - `CLOCK_SKEW_SECONDS` - future-iat tolerance (default: 30)
    /// - `JWT_ISSUER` - expected issuer claim (default: unchecked)
    /// - `JWT_AUDIENCE` - expected audience claim (default: unchecked)
    /// - `SESSION_COOKIE_NAME` - session cookie name (default: session_token)
    /// - `CORS_ALLOWED_ORIGINS` - comma-separated origins (default: none)
    /// - `UPSTREAM_BASE_URL` - relay target (default: http://127.0.0.1:8000)
    /// - `UPSTREAM_TIMEOUT_SECONDS` - relay deadline (default: 30)
    /// - `DEBUG` - debug flag: 1/true/yes/on (default: false)
    /// - `BIND_ADDR` - listen address (default: 127.0.0.1:3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = SessionConfig::default();
        let config = Self {
            secret: std::env::var("AUTH_SECRET").unwrap_or_default(),
            algorithm: std::env::var("JWT_ALGORITHM").unwrap_or(defaults.algorithm),
            access_token_expire_minutes: std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.access_token_expire_minutes),
            warning_threshold_minutes: std::env::var("SESSION_WARNING_THRESHOLD_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.warning_threshold_minutes),
            leeway_seconds: std::env::var("JWT_LEEWAY_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.leeway_seconds),
            clock_skew_seconds: std::env::var("CLOCK_SKEW_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.clock_skew_seconds),
            issuer: std::env::var("JWT_ISSUER").ok().filter(|v| !v.is_empty()),
            audience: std::env::var("JWT_AUDIENCE").ok().filter(|v| !v.is_empty()),
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or(defaults.cookie_name),
            allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or(defaults.allowed_origins),
            upstream_base_url: std::env::var("UPSTREAM_BASE_URL")
                .unwrap_or(defaults.upstream_base_url),
            upstream_timeout_seconds: std::env::var("UPSTREAM_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.upstream_timeout_seconds),
            request_timeout_seconds: defaults.request_timeout_seconds,
            max_request_bytes: defaults.max_request_bytes,
            security_headers_enabled: defaults.security_headers_enabled,
            debug: std::env::var("DEBUG")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.debug),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration against startup safety rules.
    ///
    /// A gateway that starts with a weak secret or a foreign algorithm
    /// verifies nothing; refusal at startup is the only safe response.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::SecretMissing);
        }
        if self.secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::SecretTooShort {
                actual: self.secret.len(),
                minimum: MIN_SECRET_BYTES,
            });
        }
        if self.algorithm != TOKEN_ALGORITHM {
            return Err(ConfigError::UnsupportedAlgorithm {
                requested: self.algorithm.clone(),
            });
        }
        for (field, value) in [
            ("access_token_expire_minutes", self.access_token_expire_minutes),
            ("warning_threshold_minutes", self.warning_threshold_minutes),
            ("leeway_seconds", self.leeway_seconds),
            ("clock_skew_seconds", self.clock_skew_seconds),
        ] {
            if value < 0 {
                return Err(ConfigError::NegativeDuration { field });
            }
        }
        if reqwest::Url::parse(&self.upstream_base_url).is_err() {
            return Err(ConfigError::InvalidUpstreamUrl {
                url: self.upstream_base_url.clone(),
            });
        }
        Ok(())
    }

    /// Warning threshold in seconds, the unit expiry math works in.
    pub fn warning_threshold_seconds(&self) -> i64 {
        self.warning_threshold_minutes * 60
    }

    /// Returns true if CORS is configured permissively (allows any origin)
    pub fn cors_is_permissive(&self) -> bool {
        self.allowed_origins.len() == 1 && self.allowed_origins[0] == "*"
    }

    /// Returns true if CORS denies all cross-origin requests
    pub fn cors_is_restrictive(&self) -> bool {
        self.allowed_origins.is_empty()
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`SessionConfig`].
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set the HMAC signing secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config.secret = secret.into();
        self
    }

    /// Set the declared signing algorithm.
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.config.algorithm = algorithm.into();
        self
    }

    /// Set the advertised token lifetime in minutes.
    pub fn access_token_expire_minutes(mut self, minutes: i64) -> Self {
        self.config.access_token_expire_minutes = minutes;
        self
    }

    /// Set the expiry warning threshold in minutes.
    pub fn warning_threshold_minutes(mut self, minutes: i64) -> Self {
        self.config.warning_threshold_minutes = minutes;
        self
    }

    /// Set the post-expiry acceptance window in seconds.
    pub fn leeway_seconds(mut self, seconds: i64) -> Self {
        self.config.leeway_seconds = seconds;
        self
    }

    /// Set the future-iat tolerance in seconds.
    pub fn clock_skew_seconds(mut self, seconds: i64) -> Self {
        self.config.clock_skew_seconds = seconds;
        self
    }

    /// Require tokens to carry this issuer claim.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.issuer = Some(issuer.into());
        self
    }

    /// Require tokens to carry this audience claim.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.config.audience = Some(audience.into());
        self
    }

    /// Set the session cookie name.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.config.cookie_name = name.into();
        self
    }

    /// Set allowed CORS origins.
    pub fn allowed_origins(mut self, origins: Vec<&str>) -> Self {
        self.config.allowed_origins = origins.into_iter().map(String::from).collect();
        self
    }

    /// Allow any origin (development only).
    pub fn cors_permissive(mut self) -> Self {
        self.config.allowed_origins = vec!["*".to_string()];
        self
    }

    /// Set the upstream relay target.
    pub fn upstream_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.upstream_base_url = url.into();
        self
    }

    /// Set the upstream call deadline in seconds.
    pub fn upstream_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.upstream_timeout_seconds = seconds;
        self
    }

    /// Set the inbound request deadline in seconds.
    pub fn request_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.request_timeout_seconds = seconds;
        self
    }

    /// Set the maximum inbound body size in bytes.
    pub fn max_request_bytes(mut self, bytes: usize) -> Self {
        self.config.max_request_bytes = bytes;
        self
    }

    /// Disable the hardening header set (testing only).
    pub fn disable_security_headers(mut self) -> Self {
        self.config.security_headers_enabled = false;
        self
    }

    /// Set the debug flag.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Set the listen address.
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Build the configuration without validating it. Call
    /// [`SessionConfig::validate`] before serving traffic.
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

// ============================================================================
// Config Error
// ============================================================================

/// A configuration the gateway refuses to start with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("signing secret is not set; provide AUTH_SECRET")]
    SecretMissing,
    #[error("signing secret is {actual} bytes; at least {minimum} required")]
    SecretTooShort { actual: usize, minimum: usize },
    #[error("unsupported signing algorithm {requested:?}; only {} is accepted", TOKEN_ALGORITHM)]
    UnsupportedAlgorithm { requested: String },
    #[error("{field} must not be negative")]
    NegativeDuration { field: &'static str },
    #[error("upstream base URL {url:?} is not a valid URL")]
    InvalidUpstreamUrl { url: String },
    #[error("failed to build upstream HTTP client: {0}")]
    UpstreamClient(String),
}

// ============================================================================
// Secret Generation
// ============================================================================

/// Generate a random secret suitable for HS256 signing.
///
/// For provisioning and tests. Deployments normally mint the secret once
/// and distribute it via their secret store.
pub fn generate_secret(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()_+-=";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_fails_validation() {
        // No secret is configured by default; starting must be refused.
        assert_eq!(
            SessionConfig::default().validate(),
            Err(ConfigError::SecretMissing)
        );
    }

    #[test]
    fn test_generated_secret_passes_validation() {
        let config = SessionConfig::builder()
            .secret(generate_secret(MIN_SECRET_BYTES))
            .build();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = SessionConfig::builder().secret("too-short").build();
        assert_eq!(
            config.validate(),
            Err(ConfigError::SecretTooShort {
                actual: 9,
                minimum: MIN_SECRET_BYTES,
            })
        );
    }

    #[test]
    fn test_foreign_algorithm_rejected() {
        let config = SessionConfig::builder()
            .secret(generate_secret(32))
            .algorithm("HS512")
            .build();
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnsupportedAlgorithm {
                requested: "HS512".to_string(),
            })
        );
    }

    #[test]
    fn test_negative_durations_rejected() {
        let config = SessionConfig::builder()
            .secret(generate_secret(32))
            .leeway_seconds(-1)
            .build();
        assert_eq!(
            config.validate(),
            Err(ConfigError::NegativeDuration {
                field: "leeway_seconds",
            })
        );
    }

    #[test]
    fn test_invalid_upstream_url_rejected() {
        let config = SessionConfig::builder()
            .secret(generate_secret(32))
            .upstream_base_url("not a url")
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUpstreamUrl { .. })
        ));
    }

    #[test]
    fn test_parse_origins_splits_and_trims() {
        assert_eq!(
            parse_origins("https://a.example.com, https://b.example.com ,"),
            vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string(),
            ]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_cors_mode_helpers() {
        let restrictive = SessionConfig::default();
        assert!(restrictive.cors_is_restrictive());
        assert!(!restrictive.cors_is_permissive());

        let permissive = SessionConfig::builder().cors_permissive().build();
        assert!(permissive.cors_is_permissive());
        assert!(!permissive.cors_is_restrictive());

        let explicit = SessionConfig::builder()
            .allowed_origins(vec!["https://app.example.com"])
            .build();
        assert!(!explicit.cors_is_permissive());
        assert!(!explicit.cors_is_restrictive());
    }

    #[test]
    fn test_warning_threshold_in_seconds() {
        let config = SessionConfig::builder().warning_threshold_minutes(5).build();
        assert_eq!(config.warning_threshold_seconds(), 300);
    }

    #[test]
    fn test_debug_output_redacts_secret() {
        let config = SessionConfig::builder()
            .secret("super-secret-value-none-may-see-it")
            .build();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret-value"));
    }

    #[test]
    fn test_generate_secret_length_and_variety() {
        let a = generate_secret(32);
        let b = generate_secret(32);
        assert_eq!(a.len(), 32);
        assert_eq!(b.len(), 32);
        // Two draws colliding would mean the RNG is broken.
        assert_ne!(a, b);
    }
}
