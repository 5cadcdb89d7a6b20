use std::{env, net::SocketAddr};

/// AppConfig
///
/// Holds the console's entire configuration. Immutable once loaded and pulled
/// into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the development role bypass and cookie security.
    pub env: Env,
    // Base URL of the hospital REST API, without a trailing slash.
    pub api_base_url: String,
    // HMAC secret used to seal the session cookie.
    pub session_secret: String,
    // Lifetime of a sealed session cookie, in seconds.
    pub session_ttl_secs: i64,
    // Socket address the console listens on.
    pub bind_addr: String,
    // Where the page component bundle is served from.
    pub asset_base_url: String,
}

/// Env
///
/// Distinguishes local development (dev bypass, relaxed secrets) from a
/// hardened production deployment.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// ConfigError
///
/// Start-up configuration failures. Returned by `AppConfig::load` so the binary
/// refuses to start with an incomplete or insecure configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} must be a positive integer, got {value:?}")]
    Invalid { name: &'static str, value: String },
}

const LOCAL_SESSION_SECRET: &str = "hms-console-local-session-secret";
const DEFAULT_SESSION_TTL_SECS: i64 = 8 * 60 * 60;

impl Default for AppConfig {
    /// default
    ///
    /// Non-failing values for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_base_url: "http://localhost:8000/api".to_string(),
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            bind_addr: "0.0.0.0:3000".to_string(),
            asset_base_url: "http://localhost:5173".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production demands
    /// `HMS_API_URL` and `HMS_SESSION_SECRET` explicitly; local development
    /// falls back to the defaults above.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();

        let (api_base_url, session_secret) = match env {
            Env::Production => (
                env::var("HMS_API_URL").map_err(|_| ConfigError::Missing("HMS_API_URL"))?,
                env::var("HMS_SESSION_SECRET")
                    .map_err(|_| ConfigError::Missing("HMS_SESSION_SECRET"))?,
            ),
            Env::Local => (
                env::var("HMS_API_URL").unwrap_or(defaults.api_base_url),
                env::var("HMS_SESSION_SECRET").unwrap_or(defaults.session_secret),
            ),
        };

        let session_ttl_secs = match env::var("HMS_SESSION_TTL_SECS") {
            // A non-positive lifetime would seal cookies that are born expired.
            Ok(value) => match value.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "HMS_SESSION_TTL_SECS",
                        value,
                    });
                }
            },
            Err(_) => defaults.session_ttl_secs,
        };

        Ok(Self {
            env,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            session_secret,
            session_ttl_secs,
            bind_addr: env::var("HMS_BIND_ADDR").unwrap_or(defaults.bind_addr),
            asset_base_url: env::var("HMS_ASSET_URL").unwrap_or(defaults.asset_base_url),
        })
    }

    /// dev_bypass_exposed
    ///
    /// True when the `x-dev-role` bypass is on and the listener is reachable
    /// from other hosts. Unparsable addresses other than `localhost:<port>` count
    /// as exposed.
    pub fn dev_bypass_exposed(&self) -> bool {
        if self.env != Env::Local {
            return false;
        }
        match self.bind_addr.parse::<SocketAddr>() {
            Ok(addr) => !addr.ip().is_loopback(),
            Err(_) => !self.bind_addr.starts_with("localhost:"),
        }
    }

    /// Session cookies only travel over TLS in production.
    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }
}
