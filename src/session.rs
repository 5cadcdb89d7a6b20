use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::{config::AppConfig, models::Session};

// 1. The Session Store
/// SessionStore
///
/// The single authoritative place that answers "who is signed in". Reads are
/// plain clones of the current value; writes replace it and are pushed to every
/// subscriber through a `watch` channel, so a mounted guard can never evaluate
/// against a stale session.
///
/// Cloning the store yields another handle onto the same session.
#[derive(Clone)]
pub struct SessionStore {
    sender: Arc<watch::Sender<Session>>,
}

impl SessionStore {
    pub fn new(initial: Session) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// get_session
    ///
    /// Returns the most recently written session. Never fails.
    pub fn get_session(&self) -> Session {
        self.sender.borrow().clone()
    }

    /// set_session
    ///
    /// Replaces the session and notifies all subscribers, whether or not any
    /// are currently listening.
    pub fn set_session(&self, session: Session) {
        tracing::debug!(
            authenticated = session.is_authenticated(),
            role_id = ?session.role_id,
            "session store updated"
        );
        self.sender.send_replace(session);
    }

    pub fn clear_session(&self) {
        self.set_session(Session::default());
    }

    /// subscribe
    ///
    /// A receiver that observes every subsequent write. The current value is
    /// marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sender.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Session::default())
    }
}

// 2. Durable Session Encoding
/// SessionClaims
///
/// The payload sealed into the session cookie. Signing it with the console's
/// secret means a corrupted or hand-edited cookie is rejected instead of being
/// trusted.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The hospital API bearer token.
    pub token: String,
    pub role_id: Option<i64>,
    /// Issued At (iat).
    pub iat: u64,
    /// Expiration Time (exp). The cookie is worthless after this instant even
    /// if the browser keeps it.
    pub exp: u64,
}

/// SessionCodec
///
/// Seals a `Session` into a compact HS256 JWT for the session cookie, and opens
/// it again on every request before the guard runs.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl SessionCodec {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.session_secret, config.session_ttl_secs)
    }

    /// seal
    ///
    /// Produces the cookie value for `session`. Sessions without a token seal
    /// to an empty credential, which opens as unauthenticated.
    pub fn seal(&self, session: &Session) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            token: session.token.clone().unwrap_or_default(),
            role_id: session.role_id,
            iat: now.max(0) as u64,
            exp: now.saturating_add(self.ttl_secs).max(0) as u64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// open
    ///
    /// Recovers the session from a cookie value. Any failure (bad signature,
    /// expiry, malformed payload) yields the empty session: the guard then
    /// denies, it never guesses.
    pub fn open(&self, raw: &str) -> Session {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        match decode::<SessionClaims>(raw, &self.decoding_key, &validation) {
            Ok(data) => Session {
                token: Some(data.claims.token).filter(|token| !token.is_empty()),
                role_id: data.claims.role_id,
            },
            Err(e) => {
                tracing::debug!(error = %e, "discarding unreadable session cookie");
                Session::default()
            }
        }
    }
}
