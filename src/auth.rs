use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::convert::Infallible;

use crate::{
    config::{AppConfig, Env},
    models::Session,
    session::SessionCodec,
};

/// Name of the cookie holding the sealed session.
pub const SESSION_COOKIE: &str = "hms_session";

/// Local-only header that impersonates a role without signing in.
pub const DEV_ROLE_HEADER: &str = "x-dev-role";

/// Placeholder credential carried by development bypass sessions.
pub const DEV_BYPASS_TOKEN: &str = "dev-bypass";

/// session_from_request
///
/// Resolves the session a request carries. This is the hydration step that
/// must complete before any guard evaluates.
///
/// 1. Local Bypass: in `Env::Local` a numeric `x-dev-role` header yields a
///    synthetic session with that role. Ignored in production.
/// 2. Cookie: otherwise the sealed `hms_session` cookie is opened. Missing or
///    unreadable cookies give the empty session.
pub fn session_from_request(
    headers: &HeaderMap,
    jar: &CookieJar,
    config: &AppConfig,
    codec: &SessionCodec,
) -> Session {
    if config.env == Env::Local {
        let dev_role = headers
            .get(DEV_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok());
        if let Some(role_id) = dev_role {
            return Session::new(DEV_BYPASS_TOKEN, role_id);
        }
    }

    jar.get(SESSION_COOKIE)
        .map(|cookie| codec.open(cookie.value()))
        .unwrap_or_default()
}

/// BrowserSession Extractor Result
///
/// The session of the browser that sent the request, for handlers outside the
/// route table (session endpoints, API bridge, root redirect). Extraction
/// never rejects: an absent session is a value, and handlers decide.
#[derive(Debug, Clone)]
pub struct BrowserSession(pub Session);

impl<S> FromRequestParts<S> for BrowserSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
    SessionCodec: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let codec = SessionCodec::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        Ok(BrowserSession(session_from_request(
            &parts.headers,
            &jar,
            &config,
            &codec,
        )))
    }
}

/// session_cookie
///
/// The cookie that persists a sealed session across reloads and browser
/// restarts, for as long as the sealed claims live. HTTP-only so page scripts
/// never see the bearer token.
pub fn session_cookie(config: &AppConfig, sealed: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, sealed))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies())
        .max_age(time::Duration::seconds(config.session_ttl_secs))
        .build()
}

/// A removal cookie for `CookieJar::remove`; path must match `session_cookie`.
pub fn session_cookie_removal() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
