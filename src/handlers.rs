use crate::{
    AppState,
    auth::{self, BrowserSession},
    config::AppConfig,
    landing::{self, SIGN_IN_PATH},
    models::{RedirectHint, Session, SessionView, SignInRequest},
    routes::{PublicPage, RouteDecl},
    api::ApiError,
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{OriginalUri, State},
    http::{Method, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;

// --- Page Shell ---

/// page_shell
///
/// The HTML document every console page is served as. The external page bundle
/// mounts the component named by `data-page`; the role is exposed so it can
/// shape navigation menus. Nothing sensitive is embedded.
pub fn page_shell(config: &AppConfig, page: &str, role_id: Option<i64>) -> Html<String> {
    let role = role_id.map(|id| id.to_string()).unwrap_or_default();
    Html(format!(
        "<!doctype html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Hospital Management Console</title>\n\
         <script type=\"module\" src=\"{assets}/console.js\"></script>\n\
         </head>\n\
         <body>\n\
         <div id=\"app\" data-page=\"{page}\" data-role=\"{role}\"></div>\n\
         </body>\n\
         </html>\n",
        assets = config.asset_base_url,
    ))
}

fn redirect_hint(target: &str) -> Json<RedirectHint> {
    Json(RedirectHint {
        redirect: target.to_string(),
    })
}

// --- Handlers ---

/// root_redirect
///
/// [Root Route] Serves `/` and `/dashboard`. Renders nothing; sends the browser
/// to the signed-in role's dashboard, or to sign-in.
pub async fn root_redirect(BrowserSession(session): BrowserSession) -> Redirect {
    Redirect::to(landing::root_redirect(&session))
}

/// [Public Route] The sign-in page.
pub async fn sign_in_page(State(config): State<AppConfig>) -> Html<String> {
    page_shell(&config, PublicPage::SignIn.page(), None)
}

/// [Public Route] Explains to a signed-in user that their role cannot open the page.
pub async fn unauthorized_page(
    State(config): State<AppConfig>,
    BrowserSession(session): BrowserSession,
) -> Html<String> {
    page_shell(&config, PublicPage::Unauthorized.page(), session.role_id)
}

/// sign_out
///
/// [Public Route] Link target of the console's "sign out" action. Clears the
/// session cookie and lands on the sign-in page.
pub async fn sign_out(jar: CookieJar) -> (CookieJar, Redirect) {
    tracing::info!("session signed out");
    (jar.remove(auth::session_cookie_removal()), Redirect::to(SIGN_IN_PATH))
}

/// render_page
///
/// [Guarded Route] Serves the shell for a route-table page. Only reached after
/// `guard_middleware` authorized the request, which also attached the route
/// declaration and session.
pub async fn render_page(
    State(config): State<AppConfig>,
    Extension(route): Extension<&'static RouteDecl>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    page_shell(&config, route.page, session.role_id)
}

/// fallback
///
/// Undeclared paths go back to the root, which re-resolves the destination.
pub async fn fallback() -> Redirect {
    Redirect::to(landing::ROOT_PATH)
}

/// create_session
///
/// [Public Route] Signs in against the hospital API. On success the session is
/// sealed into the session cookie and the caller learns where to land.
#[utoipa::path(
    post,
    path = "/session",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionView),
        (status = 401, description = "Credentials rejected"),
        (status = 502, description = "Hospital API unavailable")
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SessionView>), StatusCode> {
    let session = match state.api.sign_in(&credentials).await {
        Ok(session) if session.is_authenticated() => session,
        Ok(_) => {
            tracing::warn!("hospital API issued a session without a token");
            return Err(StatusCode::BAD_GATEWAY);
        }
        Err(e) => {
            tracing::info!(error = %e, "sign-in failed");
            return Err(e.status_code());
        }
    };

    let sealed = state.codec.seal(&session).map_err(|e| {
        tracing::error!(error = %e, "failed to seal session");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    tracing::info!(role_id = ?session.role_id, "session created");

    let view = SessionView {
        role_id: session.role_id,
        landing: landing::resolve_landing(session.role_id).to_string(),
    };
    Ok((jar.add(auth::session_cookie(&state.config, sealed)), Json(view)))
}

/// get_session
///
/// [Cookie Route] Reports the current session's role and landing page.
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Current session", body = SessionView),
        (status = 401, description = "No session")
    )
)]
pub async fn get_session(
    BrowserSession(session): BrowserSession,
) -> Result<Json<SessionView>, StatusCode> {
    if !session.is_authenticated() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(SessionView {
        role_id: session.role_id,
        landing: landing::resolve_landing(session.role_id).to_string(),
    }))
}

/// delete_session
///
/// [Cookie Route] Signs out from a page component. Idempotent.
#[utoipa::path(
    delete,
    path = "/session",
    responses((status = 200, description = "Signed out", body = RedirectHint))
)]
pub async fn delete_session(jar: CookieJar) -> (CookieJar, Json<RedirectHint>) {
    tracing::info!("session signed out");
    (jar.remove(auth::session_cookie_removal()), redirect_hint(SIGN_IN_PATH))
}

/// upstream_target
///
/// The hospital API path for a bridged request: the raw, still percent-encoded
/// remainder after `/api/`, with the raw query appended. Dot segments are
/// refused even when spelled with `%2e` or hidden behind an encoded `%2f`, so
/// neither URL parsing here nor decoding upstream can step outside the API base.
pub fn upstream_target(uri: &Uri) -> Option<String> {
    let path = uri.path().strip_prefix("/api/")?;
    if path.is_empty() {
        return None;
    }
    let decoded = path
        .to_ascii_lowercase()
        .replace("%2f", "/")
        .replace("%2e", ".");
    let has_dot_segment = decoded
        .split('/')
        .any(|segment| segment == "." || segment == "..");
    if has_dot_segment {
        return None;
    }
    Some(match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    })
}

/// proxy_api
///
/// [Authenticated Route] Bridges page components to the hospital API. The
/// bearer token is taken from the session cookie so it never reaches page
/// scripts. When the API reports the credential as invalid, the session is
/// cleared before answering, so the next navigation is guarded as signed out.
#[utoipa::path(
    get,
    path = "/api/{path}",
    params(("path" = String, Path, description = "Hospital API path")),
    request_body = Vec<u8>,
    responses(
        (status = 200, description = "Hospital API response body"),
        (status = 401, description = "Session missing or invalidated", body = RedirectHint)
    )
)]
pub async fn proxy_api(
    State(state): State<AppState>,
    BrowserSession(session): BrowserSession,
    jar: CookieJar,
    method: Method,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Response {
    let Some(token) = session.token.as_deref().filter(|token| !token.is_empty()) else {
        return (StatusCode::UNAUTHORIZED, redirect_hint(SIGN_IN_PATH)).into_response();
    };

    let payload = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(_) => return StatusCode::BAD_REQUEST.into_response(),
        }
    };

    let Some(target) = upstream_target(&uri) else {
        tracing::warn!(uri = %uri, "refusing to forward API path");
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.api.call(method, &target, token, payload).await {
        Ok(value) => Json(value).into_response(),
        Err(ApiError::Unauthorized) => {
            tracing::info!(path = %target, "hospital API invalidated the session");
            (
                StatusCode::UNAUTHORIZED,
                jar.remove(auth::session_cookie_removal()),
                redirect_hint(SIGN_IN_PATH),
            )
                .into_response()
        }
        Err(ApiError::Rejected { status, body }) => {
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (code, Json(body)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %target, "hospital API call failed");
            e.status_code().into_response()
        }
    }
}
