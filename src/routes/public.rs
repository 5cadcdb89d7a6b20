use crate::{AppState, handlers, landing};
use axum::{
    Router,
    routing::get,
};

/// Public Router Module
///
/// Endpoints reachable without a session. Nothing here is guarded by the route
/// table; handlers that care about the session read it through `BrowserSession`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET / and GET /dashboard
        // Root redirect: re-resolves the signed-in role's landing page on every visit.
        .route(landing::ROOT_PATH, get(handlers::root_redirect))
        .route(landing::OVERVIEW_PATH, get(handlers::root_redirect))
        // GET /sign-in
        .route(landing::SIGN_IN_PATH, get(handlers::sign_in_page))
        // GET /unauthorized
        // Target of every FORBIDDEN guard outcome.
        .route(landing::UNAUTHORIZED_PATH, get(handlers::unauthorized_page))
        // GET /sign-out
        .route(landing::SIGN_OUT_PATH, get(handlers::sign_out))
        // POST/GET/DELETE /session
        // JSON session API used by the sign-in page and page components.
        .route(
            "/session",
            get(handlers::get_session)
                .post(handlers::create_session)
                .delete(handlers::delete_session),
        )
}
