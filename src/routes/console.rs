use crate::{
    AppState,
    guard::{GuardState, guard_middleware},
    handlers,
    routes::ROUTE_TABLE,
};
use axum::{
    Router,
    middleware,
    routing::{any, get},
};

/// Console Router Module
///
/// Registers every page of `ROUTE_TABLE`, each behind its own instance of the
/// guard middleware carrying that route's allowed roles. The guard therefore
/// runs on every entry of every page, not once per browser session.
pub fn console_routes(state: &AppState) -> Router<AppState> {
    ROUTE_TABLE
        .iter()
        .fold(Router::new(), |router, route| {
            let guard = GuardState {
                app: state.clone(),
                route,
            };
            router.route(
                route.path,
                get(handlers::render_page)
                    .route_layer(middleware::from_fn_with_state(guard, guard_middleware)),
            )
        })
        // ANY /api/{*path}
        // Authenticated bridge to the hospital REST API. Page components fetch
        // and submit their JSON through here.
        .route("/api/{*path}", any(handlers::proxy_api))
}
