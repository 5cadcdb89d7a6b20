use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access-controlled routing core.
pub mod guard;
pub mod landing;
pub mod models;
pub mod navigator;
pub mod session;

// HTTP host and collaborators.
pub mod api;
pub mod auth;
pub mod config;
pub mod handlers;

// Module for routing segregation (Public, Console).
pub mod routes;
use routes::{console, public};

// --- Public Re-exports ---

pub use api::{ApiClient, ApiState, HttpApiClient, MockApiClient};
pub use config::AppConfig;
pub use guard::{GuardOutcome, evaluate};
pub use landing::resolve_landing;
pub use models::{Role, Session};
pub use session::{SessionCodec, SessionStore};

/// ApiDoc
///
/// OpenAPI document for the console's JSON endpoints, served at
/// `/api-docs/openapi.json`. Page routes return HTML and are not listed.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session, handlers::get_session, handlers::delete_session,
        handlers::proxy_api
    ),
    components(
        schemas(models::SignInRequest, models::SessionView, models::RedirectHint)
    ),
    tags(
        (name = "hms-console", description = "Hospital Management Console API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for everything a request may need. Cheap to
/// clone; nothing in it is mutable after start-up.
#[derive(Clone)]
pub struct AppState {
    /// Client for the hospital REST API.
    pub api: ApiState,
    /// Seals and opens the session cookie.
    pub codec: SessionCodec,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, api: ApiState) -> Self {
        Self {
            api,
            codec: SessionCodec::from_config(&config),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionCodec {
    fn from_ref(app_state: &AppState) -> SessionCodec {
        app_state.codec.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the console: public routes, the guarded route table, the API
/// bridge and the redirect-to-root fallback, wrapped in the observability stack.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Every route-table page carries its own guard layer.
        .merge(console::console_routes(&state))
        // Undeclared paths re-resolve through the root.
        .fallback(handlers::fallback)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis)
                        )
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: every log line of a request carries its
/// method, URI and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
