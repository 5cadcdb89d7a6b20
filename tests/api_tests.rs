use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use hms_console::{
    ApiClient, AppConfig, AppState, MockApiClient, Session, SessionCodec, create_router,
    api::ApiError,
    auth::SESSION_COOKIE,
    config::Env,
    models::{RedirectHint, SessionView, SignInRequest},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

// --- Helpers ---

/// Router in production mode so the development bypass cannot interfere.
fn app_with(api: MockApiClient) -> (Router, SessionCodec) {
    let config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let state = AppState::new(config, Arc::new(api));
    let codec = state.codec.clone();
    (create_router(state), codec)
}

fn cookie_for(codec: &SessionCodec, session: &Session) -> String {
    format!("{}={}", SESSION_COOKIE, codec.seal(session).unwrap())
}

async fn get(app: Router, uri: &str, cookie: Option<String>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

fn set_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// --- Public Surface ---

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app_with(MockApiClient::new());
    let response = get(app, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_sign_in_page_is_public() {
    let (app, _) = app_with(MockApiClient::new());
    let response = get(app, "/sign-in", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("data-page=\"sign-in\""));
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let (app, _) = app_with(MockApiClient::new());
    let response = get(app, "/health", None).await;
    assert!(response.headers().contains_key("x-request-id"));
}

// --- Guarded Pages ---

#[tokio::test]
async fn test_protected_page_without_cookie_redirects_to_sign_in() {
    let (app, _) = app_with(MockApiClient::new());
    let response = get(app, "/patients", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/sign-in");
}

#[tokio::test]
async fn test_wrong_role_redirects_to_unauthorized() {
    let (app, codec) = app_with(MockApiClient::new());
    let cookie = cookie_for(&codec, &Session::new("t", 3));
    let response = get(app, "/branches/4", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/unauthorized");
}

#[tokio::test]
async fn test_authorized_page_renders_shell() {
    let (app, codec) = app_with(MockApiClient::new());
    let cookie = cookie_for(&codec, &Session::new("t", 4));
    let response = get(app, "/visits/7/edit", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("data-page=\"visit-form\""));
    assert!(html.contains("data-role=\"4\""));
    // The bearer token stays in the cookie
    assert!(!html.contains("\"t\""));
}

#[tokio::test]
async fn test_tampered_cookie_fails_closed() {
    let (app, codec) = app_with(MockApiClient::new());
    let mut cookie = cookie_for(&codec, &Session::new("t", 1));
    cookie.push('x');
    let response = get(app, "/hospitals", Some(cookie)).await;
    assert_eq!(location(&response), "/sign-in");
}

#[tokio::test]
async fn test_foreign_secret_cookie_fails_closed() {
    let (app, _) = app_with(MockApiClient::new());
    let foreign = SessionCodec::new("someone-elses-secret", 3600);
    let cookie = cookie_for(&foreign, &Session::new("t", 1));
    let response = get(app, "/hospitals", Some(cookie)).await;
    assert_eq!(location(&response), "/sign-in");
}

#[tokio::test]
async fn test_dev_role_header_ignored_in_production() {
    let (app, _) = app_with(MockApiClient::new());
    let request = Request::builder()
        .uri("/hospitals")
        .header("x-dev-role", "1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(location(&response), "/sign-in");
}

#[tokio::test]
async fn test_dev_role_header_works_locally() {
    let state = AppState::new(AppConfig::default(), Arc::new(MockApiClient::new()));
    let app = create_router(state);
    let request = Request::builder()
        .uri("/hospitals")
        .header("x-dev-role", "1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// --- Root Redirect & Fallback ---

#[tokio::test]
async fn test_root_redirects_to_role_dashboard() {
    let (app, codec) = app_with(MockApiClient::new());
    let cookie = cookie_for(&codec, &Session::new("t", 4));
    let response = get(app, "/", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/nurse");
}

#[tokio::test]
async fn test_root_without_session_redirects_to_sign_in() {
    let (app, _) = app_with(MockApiClient::new());
    let response = get(app, "/dashboard", None).await;
    assert_eq!(location(&response), "/sign-in");
}

#[tokio::test]
async fn test_unknown_path_redirects_to_root() {
    let (app, codec) = app_with(MockApiClient::new());
    let cookie = cookie_for(&codec, &Session::new("t", 1));
    let response = get(app, "/pharmacy/stock", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

// --- Session API ---

async fn post_sign_in(app: Router) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/session")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "doc@hospital.test", "password": "pw" }).to_string(),
        ))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_sign_in_sets_cookie_and_returns_landing() {
    let (app, _) = app_with(MockApiClient::signing_in_as(3));
    let response = post_sign_in(app).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(&response);
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    // Survives a browser restart for the configured lifetime
    assert!(cookie.contains(&format!("Max-Age={}", AppConfig::default().session_ttl_secs)));

    let view: SessionView = body_json(response).await;
    assert_eq!(view.role_id, Some(3));
    assert_eq!(view.landing, "/dashboard/doctor");
}

#[tokio::test]
async fn test_sign_in_cookie_opens_guarded_pages() {
    let (app, _) = app_with(MockApiClient::signing_in_as(1));
    let response = post_sign_in(app.clone()).await;
    let cookie = set_cookie(&response);
    let pair = cookie.split(';').next().unwrap().to_string();

    let page = get(app, "/dashboard/global-admin", Some(pair)).await;
    assert_eq!(page.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rejected_credentials_are_unauthorized() {
    let (app, _) = app_with(MockApiClient::new());
    let response = post_sign_in(app).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response).is_empty());
}

#[tokio::test]
async fn test_unreachable_api_is_bad_gateway() {
    let (app, _) = app_with(MockApiClient::down());
    let response = post_sign_in(app).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_get_session_reports_role() {
    let (app, codec) = app_with(MockApiClient::new());
    let cookie = cookie_for(&codec, &Session::new("t", 2));
    let response = get(app.clone(), "/session", Some(cookie)).await;
    let view: SessionView = body_json(response).await;
    assert_eq!(view.landing, "/dashboard/local-admin");

    let anonymous = get(app, "/session", None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_session_clears_cookie() {
    let (app, codec) = app_with(MockApiClient::new());
    let request = Request::builder()
        .method("DELETE")
        .uri("/session")
        .header(header::COOKIE, cookie_for(&codec, &Session::new("t", 2)))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).starts_with(&format!("{SESSION_COOKIE}=;")));
    let hint: RedirectHint = body_json(response).await;
    assert_eq!(hint.redirect, "/sign-in");
}

#[tokio::test]
async fn test_sign_out_link_redirects() {
    let (app, codec) = app_with(MockApiClient::new());
    let cookie = cookie_for(&codec, &Session::new("t", 5));
    let response = get(app, "/sign-out", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/sign-in");
    assert!(!set_cookie(&response).is_empty());
}

// --- Hospital API Bridge ---

#[tokio::test]
async fn test_proxy_requires_session() {
    let (app, _) = app_with(MockApiClient::new());
    let response = get(app, "/api/patients", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let hint: RedirectHint = body_json(response).await;
    assert_eq!(hint.redirect, "/sign-in");
}

#[tokio::test]
async fn test_proxy_returns_api_payload() {
    let payload = json!([{ "id": 1, "name": "Ada" }]);
    let (app, codec) = app_with(MockApiClient::new().with_payload(payload.clone()));
    let cookie = cookie_for(&codec, &Session::new("t", 3));
    let response = get(app, "/api/patients?search=ad", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body, payload);
}

#[tokio::test]
async fn test_proxy_clears_session_when_api_rejects_token() {
    let (app, codec) = app_with(MockApiClient::new().expiring());
    let cookie = cookie_for(&codec, &Session::new("t", 3));
    let response = get(app, "/api/patients", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response).starts_with(&format!("{SESSION_COOKIE}=;")));
    let hint: RedirectHint = body_json(response).await;
    assert_eq!(hint.redirect, "/sign-in");
}

#[tokio::test]
async fn test_proxy_rejects_malformed_json() {
    let (app, codec) = app_with(MockApiClient::new());
    let request = Request::builder()
        .method("POST")
        .uri("/api/patients")
        .header(header::COOKIE, cookie_for(&codec, &Session::new("t", 5)))
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}


/// Remembers every path the bridge asks the hospital API for.
#[derive(Default)]
struct RecordingApiClient {
    paths: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ApiClient for RecordingApiClient {
    async fn sign_in(&self, _credentials: &SignInRequest) -> Result<Session, ApiError> {
        Err(ApiError::Unauthorized)
    }

    async fn call(
        &self,
        _method: Method,
        path: &str,
        _token: &str,
        _body: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.paths.lock().unwrap().push(path.to_string());
        Ok(Value::Null)
    }
}

async fn forwarded_path(uri: &str) -> (StatusCode, Vec<String>) {
    let client = RecordingApiClient::default();
    let paths = client.paths.clone();
    let config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let state = AppState::new(config, Arc::new(client));
    let cookie = cookie_for(&state.codec, &Session::new("t", 3));
    let response = get(create_router(state), uri, Some(cookie)).await;
    let recorded = paths.lock().unwrap().clone();
    (response.status(), recorded)
}

#[tokio::test]
async fn test_proxy_forwards_query_string() {
    let (status, paths) = forwarded_path("/api/patients?search=ad").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paths, vec!["patients?search=ad".to_string()]);
}

#[tokio::test]
async fn test_proxy_keeps_encoded_slash_inside_segment() {
    let (status, paths) = forwarded_path("/api/patients/A%2FB").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paths, vec!["patients/A%2FB".to_string()]);
}

#[tokio::test]
async fn test_proxy_keeps_encoded_question_mark_in_path() {
    let (status, paths) = forwarded_path("/api/patients%3Fall=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paths, vec!["patients%3Fall=1".to_string()]);
}

#[tokio::test]
async fn test_proxy_refuses_encoded_traversal() {
    let (status, paths) = forwarded_path("/api/x%2F..%2F..%2Fadmin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(paths.is_empty());
}

#[tokio::test]
async fn test_proxy_refuses_dot_segments() {
    let (status, paths) = forwarded_path("/api/x/%2e%2e/admin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(paths.is_empty());
}
