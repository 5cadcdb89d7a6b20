use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Session, SignInRequest, SignInResponse};

/// ApiError
///
/// Failures of the hospital REST API, as seen by the console. `Unauthorized`
/// is special: it means the session's credential is no longer valid and the
/// session must be cleared.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("hospital API rejected the credential")]
    Unauthorized,
    #[error("hospital API answered {status}")]
    Rejected { status: u16, body: Value },
    #[error("hospital API unreachable: {0}")]
    Transport(String),
    #[error("unexpected response from hospital API: {0}")]
    Decode(String),
}

impl ApiError {
    /// The status the console forwards to the browser for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Rejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Transport(_) | ApiError::Decode(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

// 1. ApiClient Contract
/// ApiClient
///
/// The console's only view of the hospital REST API. The real client talks
/// HTTP; `MockApiClient` stands in for it in tests.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Exchanges credentials for a session. Rejected credentials are
    /// `ApiError::Unauthorized`.
    async fn sign_in(&self, credentials: &SignInRequest) -> Result<Session, ApiError>;

    /// Performs an authenticated JSON call. `path` is relative to the API base
    /// and may carry a query string. Empty response bodies come back as `Null`.
    async fn call(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;
}

/// ApiState
///
/// The concrete type used to share the API client across the application state.
pub type ApiState = Arc<dyn ApiClient>;

// 2. The Real Implementation
/// HttpApiClient
///
/// `reqwest`-backed client for the hospital REST API.
#[derive(Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn sign_in(&self, credentials: &SignInRequest) -> Result<Session, ApiError> {
        let response = self
            .client
            .post(self.url("auth/sign-in"))
            .json(credentials)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
            status if !status.is_success() => Err(ApiError::Rejected {
                status: status.as_u16(),
                body: Self::read_json(response).await.unwrap_or(Value::Null),
            }),
            _ => {
                let body = Self::read_json(response).await?;
                let signed_in: SignInResponse =
                    serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
                Ok(Session::from(signed_in))
            }
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                body: Self::read_json(response).await.unwrap_or(Value::Null),
            });
        }
        Self::read_json(response).await
    }
}

// 3. The Mock Implementation (For Tests)
/// MockApiClient
///
/// Deterministic stand-in for the hospital API. Records nothing; behaviour is
/// configured through its fields.
#[derive(Clone, Default)]
pub struct MockApiClient {
    /// Session handed out by `sign_in`; `None` rejects every credential.
    pub issued_session: Option<Session>,
    /// When true, every authenticated call reports an expired credential.
    pub expired: bool,
    /// When true, every operation fails as if the API were down.
    pub unreachable: bool,
    /// Payload returned by successful calls.
    pub payload: Value,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signing_in_as(role_id: i64) -> Self {
        Self {
            issued_session: Some(Session::new(format!("mock-token-{role_id}"), role_id)),
            ..Self::default()
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn expiring(mut self) -> Self {
        self.expired = true;
        self
    }

    pub fn down() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn sign_in(&self, _credentials: &SignInRequest) -> Result<Session, ApiError> {
        if self.unreachable {
            return Err(ApiError::Transport("mock API is down".to_string()));
        }
        self.issued_session.clone().ok_or(ApiError::Unauthorized)
    }

    async fn call(
        &self,
        _method: Method,
        _path: &str,
        _token: &str,
        _body: Option<Value>,
    ) -> Result<Value, ApiError> {
        if self.unreachable {
            return Err(ApiError::Transport("mock API is down".to_string()));
        }
        if self.expired {
            return Err(ApiError::Unauthorized);
        }
        Ok(self.payload.clone())
    }
}
