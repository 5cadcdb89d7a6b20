use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Access Model ---

/// Role
///
/// The closed set of permission classes a console user can hold. The numeric
/// identifiers are assigned by the hospital API and are stable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    GlobalAdmin = 1,
    LocalAdmin = 2,
    Doctor = 3,
    Nurse = 4,
    Receptionist = 5,
}

impl Role {
    /// Every role, in identifier order.
    pub const ALL: [Role; 5] = [
        Role::GlobalAdmin,
        Role::LocalAdmin,
        Role::Doctor,
        Role::Nurse,
        Role::Receptionist,
    ];

    /// from_id
    ///
    /// Maps a wire identifier to a role. Anything outside `1..=5` is unknown
    /// and yields `None`; callers must treat that as "no role".
    pub fn from_id(id: i64) -> Option<Role> {
        match id {
            1 => Some(Role::GlobalAdmin),
            2 => Some(Role::LocalAdmin),
            3 => Some(Role::Doctor),
            4 => Some(Role::Nurse),
            5 => Some(Role::Receptionist),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        self as i64
    }
}

/// Session
///
/// The client-held record of who is signed in. A session is authenticated
/// only when `token` is present and non-empty; `role_id` on its own grants
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Session {
    /// Bearer credential issued by the hospital API.
    pub token: Option<String>,
    /// Raw role identifier as issued; may be outside the known set.
    pub role_id: Option<i64>,
}

impl Session {
    pub fn new(token: impl Into<String>, role_id: i64) -> Self {
        Self {
            token: Some(token.into()),
            role_id: Some(role_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|token| !token.is_empty())
    }

    /// The session's role, if the identifier is one of the known roles.
    pub fn role(&self) -> Option<Role> {
        self.role_id.and_then(Role::from_id)
    }
}

// --- Request Payloads (Input Schemas) ---

/// SignInRequest
///
/// Credentials posted by the sign-in page (POST /session). They are forwarded
/// verbatim to the hospital API and never stored by the console.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// SignInResponse
///
/// The hospital API's answer to a successful sign-in. Older API builds name the
/// fields `access_token` and `role`, both spellings are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(alias = "role")]
    pub role_id: Option<i64>,
}

impl From<SignInResponse> for Session {
    fn from(response: SignInResponse) -> Self {
        Session {
            token: Some(response.token),
            role_id: response.role_id,
        }
    }
}

// --- Response Payloads (Output Schemas) ---

/// SessionView
///
/// What the browser is allowed to know about its session: the role and the
/// dashboard it should land on. The bearer token never leaves the cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionView {
    pub role_id: Option<i64>,
    pub landing: String,
}

/// RedirectHint
///
/// Returned by JSON endpoints when the page component should navigate away,
/// typically back to the sign-in page after the session was invalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RedirectHint {
    pub redirect: String,
}
