use crate::models::{Role, Session};

// --- Well-Known Paths ---

pub const ROOT_PATH: &str = "/";
/// Alias of the root that also re-resolves to the role's dashboard.
pub const OVERVIEW_PATH: &str = "/dashboard";
pub const SIGN_IN_PATH: &str = "/sign-in";
pub const SIGN_OUT_PATH: &str = "/sign-out";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// resolve_landing
///
/// Maps a role identifier to the dashboard a user lands on after signing in or
/// when revisiting the root. Unknown or absent identifiers resolve to the
/// sign-in page rather than a guessed destination.
pub fn resolve_landing(role_id: Option<i64>) -> &'static str {
    match role_id.and_then(Role::from_id) {
        Some(Role::GlobalAdmin) => "/dashboard/global-admin",
        Some(Role::LocalAdmin) => "/dashboard/local-admin",
        Some(Role::Doctor) => "/dashboard/doctor",
        Some(Role::Nurse) => "/dashboard/nurse",
        Some(Role::Receptionist) => "/dashboard/receptionist",
        None => SIGN_IN_PATH,
    }
}

/// root_redirect
///
/// The single redirect decision made on `/` and `/dashboard`. A session without
/// a credential goes to sign-in even if it still carries a role.
pub fn root_redirect(session: &Session) -> &'static str {
    if !session.is_authenticated() {
        return SIGN_IN_PATH;
    }
    resolve_landing(session.role_id)
}

pub fn is_root_path(path: &str) -> bool {
    path == ROOT_PATH || path == OVERVIEW_PATH
}
