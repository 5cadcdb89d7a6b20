/// Router Module Index
///
/// Splits the console's HTTP surface by access level, the same way the route
/// table below splits pages by role:
///
/// - `public`: sign-in, unauthorized, the session endpoints and the root redirect.
/// - `console`: every role-gated page from `ROUTE_TABLE` plus the API bridge.
pub mod public;
pub mod console;

use crate::{
    guard::{self, GuardOutcome},
    landing::{self, SIGN_IN_PATH, UNAUTHORIZED_PATH},
    models::{Role, Session},
};

/// RouteDecl
///
/// One entry of the static route table: a path pattern, the page component it
/// mounts, and who may see it. `allowed_roles: None` admits any signed-in user.
#[derive(Debug, PartialEq, Eq)]
pub struct RouteDecl {
    /// Path pattern; `{name}` matches exactly one non-empty segment.
    pub path: &'static str,
    /// Identifier of the external page component.
    pub page: &'static str,
    pub allowed_roles: Option<&'static [Role]>,
}

const GLOBAL_ADMIN: &[Role] = &[Role::GlobalAdmin];
const LOCAL_ADMIN: &[Role] = &[Role::LocalAdmin];
const DOCTOR: &[Role] = &[Role::Doctor];
const NURSE: &[Role] = &[Role::Nurse];
const RECEPTIONIST: &[Role] = &[Role::Receptionist];
const ADMINS: &[Role] = &[Role::GlobalAdmin, Role::LocalAdmin];
const CLINICAL: &[Role] = &[Role::Doctor, Role::Nurse, Role::Receptionist];
const VISIT_INTAKE: &[Role] = &[Role::Nurse, Role::Receptionist];
const VISIT_CHARTING: &[Role] = &[Role::Doctor, Role::Nurse];
const EVERY_ROLE: &[Role] = &Role::ALL;

const fn route(
    path: &'static str,
    page: &'static str,
    allowed_roles: Option<&'static [Role]>,
) -> RouteDecl {
    RouteDecl {
        path,
        page,
        allowed_roles,
    }
}

/// ROUTE_TABLE
///
/// Every role-gated page of the console. Patient and visit pages used to be
/// declared once per clinical role group; they are a single entry here with
/// the union of those roles.
pub static ROUTE_TABLE: &[RouteDecl] = &[
    // --- Dashboards ---
    route("/dashboard/global-admin", "global-admin-dashboard", Some(GLOBAL_ADMIN)),
    route("/dashboard/local-admin", "local-admin-dashboard", Some(LOCAL_ADMIN)),
    route("/dashboard/doctor", "doctor-dashboard", Some(DOCTOR)),
    route("/dashboard/nurse", "nurse-dashboard", Some(NURSE)),
    route("/dashboard/receptionist", "receptionist-dashboard", Some(RECEPTIONIST)),
    // --- Hospitals (global administration) ---
    route("/hospitals", "hospital-list", Some(GLOBAL_ADMIN)),
    route("/hospitals/new", "hospital-form", Some(GLOBAL_ADMIN)),
    route("/hospitals/{id}", "hospital-detail", Some(GLOBAL_ADMIN)),
    route("/hospitals/{id}/edit", "hospital-form", Some(GLOBAL_ADMIN)),
    // --- Branches ---
    route("/branches", "branch-list", Some(ADMINS)),
    route("/branches/new", "branch-form", Some(ADMINS)),
    route("/branches/{id}", "branch-detail", Some(ADMINS)),
    route("/branches/{id}/edit", "branch-form", Some(ADMINS)),
    // --- Staff accounts ---
    route("/users", "user-list", Some(ADMINS)),
    route("/users/new", "user-form", Some(ADMINS)),
    route("/users/{id}", "user-detail", Some(ADMINS)),
    route("/users/{id}/edit", "user-form", Some(ADMINS)),
    // --- Patients ---
    route("/patients", "patient-list", Some(CLINICAL)),
    route("/patients/new", "patient-form", Some(RECEPTIONIST)),
    route("/patients/{id}", "patient-detail", Some(CLINICAL)),
    route("/patients/{id}/edit", "patient-form", Some(RECEPTIONIST)),
    // --- Clinical visits ---
    route("/visits", "visit-list", Some(CLINICAL)),
    route("/visits/new", "visit-form", Some(VISIT_INTAKE)),
    route("/visits/{id}", "visit-detail", Some(CLINICAL)),
    route("/visits/{id}/edit", "visit-form", Some(VISIT_CHARTING)),
    // --- Personal ---
    route("/settings/user", "user-settings", Some(EVERY_ROLE)),
    route("/profile", "profile", None),
];

/// Pages that render without any session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicPage {
    SignIn,
    Unauthorized,
}

impl PublicPage {
    pub fn from_path(path: &str) -> Option<PublicPage> {
        match path {
            SIGN_IN_PATH => Some(PublicPage::SignIn),
            UNAUTHORIZED_PATH => Some(PublicPage::Unauthorized),
            _ => None,
        }
    }

    pub fn page(self) -> &'static str {
        match self {
            PublicPage::SignIn => "sign-in",
            PublicPage::Unauthorized => "unauthorized",
        }
    }
}

/// Decision
///
/// The outcome of entering a path: render something, or go somewhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Public(PublicPage),
    /// The guard authorized this route.
    Render(&'static RouteDecl),
    Redirect(&'static str),
}

/// pattern_matches
///
/// Segment-wise match of a concrete path against a route pattern.
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut expected = pattern.split('/');
    let mut actual = path.split('/');
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return true,
            (Some(p), Some(segment)) => {
                let is_param = p.starts_with('{') && p.ends_with('}');
                if is_param {
                    if segment.is_empty() {
                        return false;
                    }
                } else if p != segment {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// find_route
///
/// Looks a path up in the route table. Literal routes win over parameterized
/// ones, so `/patients/new` never resolves as a patient with id `new`.
pub fn find_route(path: &str) -> Option<&'static RouteDecl> {
    ROUTE_TABLE
        .iter()
        .find(|route| route.path == path)
        .or_else(|| {
            ROUTE_TABLE
                .iter()
                .find(|route| pattern_matches(route.path, path))
        })
}

/// decide
///
/// One navigation step for `path` under `session`: root paths re-resolve to the
/// role's landing page, public pages render, declared routes go through the
/// guard, and anything undeclared bounces to the root.
pub fn decide(path: &str, session: &Session) -> Decision {
    let path = path.split(['?', '#']).next().unwrap_or_default();

    if landing::is_root_path(path) {
        return Decision::Redirect(landing::root_redirect(session));
    }
    if let Some(page) = PublicPage::from_path(path) {
        return Decision::Public(page);
    }
    match find_route(path) {
        Some(route) => match guard::evaluate(session, route.allowed_roles) {
            GuardOutcome::Authorized => Decision::Render(route),
            denied => Decision::Redirect(denied.redirect_target().unwrap_or(SIGN_IN_PATH)),
        },
        None => Decision::Redirect(landing::ROOT_PATH),
    }
}
