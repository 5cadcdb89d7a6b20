use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tokio::sync::watch;

use crate::{
    AppState,
    auth,
    landing::{SIGN_IN_PATH, UNAUTHORIZED_PATH},
    models::{Role, Session},
    routes::RouteDecl,
    session::SessionStore,
};

/// GuardOutcome
///
/// The three things that can happen when a guarded route is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// No usable credential. Redirects to sign-in and forgets the destination.
    Unauthenticated,
    /// Signed in, but the role is not on the route's list.
    Forbidden,
    Authorized,
}

impl GuardOutcome {
    /// Where a denied navigation is sent. `None` means render.
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            GuardOutcome::Unauthenticated => Some(SIGN_IN_PATH),
            GuardOutcome::Forbidden => Some(UNAUTHORIZED_PATH),
            GuardOutcome::Authorized => None,
        }
    }
}

/// evaluate
///
/// The guard's transition function. Total and pure: it fails closed whenever
/// role membership cannot be established, including roles outside the known set.
pub fn evaluate(session: &Session, allowed_roles: Option<&[Role]>) -> GuardOutcome {
    if !session.is_authenticated() {
        return GuardOutcome::Unauthenticated;
    }
    match allowed_roles {
        None => GuardOutcome::Authorized,
        Some(allowed) => match session.role() {
            Some(role) if allowed.contains(&role) => GuardOutcome::Authorized,
            _ => GuardOutcome::Forbidden,
        },
    }
}

/// MountedGuard
///
/// A guard attached to a route that is currently on screen. It subscribes to
/// the session store, so a sign-out or a server-forced expiry is observed on
/// the next evaluation without polling.
pub struct MountedGuard {
    route: &'static RouteDecl,
    receiver: watch::Receiver<Session>,
}

impl MountedGuard {
    pub fn mount(store: &SessionStore, route: &'static RouteDecl) -> Self {
        Self {
            route,
            receiver: store.subscribe(),
        }
    }

    pub fn route(&self) -> &'static RouteDecl {
        self.route
    }

    /// Evaluates against the latest session and marks it as seen.
    pub fn outcome(&mut self) -> GuardOutcome {
        let session = self.receiver.borrow_and_update();
        evaluate(&session, self.route.allowed_roles)
    }

    /// Whether the session changed since the last evaluation.
    pub fn is_stale(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// changed
    ///
    /// Waits for the next session write and re-evaluates. Returns `None` once
    /// the store has been dropped.
    pub async fn changed(&mut self) -> Option<GuardOutcome> {
        self.receiver.changed().await.ok()?;
        Some(self.outcome())
    }
}

/// GuardState
///
/// Per-route middleware state: the shared application state plus the route
/// declaration this instance of the guard protects.
#[derive(Clone)]
pub struct GuardState {
    pub app: AppState,
    pub route: &'static RouteDecl,
}

/// guard_middleware
///
/// Applied to every route of the route table. Opens the request's session
/// cookie, evaluates the guard and either redirects or hands the request on
/// with the session and route declaration attached as extensions.
pub async fn guard_middleware(
    State(guard): State<GuardState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = auth::session_from_request(
        request.headers(),
        &jar,
        &guard.app.config,
        &guard.app.codec,
    );
    let outcome = evaluate(&session, guard.route.allowed_roles);

    tracing::debug!(
        path = %request.uri().path(),
        route = guard.route.path,
        role_id = ?session.role_id,
        ?outcome,
        "guard evaluated"
    );

    match outcome.redirect_target() {
        Some(target) => Redirect::to(target).into_response(),
        None => {
            request.extensions_mut().insert(session);
            request.extensions_mut().insert(guard.route);
            next.run(request).await
        }
    }
}
