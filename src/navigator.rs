use tokio::sync::watch;

use crate::{
    landing::{ROOT_PATH, SIGN_IN_PATH},
    models::Session,
    routes::{self, Decision, PublicPage, RouteDecl},
    session::SessionStore,
};

/// Redirect chains are at most root → landing → guard; anything longer is a
/// misconfigured table and ends on the sign-in page.
const MAX_REDIRECTS: usize = 8;

/// View
///
/// What is on screen after a navigation settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Public(PublicPage),
    Page(&'static RouteDecl),
}

/// Navigator
///
/// In-process counterpart of the browser router. Every `navigate` call is a
/// route entry and runs the full decision chain; `refresh` re-runs it for the
/// current location after the session store changed.
pub struct Navigator {
    receiver: watch::Receiver<Session>,
    location: String,
    view: View,
}

impl Navigator {
    /// Mounts the navigator on `store` and enters the root.
    pub fn new(store: &SessionStore) -> Self {
        let mut navigator = Self {
            receiver: store.subscribe(),
            location: ROOT_PATH.to_string(),
            view: View::Public(PublicPage::SignIn),
        };
        navigator.navigate(ROOT_PATH);
        navigator
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// navigate
    ///
    /// Enters `path`, following redirects until something renders. The
    /// original destination is not remembered across a sign-in redirect.
    pub fn navigate(&mut self, path: &str) -> View {
        let session = self.receiver.borrow_and_update().clone();
        let mut target = path.to_string();

        for _ in 0..MAX_REDIRECTS {
            match routes::decide(&target, &session) {
                Decision::Public(page) => return self.settle(target, View::Public(page)),
                Decision::Render(route) => return self.settle(target, View::Page(route)),
                Decision::Redirect(next) => {
                    tracing::debug!(from = %target, to = next, "navigation redirected");
                    target = next.to_string();
                }
            }
        }

        tracing::warn!(requested = %path, "redirect chain too long, falling back to sign-in");
        self.settle(SIGN_IN_PATH.to_string(), View::Public(PublicPage::SignIn))
    }

    /// refresh
    ///
    /// Re-enters the current location if the session changed since the last
    /// navigation. Returns the new view, or `None` when nothing changed.
    pub fn refresh(&mut self) -> Option<View> {
        if !self.receiver.has_changed().unwrap_or(false) {
            return None;
        }
        let location = self.location.clone();
        Some(self.navigate(&location))
    }

    /// session_changed
    ///
    /// Waits for the next session write, then re-enters the current location.
    pub async fn session_changed(&mut self) -> Option<View> {
        self.receiver.changed().await.ok()?;
        let location = self.location.clone();
        Some(self.navigate(&location))
    }

    fn settle(&mut self, location: String, view: View) -> View {
        self.location = location;
        self.view = view;
        view
    }
}
