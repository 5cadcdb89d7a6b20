use hms_console::{
    Session, SessionStore,
    navigator::{Navigator, View},
    routes::PublicPage,
};

fn page_of(view: View) -> &'static str {
    match view {
        View::Page(route) => route.page,
        View::Public(page) => page.page(),
    }
}

#[test]
fn test_starts_on_sign_in_without_session() {
    let store = SessionStore::default();
    let navigator = Navigator::new(&store);
    assert_eq!(navigator.location(), "/sign-in");
    assert_eq!(navigator.view(), View::Public(PublicPage::SignIn));
}

#[test]
fn test_starts_on_role_dashboard() {
    let store = SessionStore::new(Session::new("t", 5));
    let navigator = Navigator::new(&store);
    assert_eq!(navigator.location(), "/dashboard/receptionist");
    assert_eq!(page_of(navigator.view()), "receptionist-dashboard");
}

#[test]
fn test_sign_in_then_land_without_return_path() {
    let store = SessionStore::default();
    let mut navigator = Navigator::new(&store);

    // Deep link while signed out: destination is dropped
    navigator.navigate("/visits/12");
    assert_eq!(navigator.location(), "/sign-in");

    store.set_session(Session::new("t", 3));
    navigator.navigate("/");
    assert_eq!(navigator.location(), "/dashboard/doctor");
}

#[test]
fn test_forbidden_route_shows_unauthorized_page() {
    let store = SessionStore::new(Session::new("t", 3));
    let mut navigator = Navigator::new(&store);
    let view = navigator.navigate("/hospitals/new");
    assert_eq!(view, View::Public(PublicPage::Unauthorized));
    assert_eq!(navigator.location(), "/unauthorized");
}

#[test]
fn test_unknown_path_reresolves_through_root() {
    let store = SessionStore::new(Session::new("t", 2));
    let mut navigator = Navigator::new(&store);
    navigator.navigate("/no/such/screen");
    assert_eq!(navigator.location(), "/dashboard/local-admin");
}

#[test]
fn test_unknown_role_at_root_stops_at_sign_in() {
    let store = SessionStore::new(Session::new("t", 8));
    let navigator = Navigator::new(&store);
    assert_eq!(navigator.location(), "/sign-in");
}

#[test]
fn test_refresh_after_expiry_redirects_to_sign_in() {
    let store = SessionStore::new(Session::new("t", 4));
    let mut navigator = Navigator::new(&store);
    navigator.navigate("/visits/3/edit");
    assert_eq!(page_of(navigator.view()), "visit-form");

    // Nothing changed yet
    assert_eq!(navigator.refresh(), None);

    store.clear_session();
    assert_eq!(navigator.refresh(), Some(View::Public(PublicPage::SignIn)));
    assert_eq!(navigator.location(), "/sign-in");
}

#[tokio::test]
async fn test_session_change_is_observed_while_mounted() {
    let store = SessionStore::new(Session::new("t", 1));
    let mut navigator = Navigator::new(&store);
    navigator.navigate("/users");
    assert_eq!(page_of(navigator.view()), "user-list");

    let writer = store.clone();
    tokio::spawn(async move {
        writer.clear_session();
    });

    let view = navigator.session_changed().await;
    assert_eq!(view, Some(View::Public(PublicPage::SignIn)));
}
