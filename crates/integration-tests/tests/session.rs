//! Login, persisted sessions and route guards against the mock backend.

use std::sync::Arc;

use marketplace_client::notify::{Toast, ToastLevel};
use marketplace_client::routes::{Navigation, Route};
use marketplace_client::session::{FileSessionStore, SessionHandle, SessionStore};
use marketplace_client::store::CartAction;
use marketplace_client::users::UserForm;
use marketplace_client::{CartMode, ClientError};
use marketplace_core::{Price, Role};
use marketplace_core::models::Cart;
use marketplace_integration_tests::{MockBackend, StatusCode, TestClient};

fn file_session(dir: &tempfile::TempDir) -> (Arc<FileSessionStore>, SessionHandle) {
    let store = Arc::new(FileSessionStore::new(dir.path().join("session.json")));
    let handle = SessionHandle::restore(Arc::clone(&store) as Arc<dyn SessionStore>)
        .expect("empty store restores");
    (store, handle)
}

#[tokio::test]
async fn test_login_persists_session() {
    let backend = MockBackend::start().await;
    let id = backend.add_user("Salma Idrissi", "salma@example.com", "secret123", "user");
    let dir = tempfile::tempdir().expect("temp dir");
    let (store, session) = file_session(&dir);
    let client = TestClient::new(backend.config(), session, CartMode::Confirmed);

    let user = client
        .app
        .auth()
        .login("salma@example.com", "secret123")
        .await
        .expect("login");

    assert_eq!(user.id.as_str(), id);
    assert_eq!(user.role, Role::Shopper);
    assert_eq!(
        client.toasts.toasts(),
        vec![Toast::success("Welcome, Salma Idrissi")]
    );

    let stored = store.load().expect("readable").expect("saved");
    assert!(stored.token.starts_with("tok-"));

    // A new process picks the session back up
    let restored = SessionHandle::restore(store as Arc<dyn SessionStore>).expect("restore");
    assert_eq!(restored.user(), Some(user));
    let again = TestClient::new(backend.config(), restored, CartMode::Confirmed);
    assert_eq!(
        again.app.navigate("/client/orders"),
        Navigation::Render(Route::ClientOrders)
    );
}

#[tokio::test]
async fn test_wrong_password() {
    let backend = MockBackend::start().await;
    backend.add_user("Salma Idrissi", "salma@example.com", "secret123", "user");
    let client = TestClient::anonymous(&backend);

    let err = client
        .app
        .auth()
        .login("salma@example.com", "wrong-password")
        .await
        .expect_err("rejected");

    assert_eq!(err.http_status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(err.user_message(), "Invalid email or password");
    assert_eq!(client.toasts.toasts(), vec![Toast::error("Login failed")]);
    assert!(!client.app.session().is_authenticated());
}

#[tokio::test]
async fn test_malformed_email_is_not_sent() {
    let backend = MockBackend::start().await;
    let client = TestClient::anonymous(&backend);

    let err = client
        .app
        .auth()
        .login("not-an-email", "secret123")
        .await
        .expect_err("rejected locally");

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_profile_sends_token_set_after_construction() {
    let backend = MockBackend::start().await;
    let id = backend.add_user("Nadia Admin", "admin@example.com", "adminpass", "admin");
    let client = TestClient::anonymous(&backend);

    let token = backend.issue_token(&id);
    client
        .app
        .session()
        .begin(token.clone(), None)
        .expect("in-memory");
    let profile = client.app.auth().profile().await.expect("profile");

    assert_eq!(profile.role, Role::Admin);
    let requests = backend.requests_to("GET /auth/profile");
    assert_eq!(
        requests.first().and_then(|r| r.authorization.clone()),
        Some(format!("Bearer {token}"))
    );
    // The fetched user completes the session
    assert_eq!(client.app.session().user(), Some(profile));
    assert_eq!(
        client.app.navigate("/admin/users"),
        Navigation::Render(Route::AdminUsers)
    );

    client.app.auth().profile().await.expect("cached");
    assert_eq!(backend.requests_to("GET /auth/profile").len(), 1);
}

#[tokio::test]
async fn test_profile_without_session() {
    let backend = MockBackend::start().await;
    let client = TestClient::anonymous(&backend);

    let err = client.app.auth().profile().await.expect_err("logged out");

    assert!(matches!(err, ClientError::NotAuthenticated));
    assert_eq!(err.user_message(), "Please log in");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_register_logs_in() {
    let backend = MockBackend::start().await;
    let client = TestClient::anonymous(&backend);
    let form = UserForm {
        fullname: "Karim Benali".to_string(),
        email: "karim@example.com".to_string(),
        password: "secret123".to_string(),
        role: "seller".to_string(),
    };

    let user = client.app.auth().register(&form).await.expect("register");

    assert_eq!(user.role, Role::Seller);
    assert!(client.app.session().is_authenticated());
    assert_eq!(
        client.app.navigate("/seller"),
        Navigation::Render(Route::SellerDashboard)
    );
    assert_eq!(client.toasts.toasts(), vec![Toast::success("Account created")]);

    let err = client
        .app
        .auth()
        .register(&form)
        .await
        .expect_err("duplicate email");
    assert_eq!(err.user_message(), "User already exists");
    assert_eq!(client.toasts.count(ToastLevel::Error), 1);
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let backend = MockBackend::start().await;
    let id = backend.add_user("Salma Idrissi", "salma@example.com", "secret123", "user");
    let mug = backend.add_product("Ceramic mug", 20.0, None);
    backend.set_cart(&id, &[(&mug, 2)]);
    let dir = tempfile::tempdir().expect("temp dir");
    let (store, session) = file_session(&dir);
    let client = TestClient::new(backend.config(), session, CartMode::Confirmed);

    client
        .app
        .auth()
        .login("salma@example.com", "secret123")
        .await
        .expect("login");
    client.app.start_session().await.expect("cart loads");
    assert_eq!(client.app.cart().snapshot().cart.item_count(), 2);

    client.app.auth().logout().expect("logout");

    assert!(store.load().expect("readable").is_none());
    assert!(!client.app.session().is_authenticated());
    assert!(client.app.cart().snapshot().cart.is_empty());
    assert_eq!(client.app.navigate("/cart"), Navigation::Redirect("/"));
    assert_eq!(client.toasts.toasts().last(), Some(&Toast::success("Logged out")));
}

#[tokio::test]
async fn test_login_resets_previous_user_state() {
    let backend = MockBackend::start().await;
    backend.add_user("Salma Idrissi", "salma@example.com", "secret123", "user");
    let client = TestClient::anonymous(&backend);

    let leftover = Cart {
        total: Price::from_cents(999),
        ..Cart::default()
    };
    client.app.store().cart(CartAction::Loaded(leftover));

    client
        .app
        .auth()
        .login("salma@example.com", "secret123")
        .await
        .expect("login");

    assert_eq!(client.app.cart().snapshot().cart, Cart::default());
}

#[tokio::test]
async fn test_guards_by_role() {
    let backend = MockBackend::start().await;
    let seller = backend.add_user("Youssef Amrani", "youssef@example.com", "sellerpass", "seller");
    let client = TestClient::logged_in(&backend, &seller, CartMode::Confirmed);

    assert_eq!(
        client.app.navigate("/seller"),
        Navigation::Render(Route::SellerDashboard)
    );
    assert_eq!(client.app.navigate("/admin"), Navigation::Redirect("/"));
    assert_eq!(client.app.navigate("/orders/deleted"), Navigation::Redirect("/"));
    assert_eq!(client.app.navigate("/no/such/page"), Navigation::NotFound);
    assert!(backend.requests().is_empty());
}
