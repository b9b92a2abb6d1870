//! Admin and seller screens against the mock backend.

use marketplace_client::notify::{Toast, ToastLevel};
use marketplace_client::users::UserForm;
use marketplace_client::{CartMode, ClientError, ErrorKind};
use marketplace_core::models::{CategoryInput, ProductInput};
use marketplace_core::{CategoryId, FeedbackId, FeedbackStatus, Price, ProductId, Role, UserId};
use marketplace_integration_tests::{MockBackend, PAGE_SIZE, StatusCode, TestClient};

async fn admin_client() -> (MockBackend, TestClient) {
    let backend = MockBackend::start().await;
    let admin = backend.add_user("Nadia Admin", "admin@example.com", "adminpass", "admin");
    let client = TestClient::logged_in(&backend, &admin, CartMode::Confirmed);
    (backend, client)
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_product_list_is_cached_until_a_change() {
    let (backend, client) = admin_client().await;
    backend.add_product("Ceramic mug", 20.0, None);
    let products = client.app.products();

    assert_eq!(products.list(1).await.expect("list").items.len(), 1);
    assert_eq!(products.list(1).await.expect("list").items.len(), 1);
    assert_eq!(backend.requests_to("GET /products").len(), 1);

    let input = ProductInput {
        title: Some("Teapot".to_string()),
        price: Some(Price::from_cents(5550)),
        stock: Some(3),
        ..ProductInput::default()
    };
    let created = products.create(&input).await.expect("create");
    assert_eq!(created.price, Price::from_cents(5550));

    let page = products.list(1).await.expect("list");
    assert_eq!(page.items.len(), 2);
    assert_eq!(backend.requests_to("GET /products").len(), 2);
    assert_eq!(client.toasts.toasts(), vec![Toast::success("Product created")]);
}

#[tokio::test]
async fn test_product_pagination() {
    let (backend, client) = admin_client().await;
    for i in 0..=PAGE_SIZE {
        backend.add_product(&format!("Product {i}"), 10.0, None);
    }

    let page = client.app.products().list(2).await.expect("page 2");

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 2);
    assert!(page.has_previous());
    assert!(!page.has_next());
    let request = backend.requests_to("GET /products");
    assert_eq!(
        request.first().and_then(|r| r.query.as_deref()),
        Some("page=2")
    );
}

#[tokio::test]
async fn test_product_without_title_is_not_sent() {
    let (backend, client) = admin_client().await;
    let input = ProductInput {
        price: Some(Price::from(10_i64)),
        ..ProductInput::default()
    };

    let err = client
        .app
        .products()
        .create(&input)
        .await
        .expect_err("rejected locally");

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(err.kind(), ErrorKind::Local);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_product_update_and_delete() {
    let (backend, client) = admin_client().await;
    let id = backend.add_product("Ceramic mug", 20.0, None);
    let product_id = ProductId::new(&id);
    let products = client.app.products();

    let before = products.get(&product_id).await.expect("get");
    assert_eq!(before.title, "Ceramic mug");

    let patch = ProductInput {
        title: Some("Blue ceramic mug".to_string()),
        ..ProductInput::default()
    };
    products.update(&product_id, &patch).await.expect("update");
    let body = backend
        .requests_to(&format!("PUT /products/{id}"))
        .first()
        .and_then(|r| r.body.clone());
    assert_eq!(body, Some(serde_json::json!({ "title": "Blue ceramic mug" })));

    let after = products.get(&product_id).await.expect("get");
    assert_eq!(after.title, "Blue ceramic mug");
    assert_eq!(after.price, Price::from(20_i64));

    products.delete(&product_id).await.expect("delete");
    assert!(!backend.has_product(&id));
    let err = products.get(&product_id).await.expect_err("gone");
    assert_eq!(err.http_status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_seller_manages_own_products_only() {
    let backend = MockBackend::start().await;
    let seller = backend.add_user("Youssef Amrani", "youssef@example.com", "sellerpass", "seller");
    let own = backend.add_product("Argan oil", 120.0, Some(&seller));
    let foreign = backend.add_product("Ceramic mug", 20.0, None);
    let client = TestClient::logged_in(&backend, &seller, CartMode::Confirmed);
    let products = client.app.products();

    let listed = products
        .by_seller(&UserId::new(&seller))
        .await
        .expect("seller products");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed.first().map(|p| p.id.as_str()), Some(own.as_str()));

    let err = products
        .delete(&ProductId::new(&foreign))
        .await
        .expect_err("not the seller's product");
    assert_eq!(err.http_status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(
        client.toasts.toasts(),
        vec![Toast::error("Cannot delete product: Not your product")]
    );
    assert!(backend.has_product(&foreign));
}

// ============================================================================
// Categories
// ============================================================================

#[tokio::test]
async fn test_category_crud() {
    let (backend, client) = admin_client().await;
    backend.add_category("Kitchen");
    let categories = client.app.categories();

    let page = categories.list(1).await.expect("list");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages, 1);

    let created = categories
        .create(&CategoryInput {
            name: Some("Cosmetics".to_string()),
            description: Some("Oils and soaps".to_string()),
        })
        .await
        .expect("create");
    assert_eq!(created.name, "Cosmetics");

    let renamed = categories
        .update(
            &created.id,
            &CategoryInput {
                name: Some("Beauty".to_string()),
                description: None,
            },
        )
        .await
        .expect("update");
    assert_eq!(renamed.name, "Beauty");
    assert_eq!(renamed.description.as_deref(), Some("Oils and soaps"));

    categories.delete(&created.id).await.expect("delete");
    assert_eq!(categories.list(1).await.expect("list").items.len(), 1);
    assert_eq!(backend.requests_to("GET /categories").len(), 2);
}

#[tokio::test]
async fn test_category_without_name_is_not_sent() {
    let (backend, client) = admin_client().await;

    let err = client
        .app
        .categories()
        .create(&CategoryInput::default())
        .await
        .expect_err("rejected locally");

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(backend.requests().is_empty());
    assert!(client.toasts.toasts().is_empty());
}

#[tokio::test]
async fn test_unknown_category() {
    let (_backend, client) = admin_client().await;

    let err = client
        .app
        .categories()
        .get(&CategoryId::new("missing"))
        .await
        .expect_err("not found");

    assert_eq!(err.user_message(), "Category not found");
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_user_form_validation_sends_nothing() {
    let (backend, client) = admin_client().await;
    let form = UserForm {
        fullname: "Karim Benali".to_string(),
        email: "karim@example.com".to_string(),
        password: "abc".to_string(),
        role: "seller".to_string(),
    };

    let err = client.app.users().create(&form).await.expect_err("too short");

    assert_eq!(
        err.to_string(),
        "Validation failed: password must be at least 6 characters"
    );
    assert!(backend.requests_to("POST /users").is_empty());
}

#[tokio::test]
async fn test_create_user_and_change_role() {
    let (backend, client) = admin_client().await;
    let users = client.app.users();

    assert_eq!(users.list(1).await.expect("list").items.len(), 1);

    let form = UserForm {
        fullname: "Karim Benali".to_string(),
        email: "karim@example.com".to_string(),
        password: "secret123".to_string(),
        role: "user".to_string(),
    };
    let karim = users.create(&form).await.expect("create");
    assert_eq!(karim.role, Role::Shopper);

    let body = backend
        .requests_to("POST /users")
        .first()
        .and_then(|r| r.body.clone());
    assert_eq!(
        body,
        Some(serde_json::json!({
            "fullname": "Karim Benali",
            "email": "karim@example.com",
            "password": "secret123",
            "role": "user",
        }))
    );

    users
        .update_role(&karim.id, Role::Seller)
        .await
        .expect("role");
    assert_eq!(backend.user_role(karim.id.as_str()).as_deref(), Some("seller"));

    let listed = users.list(1).await.expect("list");
    assert_eq!(listed.items.len(), 2);
    assert!(
        listed
            .items
            .iter()
            .any(|u| u.id == karim.id && u.role == Role::Seller)
    );
    assert_eq!(backend.requests_to("GET /users").len(), 2);

    users.delete(&karim.id).await.expect("delete");
    assert_eq!(backend.user_role(karim.id.as_str()), None);
    assert_eq!(client.toasts.count(ToastLevel::Success), 3);
}

#[tokio::test]
async fn test_shopper_cannot_manage_users() {
    let backend = MockBackend::start().await;
    let shopper = backend.add_user("Salma Idrissi", "salma@example.com", "secret123", "user");
    let client = TestClient::logged_in(&backend, &shopper, CartMode::Confirmed);

    let err = client.app.users().list(1).await.expect_err("admin only");

    assert_eq!(err.http_status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(err.kind(), ErrorKind::Client);
}

// ============================================================================
// Feedback and stats
// ============================================================================

#[tokio::test]
async fn test_feedback_moderation() {
    let (backend, client) = admin_client().await;
    let author = backend.add_user("Salma Idrissi", "salma@example.com", "secret123", "user");
    let entry = backend.add_feedback(&author, "The mug arrived chipped");
    let feedback = client.app.feedback();

    let page = feedback.list(1).await.expect("list");
    let first = page.items.first().expect("one entry");
    assert_eq!(first.message, "The mug arrived chipped");
    assert_eq!(first.status, FeedbackStatus::Pending);
    assert_eq!(
        first.author.as_ref().and_then(|a| a.fullname()),
        Some("Salma Idrissi")
    );

    feedback
        .update_status(&FeedbackId::new(&entry), FeedbackStatus::Approved)
        .await
        .expect("approve");
    let page = feedback.list(1).await.expect("list");
    assert_eq!(
        page.items.first().map(|f| f.status),
        Some(FeedbackStatus::Approved)
    );

    feedback
        .delete(&FeedbackId::new(&entry))
        .await
        .expect("delete");
    assert!(feedback.list(1).await.expect("list").items.is_empty());
}

#[tokio::test]
async fn test_seller_stats() {
    let backend = MockBackend::start().await;
    let seller = backend.add_user("Youssef Amrani", "youssef@example.com", "sellerpass", "seller");
    let shopper = backend.add_user("Salma Idrissi", "salma@example.com", "secret123", "user");
    let oil = backend.add_product("Argan oil", 120.0, Some(&seller));
    backend.add_product("Soap", 15.0, Some(&seller));
    backend.add_order(&shopper, &[(&oil, 2)]);
    let client = TestClient::logged_in(&backend, &seller, CartMode::Confirmed);

    let stats = client.app.stats().seller().await.expect("stats");

    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.pending_orders, 1);
    assert_eq!(stats.total_revenue, Price::from(240_i64));

    client.app.stats().seller().await.expect("cached");
    assert_eq!(backend.requests_to("GET /seller/stats").len(), 1);
}
