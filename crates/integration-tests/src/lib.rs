//! End-to-end tests for the marketplace client.
//!
//! [`MockBackend`] serves the REST API in-process on an ephemeral port with
//! in-memory data. It records every request and lets a test inject failures
//! and response delays per route, keyed as `"PUT /cart"` (path relative to
//! the `/api` prefix).
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use marketplace_client::notify::{Notifier, RecordingNotifier};
use marketplace_client::session::SessionHandle;
use marketplace_client::{CartMode, ClientConfig, Marketplace};
use marketplace_core::models::User;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use axum::http::StatusCode;

/// Page size of every paginated list.
pub const PAGE_SIZE: usize = 10;

/// Base URL nothing listens on, for network failures.
pub const UNREACHABLE_API_URL: &str = "http://127.0.0.1:1/api";

// ============================================================================
// Request log
// ============================================================================

/// One request as received by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path without the `/api` prefix.
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub cache_control: Option<String>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// `"METHOD /path"`, the key used for failures and delays.
    #[must_use]
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

// ============================================================================
// In-memory data
// ============================================================================

#[derive(Debug, Clone)]
struct UserRecord {
    id: String,
    fullname: String,
    email: String,
    password: String,
    role: String,
}

impl UserRecord {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "fullname": self.fullname,
            "email": self.email,
            "role": self.role,
        })
    }

    fn summary(&self) -> Value {
        json!({ "_id": self.id, "fullname": self.fullname, "email": self.email })
    }
}

#[derive(Debug, Clone)]
struct ProductRecord {
    id: String,
    title: String,
    description: Option<String>,
    price: f64,
    stock: u32,
    seller: Option<String>,
    category: Option<String>,
}

impl ProductRecord {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "title": self.title,
            "description": self.description,
            "price": self.price,
            "stock": self.stock,
            "sellerId": self.seller,
            "category": self.category,
        })
    }

    fn apply(&mut self, fields: &Value) {
        if let Some(title) = fields.get("title").and_then(Value::as_str) {
            title.clone_into(&mut self.title);
        }
        if let Some(description) = fields.get("description").and_then(Value::as_str) {
            self.description = Some(description.to_owned());
        }
        if let Some(price) = fields.get("price").and_then(Value::as_f64) {
            self.price = price;
        }
        if let Some(stock) = fields.get("stock").and_then(Value::as_u64) {
            self.stock = u32::try_from(stock).unwrap_or(u32::MAX);
        }
        if let Some(category) = fields.get("category").and_then(Value::as_str) {
            self.category = Some(category.to_owned());
        }
    }
}

#[derive(Debug, Clone)]
struct CategoryRecord {
    id: String,
    name: String,
    description: Option<String>,
}

impl CategoryRecord {
    fn to_json(&self) -> Value {
        json!({ "_id": self.id, "name": self.name, "description": self.description })
    }
}

#[derive(Debug, Clone)]
struct OrderLineRecord {
    product: String,
    title: String,
    quantity: u32,
    price: f64,
}

#[derive(Debug, Clone)]
struct OrderRecord {
    id: String,
    customer: String,
    lines: Vec<OrderLineRecord>,
    status: String,
    coupons: Vec<String>,
    is_deleted: bool,
}

impl OrderRecord {
    fn total(&self) -> f64 {
        self.lines
            .iter()
            .map(|l| l.price * f64::from(l.quantity))
            .sum()
    }
}

#[derive(Debug, Clone)]
struct FeedbackRecord {
    id: String,
    author: String,
    message: String,
    status: String,
}

#[derive(Debug, Default)]
struct Data {
    next_id: u64,
    users: Vec<UserRecord>,
    tokens: HashMap<String, String>,
    products: Vec<ProductRecord>,
    categories: Vec<CategoryRecord>,
    carts: HashMap<String, Vec<(String, u32)>>,
    orders: Vec<OrderRecord>,
    feedback: Vec<FeedbackRecord>,
}

impl Data {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:06}", self.next_id)
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        let token = self.next_id("tok-");
        self.tokens.insert(token.clone(), user_id.to_owned());
        token
    }

    fn user(&self, id: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    fn product(&self, id: &str) -> Option<&ProductRecord> {
        self.products.iter().find(|p| p.id == id)
    }

    fn line_json(product: &ProductRecord, quantity: u32) -> Value {
        json!({
            "_id": format!("line-{}", product.id),
            "productId": {
                "_id": product.id,
                "title": product.title,
                "price": product.price,
                "primaryImage": null,
            },
            "quantity": quantity,
        })
    }

    fn cart_json(&self, user_id: &str) -> Value {
        let lines = self.carts.get(user_id).map(Vec::as_slice).unwrap_or_default();
        let mut total = 0.0;
        let items: Vec<Value> = lines
            .iter()
            .filter_map(|(product_id, quantity)| {
                let product = self.product(product_id)?;
                total += product.price * f64::from(*quantity);
                Some(Self::line_json(product, *quantity))
            })
            .collect();
        json!({ "items": items, "total": total })
    }

    fn order_json(&self, order: &OrderRecord) -> Value {
        let customer = self
            .user(&order.customer)
            .map_or_else(|| json!(order.customer), UserRecord::summary);
        let items: Vec<Value> = order
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                json!({
                    "_id": format!("{}-{i}", order.id),
                    "productId": { "_id": line.product, "title": line.title },
                    "quantity": line.quantity,
                    "price": line.price,
                })
            })
            .collect();
        json!({
            "_id": order.id,
            "userId": customer,
            "items": items,
            "status": order.status,
            "totalAmount": order.total(),
            "finalAmount": order.total(),
            "coupons": order.coupons,
            "isDeleted": order.is_deleted,
        })
    }

    fn orders_json<'a>(&self, orders: impl Iterator<Item = &'a OrderRecord>) -> Vec<Value> {
        orders.map(|o| self.order_json(o)).collect()
    }

    fn feedback_json(&self, entry: &FeedbackRecord) -> Value {
        let author = self
            .user(&entry.author)
            .map_or_else(|| json!(entry.author), UserRecord::summary);
        json!({
            "_id": entry.id,
            "userId": author,
            "comment": entry.message,
            "status": entry.status,
        })
    }
}

// ============================================================================
// Shared state
// ============================================================================

#[derive(Debug, Default)]
struct MockState {
    data: Mutex<Data>,
    log: Mutex<Vec<RecordedRequest>>,
    failures: Mutex<HashMap<String, (StatusCode, String)>>,
    one_shot_failures: Mutex<HashMap<String, VecDeque<(StatusCode, String)>>>,
    delays: Mutex<HashMap<String, VecDeque<Duration>>>,
}

type Shared = Arc<MockState>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// MockBackend
// ============================================================================

/// The marketplace backend, served from memory.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl MockBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = Shared::default();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");
        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            state,
            server,
        }
    }

    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the URL is rejected, which cannot happen for a bound address.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.api_url()).expect("Mock backend URL is valid")
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Add an account and return its id.
    pub fn add_user(&self, fullname: &str, email: &str, password: &str, role: &str) -> String {
        let mut data = lock(&self.state.data);
        let id = data.next_id("user-");
        data.users.push(UserRecord {
            id: id.clone(),
            fullname: fullname.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            role: role.to_owned(),
        });
        id
    }

    /// Add a product and return its id.
    pub fn add_product(&self, title: &str, price: f64, seller: Option<&str>) -> String {
        let mut data = lock(&self.state.data);
        let id = data.next_id("prod-");
        data.products.push(ProductRecord {
            id: id.clone(),
            title: title.to_owned(),
            description: None,
            price,
            stock: 10,
            seller: seller.map(str::to_owned),
            category: None,
        });
        id
    }

    /// Add a category and return its id.
    pub fn add_category(&self, name: &str) -> String {
        let mut data = lock(&self.state.data);
        let id = data.next_id("cat-");
        data.categories.push(CategoryRecord {
            id: id.clone(),
            name: name.to_owned(),
            description: None,
        });
        id
    }

    /// Replace a user's cart lines.
    pub fn set_cart(&self, user_id: &str, lines: &[(&str, u32)]) {
        let lines = lines
            .iter()
            .map(|(product, quantity)| ((*product).to_owned(), *quantity))
            .collect();
        lock(&self.state.data)
            .carts
            .insert(user_id.to_owned(), lines);
    }

    /// A user's cart lines as stored server-side.
    #[must_use]
    pub fn cart_lines(&self, user_id: &str) -> Vec<(String, u32)> {
        lock(&self.state.data)
            .carts
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Add an order for `customer` and return its id.
    pub fn add_order(&self, customer: &str, lines: &[(&str, u32)]) -> String {
        let mut data = lock(&self.state.data);
        let id = data.next_id("order-");
        let lines = lines
            .iter()
            .filter_map(|(product_id, quantity)| {
                let product = data.product(product_id)?;
                Some(OrderLineRecord {
                    product: product.id.clone(),
                    title: product.title.clone(),
                    quantity: *quantity,
                    price: product.price,
                })
            })
            .collect();
        data.orders.push(OrderRecord {
            id: id.clone(),
            customer: customer.to_owned(),
            lines,
            status: "pending".to_owned(),
            coupons: Vec::new(),
            is_deleted: false,
        });
        id
    }

    /// `(status, is_deleted)` of an order.
    #[must_use]
    pub fn order_state(&self, id: &str) -> Option<(String, bool)> {
        lock(&self.state.data)
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| (o.status.clone(), o.is_deleted))
    }

    /// Add a pending feedback entry and return its id.
    pub fn add_feedback(&self, author: &str, message: &str) -> String {
        let mut data = lock(&self.state.data);
        let id = data.next_id("fb-");
        data.feedback.push(FeedbackRecord {
            id: id.clone(),
            author: author.to_owned(),
            message: message.to_owned(),
            status: "pending".to_owned(),
        });
        id
    }

    #[must_use]
    pub fn user_role(&self, id: &str) -> Option<String> {
        lock(&self.state.data).user(id).map(|u| u.role.clone())
    }

    #[must_use]
    pub fn has_product(&self, id: &str) -> bool {
        lock(&self.state.data).product(id).is_some()
    }

    /// Issue a token for an existing user, as a login would.
    #[must_use]
    pub fn issue_token(&self, user_id: &str) -> String {
        lock(&self.state.data).issue_token(user_id)
    }

    /// An in-memory session logged in as `user_id`.
    ///
    /// # Panics
    ///
    /// Panics if the user does not exist.
    #[must_use]
    pub fn session_for(&self, user_id: &str) -> SessionHandle {
        let (token, user) = {
            let mut data = lock(&self.state.data);
            let record = data.user(user_id).expect("Unknown user").clone();
            (data.issue_token(user_id), record)
        };
        let user: User = serde_json::from_value(user.to_json()).expect("Valid user JSON");
        let session = SessionHandle::in_memory();
        session
            .begin(token, Some(user))
            .expect("In-memory session never fails");
        session
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Answer every request to `route` with `status` until [`Self::recover`].
    pub fn fail(&self, route: &str, status: StatusCode, message: &str) {
        lock(&self.state.failures).insert(route.to_owned(), (status, message.to_owned()));
    }

    /// Answer only the next request to `route` with `status`.
    pub fn fail_once(&self, route: &str, status: StatusCode, message: &str) {
        lock(&self.state.one_shot_failures)
            .entry(route.to_owned())
            .or_default()
            .push_back((status, message.to_owned()));
    }

    pub fn recover(&self, route: &str) {
        lock(&self.state.failures).remove(route);
        lock(&self.state.one_shot_failures).remove(route);
    }

    /// Hold the next response on `route` for `delay`. Calls queue up, one
    /// delay per request in arrival order.
    pub fn delay(&self, route: &str, delay: Duration) {
        lock(&self.state.delays)
            .entry(route.to_owned())
            .or_default()
            .push_back(delay);
    }

    // ------------------------------------------------------------------
    // Request log
    // ------------------------------------------------------------------

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.log).clone()
    }

    /// Requests to one route, e.g. `"GET /cart"`.
    #[must_use]
    pub fn requests_to(&self, route: &str) -> Vec<RecordedRequest> {
        lock(&self.state.log)
            .iter()
            .filter(|r| r.route() == route)
            .cloned()
            .collect()
    }

    pub fn clear_log(&self) {
        lock(&self.state.log).clear();
    }
}

// ============================================================================
// Client helpers
// ============================================================================

/// A marketplace client recording its toasts.
pub struct TestClient {
    pub app: Marketplace,
    pub toasts: Arc<RecordingNotifier>,
}

impl TestClient {
    #[must_use]
    pub fn new(config: ClientConfig, session: SessionHandle, mode: CartMode) -> Self {
        let mut config = config;
        config.cart_mode = mode;
        let toasts = Arc::new(RecordingNotifier::new());
        let notifier: Arc<dyn Notifier> = Arc::clone(&toasts) as Arc<dyn Notifier>;
        let app = Marketplace::builder(config, session)
            .notifier(notifier)
            .build();
        Self { app, toasts }
    }

    /// Client for `backend`, logged in as `user_id`.
    #[must_use]
    pub fn logged_in(backend: &MockBackend, user_id: &str, mode: CartMode) -> Self {
        Self::new(backend.config(), backend.session_for(user_id), mode)
    }

    /// Client for `backend` without a session.
    #[must_use]
    pub fn anonymous(backend: &MockBackend) -> Self {
        Self::new(
            backend.config(),
            SessionHandle::in_memory(),
            CartMode::default(),
        )
    }
}

// ============================================================================
// Router
// ============================================================================

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/profile", get(profile))
        .route(
            "/cart",
            get(get_cart)
                .post(add_to_cart)
                .put(update_cart)
                .delete(remove_from_cart),
        )
        .route("/cart/clear", delete(clear_cart))
        .route("/products", get(list_products).post(create_product))
        .route("/products/seller/{id}", get(seller_products))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/orders", get(all_orders).post(create_order))
        .route("/orders/deleted", get(deleted_orders))
        .route("/orders/seller", get(seller_orders))
        .route("/orders/details/{id}", get(order_details))
        .route("/orders/{id}", get(user_orders).delete(delete_order))
        .route("/orders/{id}/restore", patch(restore_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/role", patch(update_role))
        .route("/feedback", get(list_feedback))
        .route(
            "/feedback/{id}",
            patch(update_feedback).delete(delete_feedback),
        )
        .route("/seller/stats", get(seller_stats));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(Arc::clone(&state), record))
        .with_state(state)
}

/// Log the request, apply injected failures, then delay the response.
async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    let full_path = parts.uri.path();
    let path = full_path.strip_prefix("/api").unwrap_or(full_path).to_owned();
    let header_value = |name: header::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path,
        query: parts.uri.query().map(str::to_owned),
        authorization: header_value(header::AUTHORIZATION),
        cache_control: header_value(header::CACHE_CONTROL),
        body: serde_json::from_slice(&bytes).ok(),
    };
    let route = recorded.route();
    lock(&state.log).push(recorded);

    let failure = lock(&state.one_shot_failures)
        .get_mut(&route)
        .and_then(VecDeque::pop_front)
        .or_else(|| lock(&state.failures).get(&route).cloned());
    let response = match failure {
        Some((status, message)) => fail(status, &message),
        None => {
            next.run(Request::from_parts(parts, Body::from(bytes)))
                .await
        }
    };

    let delay = lock(&state.delays)
        .get_mut(&route)
        .and_then(VecDeque::pop_front);
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    response
}

// ============================================================================
// Response helpers
// ============================================================================

type Reply = Result<Response, Response>;

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn ok(body: Value) -> Reply {
    Ok(Json(body).into_response())
}

fn created(body: Value) -> Reply {
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

fn caller(data: &Data, headers: &HeaderMap) -> Result<UserRecord, Response> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| data.tokens.get(token))
        .and_then(|id| data.user(id))
        .cloned()
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized, no token"))
}

fn caller_with_role(data: &Data, headers: &HeaderMap, roles: &[&str]) -> Result<UserRecord, Response> {
    let user = caller(data, headers)?;
    if roles.contains(&user.role.as_str()) {
        Ok(user)
    } else {
        Err(fail(StatusCode::FORBIDDEN, "Access denied"))
    }
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

impl PageQuery {
    fn slice<T: Clone>(&self, items: &[T]) -> (Vec<T>, usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let total_pages = items.len().div_ceil(PAGE_SIZE).max(1);
        let slice = items
            .iter()
            .skip((page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .cloned()
            .collect();
        (slice, page, total_pages)
    }
}

async fn not_found() -> Response {
    fail(StatusCode::NOT_FOUND, "Route not found")
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct NewUserBody {
    fullname: String,
    email: String,
    password: String,
    #[serde(default)]
    role: Option<String>,
}

async fn login(State(state): State<Shared>, Json(body): Json<Credentials>) -> Reply {
    let mut data = lock(&state.data);
    let user = data
        .users
        .iter()
        .find(|u| u.email == body.email && u.password == body.password)
        .cloned()
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;
    let token = data.issue_token(&user.id);
    ok(json!({ "message": "Login successful", "token": token, "user": user.to_json() }))
}

fn insert_user(data: &mut Data, body: NewUserBody) -> Result<UserRecord, Response> {
    if data.users.iter().any(|u| u.email == body.email) {
        return Err(fail(StatusCode::BAD_REQUEST, "User already exists"));
    }
    let user = UserRecord {
        id: data.next_id("user-"),
        fullname: body.fullname,
        email: body.email,
        password: body.password,
        role: body.role.unwrap_or_else(|| "user".to_owned()),
    };
    data.users.push(user.clone());
    Ok(user)
}

async fn register(State(state): State<Shared>, Json(body): Json<NewUserBody>) -> Reply {
    let mut data = lock(&state.data);
    let user = insert_user(&mut data, body)?;
    let token = data.issue_token(&user.id);
    created(json!({ "message": "User registered", "token": token, "user": user.to_json() }))
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let data = lock(&state.data);
    let user = caller(&data, &headers)?;
    ok(json!({ "user": user.to_json() }))
}

// ============================================================================
// Cart
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineBody {
    product_id: String,
    #[serde(default)]
    quantity: u32,
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let data = lock(&state.data);
    let user = caller(&data, &headers)?;
    ok(json!({ "data": data.cart_json(&user.id) }))
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Reply {
    let mut data = lock(&state.data);
    let user = caller(&data, &headers)?;
    if body.quantity == 0 {
        return Err(fail(StatusCode::BAD_REQUEST, "Quantity must be at least 1"));
    }
    let product = data
        .product(&body.product_id)
        .cloned()
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))?;

    let lines = data.carts.entry(user.id).or_default();
    let quantity = if let Some(line) = lines.iter_mut().find(|(p, _)| *p == product.id) {
        line.1 += body.quantity;
        line.1
    } else {
        lines.push((product.id.clone(), body.quantity));
        body.quantity
    };
    created(json!({
        "message": "Item added to cart",
        "item": Data::line_json(&product, quantity),
    }))
}

async fn update_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Reply {
    let mut data = lock(&state.data);
    let user = caller(&data, &headers)?;
    let lines = data.carts.entry(user.id.clone()).or_default();
    let Some(index) = lines.iter().position(|(p, _)| *p == body.product_id) else {
        return Err(fail(StatusCode::NOT_FOUND, "Item not in cart"));
    };
    if body.quantity == 0 {
        lines.remove(index);
    } else if let Some(line) = lines.get_mut(index) {
        line.1 = body.quantity;
    }
    ok(json!({ "message": "Quantity updated", "data": data.cart_json(&user.id) }))
}

async fn remove_from_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Reply {
    let mut data = lock(&state.data);
    let user = caller(&data, &headers)?;
    let lines = data.carts.entry(user.id.clone()).or_default();
    let before = lines.len();
    lines.retain(|(p, _)| *p != body.product_id);
    if lines.len() == before {
        return Err(fail(StatusCode::NOT_FOUND, "Item not in cart"));
    }
    ok(json!({ "message": "Item removed", "data": data.cart_json(&user.id) }))
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut data = lock(&state.data);
    let user = caller(&data, &headers)?;
    data.carts.remove(&user.id);
    ok(json!({ "message": "Cart cleared" }))
}

// ============================================================================
// Products
// ============================================================================

async fn list_products(State(state): State<Shared>, Query(query): Query<PageQuery>) -> Reply {
    let data = lock(&state.data);
    let (items, page, total_pages) = query.slice(&data.products);
    let products: Vec<Value> = items.iter().map(ProductRecord::to_json).collect();
    ok(json!({ "products": products, "currentPage": page, "totalPages": total_pages }))
}

async fn get_product(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    let data = lock(&state.data);
    let product = data
        .product(&id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))?;
    ok(json!({ "product": product.to_json() }))
}

async fn seller_products(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    let data = lock(&state.data);
    let products: Vec<Value> = data
        .products
        .iter()
        .filter(|p| p.seller.as_deref() == Some(id.as_str()))
        .map(ProductRecord::to_json)
        .collect();
    ok(json!({ "products": products }))
}

async fn create_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = lock(&state.data);
    let user = caller_with_role(&data, &headers, &["seller", "admin"])?;
    if body.get("title").and_then(Value::as_str).is_none() || body.get("price").is_none() {
        return Err(fail(StatusCode::BAD_REQUEST, "Title and price are required"));
    }
    let mut product = ProductRecord {
        id: data.next_id("prod-"),
        title: String::new(),
        description: None,
        price: 0.0,
        stock: 0,
        seller: Some(user.id),
        category: None,
    };
    product.apply(&body);
    let json = product.to_json();
    data.products.push(product);
    created(json!({ "message": "Product created", "product": json }))
}

fn owned_product<'a>(
    data: &'a mut Data,
    user: &UserRecord,
    id: &str,
) -> Result<&'a mut ProductRecord, Response> {
    let product = data
        .products
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))?;
    if user.role != "admin" && product.seller.as_deref() != Some(user.id.as_str()) {
        return Err(fail(StatusCode::FORBIDDEN, "Not your product"));
    }
    Ok(product)
}

async fn update_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = lock(&state.data);
    let user = caller_with_role(&data, &headers, &["seller", "admin"])?;
    let product = owned_product(&mut data, &user, &id)?;
    product.apply(&body);
    ok(json!({ "message": "Product updated", "product": product.to_json() }))
}

async fn delete_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = lock(&state.data);
    let user = caller_with_role(&data, &headers, &["seller", "admin"])?;
    owned_product(&mut data, &user, &id)?;
    data.products.retain(|p| p.id != id);
    ok(json!({ "message": "Product deleted" }))
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Deserialize)]
struct CategoryBody {
    name: Option<String>,
    description: Option<String>,
}

async fn list_categories(State(state): State<Shared>, Query(query): Query<PageQuery>) -> Reply {
    let data = lock(&state.data);
    let (items, page, total_pages) = query.slice(&data.categories);
    let categories: Vec<Value> = items.iter().map(CategoryRecord::to_json).collect();
    ok(json!({
        "data": { "items": categories, "page": page, "totalPages": total_pages },
    }))
}

async fn get_category(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    let data = lock(&state.data);
    let category = data
        .categories
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Category not found"))?;
    ok(json!({ "category": category.to_json() }))
}

async fn create_category(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CategoryBody>,
) -> Reply {
    let mut data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let Some(name) = body.name.filter(|n| !n.trim().is_empty()) else {
        return Err(fail(StatusCode::BAD_REQUEST, "Name is required"));
    };
    let category = CategoryRecord {
        id: data.next_id("cat-"),
        name,
        description: body.description,
    };
    let json = category.to_json();
    data.categories.push(category);
    created(json!({ "message": "Category created", "category": json }))
}

async fn update_category(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CategoryBody>,
) -> Reply {
    let mut data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let category = data
        .categories
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Category not found"))?;
    if let Some(name) = body.name {
        category.name = name;
    }
    if let Some(description) = body.description {
        category.description = Some(description);
    }
    ok(json!({ "message": "Category updated", "category": category.to_json() }))
}

async fn delete_category(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let before = data.categories.len();
    data.categories.retain(|c| c.id != id);
    if data.categories.len() == before {
        return Err(fail(StatusCode::NOT_FOUND, "Category not found"));
    }
    ok(json!({ "message": "Category deleted" }))
}

// ============================================================================
// Orders
// ============================================================================

const ORDER_STATUSES: &[&str] = &["pending", "processing", "shipped", "completed", "cancelled"];

#[derive(Debug, Deserialize)]
struct CreateOrderBody {
    coupons: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    new_status: String,
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderBody>,
) -> Reply {
    let mut data = lock(&state.data);
    let user = caller(&data, &headers)?;
    let lines: Vec<OrderLineRecord> = data
        .carts
        .get(&user.id)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|(product_id, quantity)| {
            let product = data.product(product_id)?;
            Some(OrderLineRecord {
                product: product.id.clone(),
                title: product.title.clone(),
                quantity: *quantity,
                price: product.price,
            })
        })
        .collect();
    if lines.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "Cart is empty"));
    }

    let order = OrderRecord {
        id: data.next_id("order-"),
        customer: user.id.clone(),
        lines,
        status: "pending".to_owned(),
        coupons: body.coupons,
        is_deleted: false,
    };
    let json = data.order_json(&order);
    data.orders.push(order);
    data.carts.remove(&user.id);
    created(json!({ "message": "Order placed successfully", "order": json }))
}

async fn all_orders(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let orders = data.orders_json(data.orders.iter().filter(|o| !o.is_deleted));
    ok(json!({ "orders": orders }))
}

async fn deleted_orders(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let orders = data.orders_json(data.orders.iter().filter(|o| o.is_deleted));
    ok(json!({ "orders": orders }))
}

async fn seller_orders(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let data = lock(&state.data);
    let seller = caller_with_role(&data, &headers, &["seller"])?;
    let sells = |product: &str| {
        data.product(product)
            .is_some_and(|p| p.seller.as_deref() == Some(seller.id.as_str()))
    };
    let orders = data.orders_json(
        data.orders
            .iter()
            .filter(|o| !o.is_deleted && o.lines.iter().any(|l| sells(&l.product))),
    );
    ok(json!({ "orders": orders }))
}

async fn user_orders(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let data = lock(&state.data);
    let user = caller(&data, &headers)?;
    if user.id != id && user.role != "admin" {
        return Err(fail(StatusCode::FORBIDDEN, "Access denied"));
    }
    let orders = data.orders_json(
        data.orders
            .iter()
            .filter(|o| o.customer == id && !o.is_deleted),
    );
    ok(json!({ "data": orders }))
}

async fn order_details(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let data = lock(&state.data);
    let user = caller(&data, &headers)?;
    let order = data
        .orders
        .iter()
        .find(|o| o.id == id && (o.customer == user.id || user.role == "admin"))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Order not found"))?;
    ok(json!({ "order": data.order_json(order) }))
}

fn admin_order<'a>(
    data: &'a mut Data,
    headers: &HeaderMap,
    id: &str,
) -> Result<&'a mut OrderRecord, Response> {
    caller_with_role(data, headers, &["admin"])?;
    data.orders
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Order not found"))
}

async fn delete_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = lock(&state.data);
    let order = admin_order(&mut data, &headers, &id)?;
    if order.is_deleted {
        return Err(fail(StatusCode::BAD_REQUEST, "Order already deleted"));
    }
    order.is_deleted = true;
    ok(json!({ "message": "Order deleted" }))
}

async fn restore_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = lock(&state.data);
    let order = admin_order(&mut data, &headers, &id)?;
    if !order.is_deleted {
        return Err(fail(StatusCode::BAD_REQUEST, "Order is not deleted"));
    }
    order.is_deleted = false;
    ok(json!({ "message": "Order restored" }))
}

async fn update_order_status(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Reply {
    let mut data = lock(&state.data);
    if !ORDER_STATUSES.contains(&body.new_status.as_str()) {
        return Err(fail(StatusCode::BAD_REQUEST, "Invalid status"));
    }
    let order = admin_order(&mut data, &headers, &id)?;
    order.status = body.new_status;
    ok(json!({ "message": "Order status updated" }))
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize)]
struct RoleBody {
    role: String,
}

async fn list_users(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Reply {
    let data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let (items, page, total_pages) = query.slice(&data.users);
    let users: Vec<Value> = items.iter().map(UserRecord::to_json).collect();
    ok(json!({ "users": users, "page": page, "totalPages": total_pages }))
}

async fn create_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<NewUserBody>,
) -> Reply {
    let mut data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let user = insert_user(&mut data, body)?;
    created(json!({ "message": "User created", "user": user.to_json() }))
}

async fn update_role(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RoleBody>,
) -> Reply {
    let mut data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    if !["user", "seller", "admin"].contains(&body.role.as_str()) {
        return Err(fail(StatusCode::BAD_REQUEST, "Invalid role"));
    }
    let user = data
        .users
        .iter_mut()
        .find(|u| u.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))?;
    user.role = body.role;
    ok(json!({ "message": "Role updated", "user": user.to_json() }))
}

async fn delete_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let before = data.users.len();
    data.users.retain(|u| u.id != id);
    if data.users.len() == before {
        return Err(fail(StatusCode::NOT_FOUND, "User not found"));
    }
    data.tokens.retain(|_, user| *user != id);
    ok(json!({ "message": "User deleted" }))
}

// ============================================================================
// Feedback
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeedbackBody {
    status: String,
}

async fn list_feedback(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Reply {
    let data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let (items, page, total_pages) = query.slice(&data.feedback);
    let feedbacks: Vec<Value> = items.iter().map(|f| data.feedback_json(f)).collect();
    ok(json!({ "feedbacks": feedbacks, "currentPage": page, "totalPages": total_pages }))
}

async fn update_feedback(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<FeedbackBody>,
) -> Reply {
    let mut data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let entry = data
        .feedback
        .iter_mut()
        .find(|f| f.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Feedback not found"))?;
    entry.status = body.status;
    ok(json!({ "message": "Feedback updated" }))
}

async fn delete_feedback(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = lock(&state.data);
    caller_with_role(&data, &headers, &["admin"])?;
    let before = data.feedback.len();
    data.feedback.retain(|f| f.id != id);
    if data.feedback.len() == before {
        return Err(fail(StatusCode::NOT_FOUND, "Feedback not found"));
    }
    ok(json!({ "message": "Feedback deleted" }))
}

// ============================================================================
// Seller stats
// ============================================================================

async fn seller_stats(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let data = lock(&state.data);
    let seller = caller_with_role(&data, &headers, &["seller"])?;
    let own: Vec<&str> = data
        .products
        .iter()
        .filter(|p| p.seller.as_deref() == Some(seller.id.as_str()))
        .map(|p| p.id.as_str())
        .collect();
    let orders: Vec<&OrderRecord> = data
        .orders
        .iter()
        .filter(|o| !o.is_deleted && o.lines.iter().any(|l| own.contains(&l.product.as_str())))
        .collect();
    let revenue: f64 = orders
        .iter()
        .flat_map(|o| o.lines.iter())
        .filter(|l| own.contains(&l.product.as_str()))
        .map(|l| l.price * f64::from(l.quantity))
        .sum();
    let pending = orders.iter().filter(|o| o.status == "pending").count();
    ok(json!({
        "stats": {
            "totalProducts": own.len(),
            "totalOrders": orders.len(),
            "totalRevenue": revenue,
            "pendingOrders": pending,
        },
    }))
}
