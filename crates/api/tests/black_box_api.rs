use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use storefront_api::app::{build_app, services::AppServices};
use storefront_api::config::ApiConfig;
use storefront_auth::{JwtClaims, Role};
use storefront_core::UserId;

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "admin@shop.test";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = ApiConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "ADMIN_EMAIL" => Some(ADMIN_EMAIL.to_string()),
            _ => None,
        })
        .expect("valid test config");

        // Same router as prod, in-memory storage, ephemeral port.
        let services = Arc::new(AppServices::in_memory(&config));
        let app = build_app(&config, services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, name: &str, email: &str) -> Value {
        let res = self
            .client
            .post(self.url("/api/users"))
            .json(&json!({ "name": name, "email": email, "password": "secret123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn create_product(&self, admin_token: &str, body: Value) -> Value {
        let res = self
            .client
            .post(self.url("/api/products"))
            .bearer_auth(admin_token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn token_of(user: &Value) -> String {
    user["token"].as_str().unwrap().to_string()
}

fn mint_jwt(secret: &str, roles: Vec<Role>, expires_in: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        roles,
        iat: now,
        exp: now + expires_in,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn order_body(product: &Value) -> Value {
    json!({
        "orderItems": [
            {
                "_id": product["_id"],
                "name": product["name"],
                "qty": 2,
                "image": "/images/mouse.jpg",
                "price": 30.0,
                "countInStock": 10
            },
            {
                "_id": product["_id"],
                "name": "Mouse pad",
                "qty": 1,
                "image": "",
                "price": 25.0,
                "countInStock": 5
            }
        ],
        "shippingAddress": {
            "address": "1 Main St",
            "city": "Springfield",
            "postalCode": "12345",
            "country": "US"
        },
        "paymentMethod": "PayPal",
        "itemsPrice": 85.0,
        "taxPrice": 12.75,
        "shippingPrice": 10.0,
        "totalPrice": 107.75
    })
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/api/users/profile")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = srv
        .client
        .get(srv.url("/api/orders/myorders"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let forged = mint_jwt("other-secret", vec![Role::admin()], ChronoDuration::minutes(10));
    let res = srv
        .client
        .post(srv.url("/api/products"))
        .bearer_auth(forged)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(JWT_SECRET, vec![Role::customer()], ChronoDuration::minutes(-10));
    let res = srv
        .client
        .get(srv.url("/api/orders/myorders"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_profile() {
    let srv = TestServer::spawn().await;

    let user = srv.register("Jane Doe", "Jane@Example.com").await;
    assert_eq!(user["email"], "jane@example.com");
    assert_eq!(user["isAdmin"], false);
    assert!(user["_id"].is_string());

    // Duplicate email (case-insensitive).
    let res = srv
        .client
        .post(srv.url("/api/users"))
        .json(&json!({ "name": "Other", "email": "jane@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User already exists");

    let res = srv
        .client
        .post(srv.url("/api/users"))
        .json(&json!({ "name": "Short", "email": "short@example.com", "password": "123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/api/users/login"))
        .json(&json!({ "email": "jane@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid email or password");

    let res = srv
        .client
        .post(srv.url("/api/users/login"))
        .json(&json!({ "email": "jane@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let logged_in: Value = res.json().await.unwrap();
    assert_eq!(logged_in["_id"], user["_id"]);

    let res = srv
        .client
        .get(srv.url("/api/users/profile"))
        .bearer_auth(token_of(&logged_in))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let profile: Value = res.json().await.unwrap();
    assert_eq!(profile["name"], "Jane Doe");
    assert!(profile.get("token").is_none());
    assert!(profile.get("password").is_none());

    let res = srv
        .client
        .put(srv.url("/api/users/profile"))
        .bearer_auth(token_of(&logged_in))
        .json(&json!({ "name": "Jane Smith" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "Jane Smith");
    assert!(updated["token"].is_string());
}

#[tokio::test]
async fn profile_email_must_be_unique() {
    let srv = TestServer::spawn().await;
    let _first = srv.register("First", "first@example.com").await;
    let second = srv.register("Second", "second@example.com").await;

    let res = srv
        .client
        .put(srv.url("/api/users/profile"))
        .bearer_auth(token_of(&second))
        .json(&json!({ "email": "FIRST@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_browsing_and_admin_only_creation() {
    let srv = TestServer::spawn().await;
    let admin = srv.register("Admin", ADMIN_EMAIL).await;
    assert_eq!(admin["isAdmin"], true);
    let customer = srv.register("Customer", "customer@example.com").await;

    let res = srv
        .client
        .post(srv.url("/api/products"))
        .bearer_auth(token_of(&customer))
        .json(&json!({ "name": "Nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let sample = srv.create_product(&token_of(&admin), json!({})).await;
    assert_eq!(sample["name"], "Sample name");
    assert_eq!(sample["numReviews"], 0);

    let mouse = srv
        .create_product(
            &token_of(&admin),
            json!({
                "name": "Logitech Wireless Mouse",
                "price": 29.99,
                "brand": "Logitech",
                "category": "Electronics",
                "countInStock": 12,
                "featured": true
            }),
        )
        .await;

    let res = srv
        .client
        .get(srv.url("/api/products"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let all: Vec<Value> = res.json().await.unwrap();
    assert_eq!(all.len(), 2);

    let res = srv
        .client
        .get(srv.url("/api/products?search=WIRELESS&brand=Logitech&category="))
        .send()
        .await
        .unwrap();
    let found: Vec<Value> = res.json().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["_id"], mouse["_id"]);

    let res = srv
        .client
        .get(srv.url("/api/products/featured"))
        .send()
        .await
        .unwrap();
    let featured: Vec<Value> = res.json().await.unwrap();
    assert_eq!(featured.len(), 1);

    let res = srv
        .client
        .get(srv.url(&format!("/api/products/{}", mouse["_id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["price"], 29.99);

    let res = srv
        .client
        .get(srv.url("/api/products/not-an-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Product not found");

    let res = srv
        .client
        .get(srv.url(&format!("/api/products/{}", UserId::new())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reviews_update_rating_and_reject_duplicates() {
    let srv = TestServer::spawn().await;
    let admin = srv.register("Admin", ADMIN_EMAIL).await;
    let alice = srv.register("Alice", "alice@example.com").await;
    let bob = srv.register("Bob", "bob@example.com").await;
    let product = srv.create_product(&token_of(&admin), json!({ "name": "Keyboard" })).await;
    let reviews_url = srv.url(&format!("/api/products/{}/reviews", product["_id"].as_str().unwrap()));

    let res = srv
        .client
        .post(&reviews_url)
        .json(&json!({ "rating": 5, "comment": "Great" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(&reviews_url)
        .bearer_auth(token_of(&alice))
        .json(&json!({ "rating": 5, "comment": "Great" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Review added");

    let res = srv
        .client
        .post(&reviews_url)
        .bearer_auth(token_of(&alice))
        .json(&json!({ "rating": 1, "comment": "Changed my mind" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Product already reviewed");

    let res = srv
        .client
        .post(&reviews_url)
        .bearer_auth(token_of(&bob))
        .json(&json!({ "rating": 9, "comment": "Off the charts" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(&reviews_url)
        .bearer_auth(token_of(&bob))
        .json(&json!({ "rating": 4, "comment": "Solid" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv
        .client
        .get(srv.url(&format!("/api/products/{}", product["_id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    let reviewed: Value = res.json().await.unwrap();
    assert_eq!(reviewed["numReviews"], 2);
    assert_eq!(reviewed["rating"], 4.5);
    assert_eq!(reviewed["reviews"][0]["name"], "Alice");

    let res = srv
        .client
        .post(srv.url(&format!("/api/products/{}/reviews", UserId::new())))
        .bearer_auth(token_of(&bob))
        .json(&json!({ "rating": 4, "comment": "Ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_lifecycle_place_pay_deliver() {
    let srv = TestServer::spawn().await;
    let admin = srv.register("Admin", ADMIN_EMAIL).await;
    let owner = srv.register("Owner", "owner@example.com").await;
    let stranger = srv.register("Stranger", "stranger@example.com").await;
    let product = srv.create_product(&token_of(&admin), json!({ "name": "Mouse", "price": 30 })).await;

    let res = srv
        .client
        .post(srv.url("/api/orders"))
        .bearer_auth(token_of(&owner))
        .json(&order_body(&product))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();
    assert_eq!(order["user"], owner["_id"]);
    assert_eq!(order["totalPrice"], 107.75);
    assert_eq!(order["isPaid"], false);
    assert_eq!(order["isDelivered"], false);
    let order_url = srv.url(&format!("/api/orders/{}", order["_id"].as_str().unwrap()));

    let res = srv
        .client
        .get(srv.url("/api/orders/myorders"))
        .bearer_auth(token_of(&owner))
        .send()
        .await
        .unwrap();
    let mine: Vec<Value> = res.json().await.unwrap();
    assert_eq!(mine.len(), 1);

    let res = srv
        .client
        .get(srv.url("/api/orders/myorders"))
        .bearer_auth(token_of(&stranger))
        .send()
        .await
        .unwrap();
    let theirs: Vec<Value> = res.json().await.unwrap();
    assert!(theirs.is_empty());

    let res = srv
        .client
        .get(&order_url)
        .bearer_auth(token_of(&stranger))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(&order_url)
        .bearer_auth(token_of(&admin))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .put(format!("{order_url}/pay"))
        .bearer_auth(token_of(&owner))
        .json(&json!({
            "id": "PAY-123",
            "status": "COMPLETED",
            "update_time": "2024-01-01T00:00:00Z",
            "email_address": "owner@example.com"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let paid: Value = res.json().await.unwrap();
    assert_eq!(paid["isPaid"], true);
    assert!(paid["paidAt"].is_string());
    assert_eq!(paid["paymentResult"]["id"], "PAY-123");
    for field in ["itemsPrice", "taxPrice", "shippingPrice", "totalPrice"] {
        assert_eq!(paid[field], order[field], "{field} changed on payment");
    }

    let res = srv
        .client
        .put(format!("{order_url}/pay"))
        .bearer_auth(token_of(&stranger))
        .json(&json!({ "id": "PAY-EVIL" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Paying again overwrites the timestamp and the payment result.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let res = srv
        .client
        .put(format!("{order_url}/pay"))
        .bearer_auth(token_of(&admin))
        .json(&json!({ "id": "PAY-456", "status": "COMPLETED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let repaid: Value = res.json().await.unwrap();
    assert_eq!(repaid["isPaid"], true);
    assert_eq!(repaid["paymentResult"]["id"], "PAY-456");
    assert_ne!(repaid["paidAt"], paid["paidAt"]);
    for field in ["itemsPrice", "taxPrice", "shippingPrice", "totalPrice"] {
        assert_eq!(repaid[field], order[field], "{field} changed on repeat payment");
    }

    let res = srv
        .client
        .put(format!("{order_url}/deliver"))
        .bearer_auth(token_of(&owner))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .put(format!("{order_url}/deliver"))
        .bearer_auth(token_of(&admin))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let delivered: Value = res.json().await.unwrap();
    assert_eq!(delivered["isDelivered"], true);
    assert!(delivered["deliveredAt"].is_string());
}

#[tokio::test]
async fn order_validation_errors_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let customer = srv.register("Customer", "buyer@example.com").await;

    let mut empty = order_body(&json!({ "_id": UserId::new().to_string(), "name": "x" }));
    empty["orderItems"] = json!([]);
    let res = srv
        .client
        .post(srv.url("/api/orders"))
        .bearer_auth(token_of(&customer))
        .json(&empty)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "No order items");

    let res = srv
        .client
        .post(srv.url("/api/orders"))
        .bearer_auth(token_of(&customer))
        .json(&json!({ "paymentMethod": "PayPal" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .get(srv.url("/api/orders/not-an-id"))
        .bearer_auth(token_of(&customer))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unrepresentable_order_amounts_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let customer = srv.register("Customer", "whale@example.com").await;

    let mut body = order_body(&json!({ "_id": UserId::new().to_string(), "name": "Yacht" }));
    body["orderItems"] = json!([{
        "_id": UserId::new().to_string(),
        "name": "Yacht",
        "qty": 4_000_000_000u64,
        "image": "",
        "price": 7.0e28,
        "countInStock": 1
    }]);
    let res = srv
        .client
        .post(srv.url("/api/orders"))
        .bearer_auth(token_of(&customer))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["message"], "Order amounts are out of range");

    // The server keeps serving afterwards.
    let res = srv
        .client
        .get(srv.url("/api/orders/myorders"))
        .bearer_auth(token_of(&customer))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
