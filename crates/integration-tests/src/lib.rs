//! End-to-end tests for Bazaar.
//!
//! The storefront router runs in-process over the in-memory backend and an
//! in-memory session store, so no database or server is needed:
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! `tests/postgres_orders.rs` exercises the `PostgreSQL` order commit instead;
//! those tests are ignored unless run with `--ignored` and a `DATABASE_URL`.
//!
//! Every [`TestClient`] keeps its own session cookie and client IP, so rate
//! limits and logins do not leak between clients of one [`TestApp`].

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use bazaar_core::{StoreId, Subdomain};
use bazaar_storefront::config::{OtpConfig, SentryConfig, StorefrontConfig};
use bazaar_storefront::db::{CatalogManagement, MemoryBackend, StoreManagement, UserDirectory};
use bazaar_storefront::models::{NewStore, Product, ShippingClass, Store, StoreProfile};
use bazaar_storefront::services::MokaOtpStore;
use bazaar_storefront::state::AppState;

/// Base domain every test store hangs off.
pub const BASE_DOMAIN: &str = "example.com";

/// Host name serving `subdomain`.
#[must_use]
pub fn host_for(subdomain: &str) -> String {
    format!("{subdomain}.{BASE_DOMAIN}")
}

/// A storefront wired to fresh in-memory state.
pub struct TestApp {
    router: Router,
    backend: MemoryBackend,
    next_ip: AtomicU8,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://unused"),
            host: [127, 0, 0, 1].into(),
            port: 8000,
            base_domain: BASE_DOMAIN.to_string(),
            secure_cookies: false,
            otp: OtpConfig {
                expose_in_response: true,
                ..OtpConfig::default()
            },
            sentry: SentryConfig::default(),
        };
        let backend = MemoryBackend::new();
        let otp = MokaOtpStore::new(config.otp.ttl);
        let state = AppState::new(config, Arc::new(backend.clone()), Arc::new(otp));

        Self {
            router: bazaar_storefront::app(state, MemoryStore::default()),
            backend,
            next_ip: AtomicU8::new(1),
        }
    }

    /// Direct access to the data behind the router.
    #[must_use]
    pub const fn backend(&self) -> &MemoryBackend {
        &self.backend
    }

    /// A new anonymous client addressing `host`.
    pub fn client(&self, host: impl Into<String>) -> TestClient {
        let n = self.next_ip.fetch_add(1, Ordering::SeqCst);
        TestClient {
            router: self.router.clone(),
            host: host.into(),
            ip: format!("198.51.100.{n}"),
            cookie: None,
        }
    }

    /// Create a store owned by the user with `owner_phone`.
    pub async fn seed_store(&self, owner_phone: &str, subdomain: &str) -> Store {
        let owner = self
            .backend
            .find_or_create_user_by_phone(&owner_phone.parse().unwrap())
            .await
            .unwrap();
        self.backend
            .create_store(NewStore {
                owner_id: owner.id,
                subdomain: Subdomain::parse(subdomain).unwrap(),
                profile: StoreProfile::named(format!("Store {subdomain}")),
            })
            .await
            .unwrap()
    }

    /// Add a published product.
    pub async fn seed_product(&self, store: StoreId, title: &str, price: &str, stock: i32) -> Product {
        let draft = serde_json::from_value(json!({
            "title": title,
            "price": price,
            "stock": stock,
        }))
        .unwrap();
        self.backend.create_product(store, draft).await.unwrap()
    }

    /// Add an active shipping class.
    pub async fn seed_shipping_class(&self, store: StoreId, name: &str, cost: &str) -> ShippingClass {
        let class = serde_json::from_value(json!({ "name": name, "cost": cost })).unwrap();
        self.backend
            .create_shipping_class(store, class)
            .await
            .unwrap()
    }
}

/// Status and decoded JSON body of a response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// One browser-like client: fixed host and IP, plus a session cookie jar.
pub struct TestClient {
    router: Router,
    host: String,
    ip: String,
    cookie: Option<String>,
}

impl TestClient {
    /// Address later requests to another host, keeping the session.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    pub async fn send(&mut self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, &self.host)
            .header("x-forwarded-for", &self.ip);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&mut self, path: &str, body: Value) -> TestResponse {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put(&mut self, path: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&mut self, path: &str) -> TestResponse {
        self.send(Method::DELETE, path, None).await
    }

    /// Log in with phone + OTP; returns the user record.
    pub async fn login(&mut self, phone: &str) -> Value {
        let issued = self
            .post("/api/auth/otp/request", json!({ "phone": phone }))
            .await;
        assert_eq!(issued.status, StatusCode::OK, "{:?}", issued.body);
        let code = issued.body["code"].as_str().unwrap().to_string();

        let verified = self
            .post(
                "/api/auth/otp/verify",
                json!({ "phone": phone, "code": code }),
            )
            .await;
        assert_eq!(verified.status, StatusCode::OK, "{:?}", verified.body);
        verified.body
    }
}

/// A valid checkout body for `items` of `(product_id, quantity)`.
#[must_use]
pub fn checkout_body(items: &[(i64, i32)], shipping_class_id: Option<i64>) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|(product_id, quantity)| json!({ "product_id": product_id, "quantity": quantity }))
        .collect();
    json!({
        "customer_name": "Rahim Uddin",
        "customer_phone": "01811000000",
        "shipping_address": "House 1, Road 2, Dhanmondi",
        "shipping_city": "Dhaka",
        "shipping_class_id": shipping_class_id,
        "items": items,
    })
}
