//! Login, store setup and catalog management by store owners.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use bazaar_integration_tests::{BASE_DOMAIN, TestApp, checkout_body, host_for};

#[tokio::test]
async fn test_login_session_lifecycle() {
    let app = TestApp::new();

    let mut anonymous = app.client(BASE_DOMAIN);
    let res = anonymous.get("/api/auth/me").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "unauthorized");

    let mut client = app.client(BASE_DOMAIN);
    let user = client.login("017-1100 0001").await;
    assert_eq!(user["phone"], "01711000001");

    let me = client.get("/api/auth/me").await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["id"], user["id"]);

    let out = client.post("/api/auth/logout", json!({})).await;
    assert_eq!(out.status, StatusCode::NO_CONTENT);

    let me = client.get("/api/auth/me").await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_code_is_rejected_and_right_code_still_works() {
    let app = TestApp::new();
    let mut client = app.client(BASE_DOMAIN);

    let issued = client
        .post("/api/auth/otp/request", json!({ "phone": "01711000001" }))
        .await;
    let code = issued.body["code"].as_str().unwrap().to_string();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let res = client
        .post(
            "/api/auth/otp/verify",
            json!({ "phone": "01711000001", "code": wrong }),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = client
        .post(
            "/api/auth/otp/verify",
            json!({ "phone": "01711000001", "code": code }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_otp_requests_are_rate_limited() {
    let app = TestApp::new();
    let mut client = app.client(BASE_DOMAIN);

    let mut statuses = Vec::new();
    for _ in 0..8 {
        let res = client
            .post("/api/auth/otp/request", json!({ "phone": "01711000001" }))
            .await;
        statuses.push(res.status);
    }

    assert_eq!(statuses.first(), Some(&StatusCode::OK));
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_store_creation_rules() {
    let app = TestApp::new();
    let mut owner = app.client(BASE_DOMAIN);
    owner.login("01711000001").await;

    let created = owner
        .post(
            "/api/stores",
            json!({ "subdomain": "dhaka-tea", "name": "Dhaka Tea House" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["brand_color"], "#007bff");
    assert_eq!(created.body["currency"], "BDT");
    assert_eq!(created.body["default_language"], "bn");

    for subdomain in ["admin", "ab", "Shop!"] {
        let res = owner
            .post(
                "/api/stores",
                json!({ "subdomain": subdomain, "name": "Nope" }),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{subdomain}");
    }

    let mut rival = app.client(BASE_DOMAIN);
    rival.login("01711000002").await;
    let taken = rival
        .post(
            "/api/stores",
            json!({ "subdomain": "dhaka-tea", "name": "Copycat" }),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let mine = owner.get("/api/stores").await;
    assert_eq!(mine.body.as_array().unwrap().len(), 1);
    let theirs = rival.get("/api/stores").await;
    assert!(theirs.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_store_update_keeps_subdomain() {
    let app = TestApp::new();
    let store = app.seed_store("01711000001", "shop1").await;
    let path = format!("/api/stores/{}", store.id);

    let mut owner = app.client(BASE_DOMAIN);
    owner.login("01711000001").await;

    let res = owner
        .put(&path, json!({ "name": "Shop One", "logo": "https://cdn.example.com/logo.png" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "Shop One");
    assert_eq!(res.body["logo"], "https://cdn.example.com/logo.png");

    let res = owner.put(&path, json!({ "logo": null })).await;
    assert!(res.body["logo"].is_null());
    assert_eq!(res.body["name"], "Shop One");

    let res = owner.put(&path, json!({ "subdomain": "shop2" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = owner
        .put(&path, json!({ "subdomain": "shop1", "brand_color": "#112233" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["subdomain"], "shop1");

    let mut stranger = app.client(BASE_DOMAIN);
    stranger.login("01711000002").await;
    let res = stranger.get(&path).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_product_management_on_base_domain() {
    let app = TestApp::new();
    app.seed_store("01711000001", "shop1").await;

    let mut owner = app.client(BASE_DOMAIN);
    owner.login("01711000001").await;

    let first = owner
        .post(
            "/api/products",
            json!({ "title": "Green Tea", "price": "250", "stock": 10, "is_published": false }),
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["slug"], "green-tea");

    let second = owner
        .post("/api/products", json!({ "title": "Green Tea", "price": "300" }))
        .await;
    assert_eq!(second.body["slug"], "green-tea-2");
    assert_eq!(second.body["stock"], 0);

    let all = owner.get("/api/products").await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let mut shopper = app.client(host_for("shop1"));
    let public = shopper.get("/api/public/products").await;
    assert_eq!(public.body.as_array().unwrap().len(), 1);

    let path = format!("/api/products/{}", first.body["id"]);
    let updated = owner
        .put(&path, json!({ "title": "Sencha", "discount_price": "200", "is_published": true }))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["title"], "Sencha");
    assert_eq!(updated.body["slug"], "green-tea");

    let invalid = owner.put(&path, json!({ "discount_price": "999" })).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let negative = owner
        .post("/api/products", json!({ "title": "Broken", "price": "10", "stock": -1 }))
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let deleted = owner
        .delete(&format!("/api/products/{}", second.body["id"]))
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let gone = owner
        .get(&format!("/api/products/{}", second.body["id"]))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ordered_product_cannot_be_deleted() {
    let app = TestApp::new();
    let store = app.seed_store("01711000001", "shop1").await;
    let product = app.seed_product(store.id, "P1", "100", 5).await;

    let mut shopper = app.client(host_for("shop1"));
    let placed = shopper
        .post("/api/orders", checkout_body(&[(product.id.as_i64(), 1)], None))
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);

    let mut owner = app.client(host_for("shop1"));
    owner.login("01711000001").await;
    let res = owner.delete(&format!("/api/products/{}", product.id)).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], "conflict");
}

#[tokio::test]
async fn test_management_scope_follows_host() {
    let app = TestApp::new();
    app.seed_store("01711000001", "shop1").await;
    app.seed_store("01711000002", "shop2").await;

    let mut owner = app.client(host_for("shop2"));
    owner.login("01711000001").await;
    let res = owner.get("/api/products").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let mut storeless = app.client(BASE_DOMAIN);
    storeless.login("01711000009").await;
    let res = storeless.get("/api/products").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let mut anonymous = app.client(host_for("shop1"));
    let res = anonymous.get("/api/products").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_shipping_class_management() {
    let app = TestApp::new();
    app.seed_store("01711000001", "shop1").await;

    let mut owner = app.client(host_for("shop1"));
    owner.login("01711000001").await;

    let inside = owner
        .post(
            "/api/shipping-classes",
            json!({ "name": "Inside Dhaka", "cost": "60" }),
        )
        .await;
    assert_eq!(inside.status, StatusCode::CREATED);
    let outside = owner
        .post(
            "/api/shipping-classes",
            json!({ "name": "Outside Dhaka", "name_bn": "ঢাকার বাইরে", "cost": "120" }),
        )
        .await;
    assert_eq!(outside.status, StatusCode::CREATED);

    let negative = owner
        .post("/api/shipping-classes", json!({ "name": "Refund", "cost": "-5" }))
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let res = owner
        .delete(&format!("/api/shipping-classes/{}", outside.body["id"]))
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let all = owner.get("/api/shipping-classes").await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let public = owner.get("/api/public/shipping-classes").await;
    let names: Vec<&str> = public
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Inside Dhaka"]);
}
