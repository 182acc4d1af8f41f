//! Checkout and order management end to end.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::sync::Barrier;

use bazaar_integration_tests::{BASE_DOMAIN, TestApp, checkout_body, host_for};
use bazaar_storefront::db::CatalogManagement;
use bazaar_storefront::models::ProductUpdate;

fn dec(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_checkout_prices_order_and_decrements_stock() {
    let app = TestApp::new();
    let shop1 = app.seed_store("01711000001", "shop1").await;
    let p1 = app.seed_product(shop1.id, "P1", "100", 5).await;

    let mut shopper = app.client(host_for("shop1"));
    let res = shopper
        .post("/api/orders", checkout_body(&[(p1.id.as_i64(), 3)], None))
        .await;

    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    assert_eq!(res.body["status"], "pending");
    assert_eq!(dec(&res.body["subtotal"]), Decimal::from(300));
    assert_eq!(dec(&res.body["shipping_cost"]), Decimal::ZERO);
    assert_eq!(dec(&res.body["total"]), Decimal::from(300));
    assert!(res.body["order_number"].as_str().unwrap().starts_with("ORD"));

    let items = res.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_title"], "P1");
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(dec(&items[0]["total"]), Decimal::from(300));

    assert_eq!(app.backend().stock_of(p1.id), Some(2));
}

#[tokio::test]
async fn test_active_shipping_class_is_charged() {
    let app = TestApp::new();
    let shop1 = app.seed_store("01711000001", "shop1").await;
    let p1 = app.seed_product(shop1.id, "P1", "100", 5).await;
    let class = app.seed_shipping_class(shop1.id, "Inside Dhaka", "60").await;

    let mut shopper = app.client(host_for("shop1"));
    let res = shopper
        .post(
            "/api/orders",
            checkout_body(&[(p1.id.as_i64(), 2)], Some(class.id.as_i64())),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(dec(&res.body["shipping_cost"]), Decimal::from(60));
    assert_eq!(dec(&res.body["total"]), Decimal::from(260));
    assert_eq!(res.body["shipping_class_id"], class.id.as_i64());
}

#[tokio::test]
async fn test_deactivated_shipping_class_ships_free() {
    let app = TestApp::new();
    let shop1 = app.seed_store("01711000001", "shop1").await;
    let p1 = app.seed_product(shop1.id, "P1", "100", 5).await;
    let class = app.seed_shipping_class(shop1.id, "Express", "120").await;
    app.backend()
        .deactivate_shipping_class(shop1.id, class.id)
        .await
        .unwrap();

    let mut shopper = app.client(host_for("shop1"));
    let res = shopper
        .post(
            "/api/orders",
            checkout_body(&[(p1.id.as_i64(), 1)], Some(class.id.as_i64())),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(dec(&res.body["shipping_cost"]), Decimal::ZERO);
    assert_eq!(dec(&res.body["total"]), Decimal::from(100));
    assert!(res.body["shipping_class_id"].is_null());
}

#[tokio::test]
async fn test_insufficient_stock_changes_nothing() {
    let app = TestApp::new();
    let shop1 = app.seed_store("01711000001", "shop1").await;
    let p1 = app.seed_product(shop1.id, "P1", "100", 5).await;

    let mut shopper = app.client(host_for("shop1"));
    let res = shopper
        .post("/api/orders", checkout_body(&[(p1.id.as_i64(), 10)], None))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "insufficient_stock");
    assert_eq!(res.body["id"], p1.id.as_i64());
    assert_eq!(app.backend().stock_of(p1.id), Some(5));
    assert_eq!(app.backend().order_count(), 0);
}

#[tokio::test]
async fn test_unpublished_and_foreign_products_are_not_found() {
    let app = TestApp::new();
    let shop1 = app.seed_store("01711000001", "shop1").await;
    let shop2 = app.seed_store("01711000002", "shop2").await;
    let hidden = app.seed_product(shop1.id, "Hidden", "100", 5).await;
    let foreign = app.seed_product(shop2.id, "Foreign", "100", 5).await;
    let visible = app.seed_product(shop1.id, "Visible", "100", 5).await;
    app.backend()
        .update_product(
            shop1.id,
            hidden.id,
            &ProductUpdate {
                is_published: Some(false),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();

    let mut shopper = app.client(host_for("shop1"));
    for product in [&hidden, &foreign] {
        let res = shopper
            .post(
                "/api/orders",
                checkout_body(&[(visible.id.as_i64(), 1), (product.id.as_i64(), 1)], None),
            )
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body["error"], "product_not_found");
        assert_eq!(res.body["id"], product.id.as_i64());
    }

    assert_eq!(app.backend().stock_of(visible.id), Some(5));
    assert_eq!(app.backend().stock_of(foreign.id), Some(5));
    assert_eq!(app.backend().order_count(), 0);
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let app = TestApp::new();
    app.seed_store("01711000001", "shop1").await;

    let mut shopper = app.client(host_for("shop1"));
    let res = shopper.post("/api/orders", checkout_body(&[], None)).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "invalid_request");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_checkouts_cannot_oversell() {
    let app = TestApp::new();
    let shop1 = app.seed_store("01711000001", "shop1").await;
    let p1 = app.seed_product(shop1.id, "Last Units", "100", 4).await;
    // Both checkouts see 4 in stock and race at the commit
    app.backend().gate_commits(Arc::new(Barrier::new(2)));

    let mut first = app.client(host_for("shop1"));
    let mut second = app.client(host_for("shop1"));
    let body = checkout_body(&[(p1.id.as_i64(), 4)], None);

    let (a, b) = tokio::join!(
        first.post("/api/orders", body.clone()),
        second.post("/api/orders", body),
    );

    let mut statuses = [a.status.as_u16(), b.status.as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 400]);
    assert_eq!(app.backend().stock_of(p1.id), Some(0));
    assert_eq!(app.backend().order_count(), 1);
}

#[tokio::test]
async fn test_owner_manages_orders() {
    let app = TestApp::new();
    let shop1 = app.seed_store("01711000001", "shop1").await;
    let p1 = app.seed_product(shop1.id, "P1", "100", 10).await;

    let mut shopper = app.client(host_for("shop1"));
    let placed = shopper
        .post("/api/orders", checkout_body(&[(p1.id.as_i64(), 1)], None))
        .await;
    let order_id = placed.body["id"].as_i64().unwrap();

    let mut owner = app.client(host_for("shop1"));
    owner.login("01711000001").await;

    let list = owner.get("/api/orders").await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body.as_array().unwrap().len(), 1);

    let updated = owner
        .put(
            &format!("/api/orders/{order_id}"),
            json!({ "status": "confirmed", "notes": "Called the customer" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["status"], "confirmed");
    assert_eq!(updated.body["notes"], "Called the customer");

    let pending = owner.get("/api/orders?status=pending").await;
    assert!(pending.body.as_array().unwrap().is_empty());
    let confirmed = owner.get("/api/orders?status=confirmed").await;
    assert_eq!(confirmed.body.as_array().unwrap().len(), 1);

    let detail = owner.get(&format!("/api/orders/{order_id}")).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["items"].as_array().unwrap().len(), 1);

    let missing = owner.get("/api/orders/999999").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["error"], "order_not_found");
}

#[tokio::test]
async fn test_owner_manages_orders_from_base_domain() {
    let app = TestApp::new();
    let shop1 = app.seed_store("01711000001", "shop1").await;
    let p1 = app.seed_product(shop1.id, "P1", "100", 10).await;

    let mut shopper = app.client(host_for("shop1"));
    let placed = shopper
        .post("/api/orders", checkout_body(&[(p1.id.as_i64(), 2)], None))
        .await;
    let path = format!("/api/orders/{}", placed.body["id"]);

    let mut owner = app.client(BASE_DOMAIN);
    owner.login("01711000001").await;

    let list = owner.get("/api/orders").await;
    assert_eq!(list.status, StatusCode::OK, "{:?}", list.body);
    assert_eq!(list.body.as_array().unwrap().len(), 1);

    let detail = owner.get(&path).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["store_id"], shop1.id.as_i64());

    let shipped = owner.put(&path, json!({ "status": "shipped" })).await;
    assert_eq!(shipped.status, StatusCode::OK);
    assert_eq!(shipped.body["status"], "shipped");

    let mut storeless = app.client(BASE_DOMAIN);
    storeless.login("01711000009").await;
    let res = storeless.get("/api/orders").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_any_status_change_is_accepted() {
    let app = TestApp::new();
    let shop1 = app.seed_store("01711000001", "shop1").await;
    let p1 = app.seed_product(shop1.id, "P1", "100", 10).await;

    let mut shopper = app.client(host_for("shop1"));
    let placed = shopper
        .post("/api/orders", checkout_body(&[(p1.id.as_i64(), 1)], None))
        .await;
    let path = format!("/api/orders/{}", placed.body["id"]);

    let mut owner = app.client(host_for("shop1"));
    owner.login("01711000001").await;

    for status in ["delivered", "pending", "cancelled"] {
        let res = owner.put(&path, json!({ "status": status })).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["status"], status);
    }
}

#[tokio::test]
async fn test_orders_are_private_to_the_owner() {
    let app = TestApp::new();
    app.seed_store("01711000001", "shop1").await;
    app.seed_store("01711000002", "shop2").await;

    let mut anonymous = app.client(host_for("shop1"));
    let res = anonymous.get("/api/orders").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let mut other_owner = app.client(host_for("shop1"));
    other_owner.login("01711000002").await;
    let res = other_owner.get("/api/orders").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}
