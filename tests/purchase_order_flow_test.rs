//! Purchase order integration tests: numbering, the status machine, and
//! receipt side effects.

mod common;

use axum::http::Method;
use chrono::{Datelike, Utc};
use common::{decimal_of, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn year_suffix() -> String {
    format!("{:02}", Utc::now().year() % 100)
}

async fn seed_catalog(app: &TestApp) -> (String, String) {
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/categories",
            Some(json!({ "name": "Shirts", "code": "SHIRTS" })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let category = response_json(response).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/items",
            Some(json!({
                "description": "Linen shirt",
                "categoryId": category["id"],
                "store": "Mini Queen",
                "purchasePrice": "10.00",
                "sellingPrice": "25.50",
                "variantGroups": [{ "name": "size", "values": ["M"] }],
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let item = response_json(response).await;
    let item_id = item["id"].as_str().unwrap().to_string();
    let variant_id = item["variants"][0]["id"].as_str().unwrap().to_string();
    (item_id, variant_id)
}

async fn create_order(app: &TestApp, item_id: &str, variant_id: &str, quantity: i32) -> Value {
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": quantity,
                    "unitPrice": "12.00",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    response_json(response).await
}

async fn set_status(app: &TestApp, order_id: &str, status: &str) -> axum::response::Response {
    app.request_authenticated(
        Method::PUT,
        &format!("/api/v1/purchase-orders/{order_id}/status"),
        Some(json!({ "status": status })),
    )
    .await
}

#[tokio::test]
async fn order_numbers_are_sequential() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;

    let yy = year_suffix();
    let first = create_order(&app, &item_id, &variant_id, 5).await;
    assert_eq!(first["orderNumber"], format!("PO-{yy}-0001"));
    assert_eq!(first["status"], "DRAFT");

    let second = create_order(&app, &item_id, &variant_id, 5).await;
    assert_eq!(second["orderNumber"], format!("PO-{yy}-0002"));
}

#[tokio::test]
async fn receipt_applies_stock_and_price_side_effects_once() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;

    let order = create_order(&app, &item_id, &variant_id, 10).await;
    let order_id = order["id"].as_str().unwrap();
    assert_eq!(order["items"][0]["receivedQuantity"], 0);

    let response = set_status(&app, order_id, "ORDERED").await;
    assert_eq!(response.status(), 200);

    // Ordering alone moves no stock.
    let item_resp = app
        .request_authenticated(Method::GET, &format!("/api/v1/items/{item_id}"), None)
        .await;
    let item = response_json(item_resp).await;
    assert_eq!(item["variants"][0]["stockQuantity"], 0);

    let response = set_status(&app, order_id, "RECEIVED").await;
    assert_eq!(response.status(), 200);
    let received = response_json(response).await;
    assert!(received["actualDeliveryDate"].is_string());
    assert_eq!(received["items"][0]["receivedQuantity"], 10);

    // Receipt adds stock and overwrites the variant purchase price.
    let item_resp = app
        .request_authenticated(Method::GET, &format!("/api/v1/items/{item_id}"), None)
        .await;
    let item = response_json(item_resp).await;
    assert_eq!(item["variants"][0]["stockQuantity"], 10);
    assert_eq!(decimal_of(&item["variants"][0]["purchasePrice"]), dec!(12.00));

    // Exactly one PURCHASE ledger row, referencing the order.
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/inventory/movements?item_id={item_id}&movement_type=PURCHASE"),
            None,
        )
        .await;
    let body = response_json(response).await;
    let movements = body["data"].as_array().unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0]["quantity"], 10);
    assert_eq!(movements[0]["previousQuantity"], 0);
    assert_eq!(movements[0]["newQuantity"], 10);
    assert_eq!(movements[0]["referenceType"], "PURCHASE_ORDER");
    assert_eq!(movements[0]["referenceId"].as_str().unwrap(), order_id);
}

#[tokio::test]
async fn draft_cannot_jump_straight_to_received() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;
    let order = create_order(&app, &item_id, &variant_id, 5).await;
    let order_id = order["id"].as_str().unwrap();

    let response = set_status(&app, order_id, "RECEIVED").await;
    assert_eq!(response.status(), 400);

    // The failed transition left no stock behind.
    let item_resp = app
        .request_authenticated(Method::GET, &format!("/api/v1/items/{item_id}"), None)
        .await;
    let item = response_json(item_resp).await;
    assert_eq!(item["variants"][0]["stockQuantity"], 0);
}

#[tokio::test]
async fn cancelled_orders_are_terminal() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;
    let order = create_order(&app, &item_id, &variant_id, 5).await;
    let order_id = order["id"].as_str().unwrap();

    let response = set_status(&app, order_id, "CANCELLED").await;
    assert_eq!(response.status(), 200);

    for target in ["DRAFT", "ORDERED", "RECEIVED"] {
        let response = set_status(&app, order_id, target).await;
        assert_eq!(response.status(), 400, "CANCELLED -> {target} must fail");
    }
}

#[tokio::test]
async fn received_orders_can_still_be_cancelled_without_reversal() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;
    let order = create_order(&app, &item_id, &variant_id, 4).await;
    let order_id = order["id"].as_str().unwrap();

    assert_eq!(set_status(&app, order_id, "ORDERED").await.status(), 200);
    assert_eq!(set_status(&app, order_id, "RECEIVED").await.status(), 200);
    assert_eq!(set_status(&app, order_id, "CANCELLED").await.status(), 200);

    // Cancelling after receipt is an administrative flag; stock stays.
    let item_resp = app
        .request_authenticated(Method::GET, &format!("/api/v1/items/{item_id}"), None)
        .await;
    let item = response_json(item_resp).await;
    assert_eq!(item["variants"][0]["stockQuantity"], 4);
}

#[tokio::test]
async fn totals_are_line_sums() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "items": [
                    {
                        "itemId": item_id,
                        "itemVariantId": variant_id,
                        "quantity": 10,
                        "unitPrice": "12.00",
                        "discountAmount": "5.00",
                        "taxAmount": "2.40",
                    },
                    {
                        "itemId": item_id,
                        "quantity": 2,
                        "unitPrice": "8.00",
                    },
                ],
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let order = response_json(response).await;
    assert_eq!(decimal_of(&order["totalAmount"]), dec!(136.00));
    assert_eq!(decimal_of(&order["discountAmount"]), dec!(5.00));
    assert_eq!(decimal_of(&order["taxAmount"]), dec!(2.40));
    assert_eq!(decimal_of(&order["finalAmount"]), dec!(133.40));
}

#[tokio::test]
async fn zero_quantity_lines_are_rejected() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": 0,
                    "unitPrice": "12.00",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unknown_items_are_rejected() {
    let app = TestApp::new().await;
    seed_catalog(&app).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "items": [{
                    "itemId": uuid::Uuid::new_v4(),
                    "quantity": 1,
                    "unitPrice": "12.00",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 404);
}
