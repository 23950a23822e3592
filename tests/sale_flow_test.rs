//! Sale integration tests: totals, stock effects, the movement ledger, and
//! customer resolution.

mod common;

use axum::http::Method;
use common::{decimal_of, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

/// Seeds a category and one Mini Queen item with a single size variant.
/// Returns `(item_id, variant_id)`.
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

/// Puts stock on a variant by creating and receiving a purchase order.
async fn receive_stock(app: &TestApp, item_id: &str, variant_id: &str, quantity: i32) {
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": quantity,
                    "unitPrice": "10.00",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let order = response_json(response).await;
    let order_id = order["id"].as_str().unwrap();

    for status in ["ORDERED", "RECEIVED"] {
        let response = app
            .request_authenticated(
                Method::PUT,
                &format!("/api/v1/purchase-orders/{order_id}/status"),
                Some(json!({ "status": status })),
            )
            .await;
        assert_eq!(response.status(), 200);
    }
}

async fn get_variant(app: &TestApp, item_id: &str, variant_id: &str) -> Value {
    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/items/{item_id}"), None)
        .await;
    assert_eq!(response.status(), 200);
    let item = response_json(response).await;
    item["variants"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["id"] == variant_id)
        .cloned()
        .expect("variant present")
}

#[tokio::test]
async fn completed_sale_decrements_stock_and_writes_the_ledger() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;
    receive_stock(&app, &item_id, &variant_id, 10).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "paymentMethod": "CARD",
                "paymentStatus": "PAID",
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": 3,
                    "unitPrice": "25.50",
                    "discountAmount": "0.50",
                    "taxAmount": "1.00",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let sale = response_json(response).await;

    // Totals are line sums: total 76.50, minus 0.50 discount, plus 1.00 tax.
    assert_eq!(decimal_of(&sale["totalAmount"]), dec!(76.50));
    assert_eq!(decimal_of(&sale["discountAmount"]), dec!(0.50));
    assert_eq!(decimal_of(&sale["taxAmount"]), dec!(1.00));
    assert_eq!(decimal_of(&sale["finalAmount"]), dec!(77.00));
    assert_eq!(sale["status"], "COMPLETED");

    let variant = get_variant(&app, &item_id, &variant_id).await;
    assert_eq!(variant["stockQuantity"], 7);

    // The SALE ledger row carries before/after snapshots of variant stock.
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/inventory/movements?item_variant_id={variant_id}&movement_type=SALE"),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let movements = body["data"].as_array().unwrap();
    assert_eq!(movements.len(), 1);
    let movement = &movements[0];
    assert_eq!(movement["quantity"], -3);
    assert_eq!(movement["previousQuantity"], 10);
    assert_eq!(movement["newQuantity"], 7);
    assert_eq!(movement["referenceType"], "SALE");
    assert_eq!(movement["referenceId"], sale["id"]);
}

#[tokio::test]
async fn snapshots_stay_consistent_on_variant_rows() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;
    receive_stock(&app, &item_id, &variant_id, 5).await;

    for _ in 0..3 {
        let response = app
            .request_authenticated(
                Method::POST,
                "/api/v1/sales",
                Some(json!({
                    "paymentMethod": "CARD",
                    "paymentStatus": "PAID",
                    "items": [{
                        "itemId": item_id,
                        "itemVariantId": variant_id,
                        "quantity": 2,
                        "unitPrice": "25.50",
                    }],
                })),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/inventory/movements?item_variant_id={variant_id}"),
            None,
        )
        .await;
    let body = response_json(response).await;
    for movement in body["data"].as_array().unwrap() {
        if movement["itemVariantId"].is_null() {
            continue;
        }
        let previous = movement["previousQuantity"].as_i64().unwrap();
        let quantity = movement["quantity"].as_i64().unwrap();
        let new = movement["newQuantity"].as_i64().unwrap();
        assert_eq!(new, previous + quantity);
    }
}

#[tokio::test]
async fn oversell_drives_stock_negative_by_default() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "paymentMethod": "CASH",
                "paymentStatus": "PAID",
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": 5,
                    "unitPrice": "25.50",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 201);

    let variant = get_variant(&app, &item_id, &variant_id).await;
    assert_eq!(variant["stockQuantity"], -5);
}

#[tokio::test]
async fn oversell_is_rejected_when_negative_stock_is_disallowed() {
    let app = TestApp::with_config(|cfg| cfg.allow_negative_stock = false).await;
    let (item_id, variant_id) = seed_catalog(&app).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "paymentMethod": "CASH",
                "paymentStatus": "PAID",
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": 5,
                    "unitPrice": "25.50",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 400);

    // Nothing was written.
    let variant = get_variant(&app, &item_id, &variant_id).await;
    assert_eq!(variant["stockQuantity"], 0);
}

#[tokio::test]
async fn variant_is_required_when_the_item_has_variants() {
    let app = TestApp::new().await;
    let (item_id, _variant_id) = seed_catalog(&app).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "paymentMethod": "CASH",
                "paymentStatus": "PAID",
                "items": [{
                    "itemId": item_id,
                    "quantity": 1,
                    "unitPrice": "25.50",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unpaid_sale_increases_the_customer_balance() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer": { "name": "Maria", "phone": "555-0100" },
                "paymentMethod": "CARD",
                "paymentStatus": "PENDING",
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": 2,
                    "unitPrice": "25.50",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let sale = response_json(response).await;
    let customer = &sale["customer"];
    assert_eq!(customer["name"], "Maria");
    assert_eq!(decimal_of(&customer["currentBalance"]), dec!(51.00));

    // A later sale for the same phone reuses the customer and accumulates.
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer": { "phone": "555-0100" },
                "paymentMethod": "CARD",
                "paymentStatus": "PENDING",
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": 1,
                    "unitPrice": "25.50",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let sale = response_json(response).await;
    assert_eq!(sale["customer"]["id"], customer["id"]);
    assert_eq!(decimal_of(&sale["customer"]["currentBalance"]), dec!(76.50));
}

#[tokio::test]
async fn anonymous_sales_fall_back_to_the_walk_in_customer() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "paymentMethod": "CASH",
                "paymentStatus": "PAID",
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": 1,
                    "unitPrice": "25.50",
                }],
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let sale = response_json(response).await;
    assert_eq!(sale["customer"]["name"], "Walk-in Customer");

    // Only one walk-in row is ever created.
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "paymentMethod": "CASH",
                "paymentStatus": "PAID",
                "items": [{
                    "itemId": item_id,
                    "itemVariantId": variant_id,
                    "quantity": 1,
                    "unitPrice": "25.50",
                }],
            })),
        )
        .await;
    let second = response_json(response).await;
    assert_eq!(second["customer"]["id"], sale["customer"]["id"]);
}

#[tokio::test]
async fn summary_aggregates_completed_sales() {
    let app = TestApp::new().await;
    let (item_id, variant_id) = seed_catalog(&app).await;

    for quantity in [1, 3] {
        let response = app
            .request_authenticated(
                Method::POST,
                "/api/v1/sales",
                Some(json!({
                    "paymentMethod": "CASH",
                    "paymentStatus": "PAID",
                    "items": [{
                        "itemId": item_id,
                        "itemVariantId": variant_id,
                        "quantity": quantity,
                        "unitPrice": "25.50",
                    }],
                })),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let response = app
        .request_authenticated(Method::GET, "/api/v1/sales/summary", None)
        .await;
    assert_eq!(response.status(), 200);
    let summary = response_json(response).await;
    assert_eq!(summary["orderCount"], 2);
    assert_eq!(decimal_of(&summary["totalSales"]), dec!(102.00));
    assert_eq!(decimal_of(&summary["averageOrderValue"]), dec!(51.00));
}

#[tokio::test]
async fn empty_sales_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "paymentMethod": "CASH",
                "paymentStatus": "PAID",
                "items": [],
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}
