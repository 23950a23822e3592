//! Cash register integration tests: session lifecycle, the drawer balance
//! fold, and the cash-sale hookup.

mod common;

use axum::http::Method;
use common::{decimal_of, response_json, TestApp};
use retail_pos_api::services::cash_registers::record_cash_return;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn open_register(app: &TestApp, opening: &str) -> axum::response::Response {
    app.request_authenticated(
        Method::POST,
        "/api/v1/cash-registers/open",
        Some(json!({ "openingAmount": opening })),
    )
    .await
}

async fn register_status(app: &TestApp) -> Value {
    let response = app
        .request_authenticated(Method::GET, "/api/v1/cash-registers/status", None)
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await
}

/// Seeds one variantless item so cash sales can be made.
async fn seed_item(app: &TestApp) -> String {
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
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let item = response_json(response).await;
    item["id"].as_str().unwrap().to_string()
}

async fn cash_sale(app: &TestApp, item_id: &str, quantity: i32) -> axum::response::Response {
    app.request_authenticated(
        Method::POST,
        "/api/v1/sales",
        Some(json!({
            "paymentMethod": "CASH",
            "paymentStatus": "PAID",
            "items": [{
                "itemId": item_id,
                "quantity": quantity,
                "unitPrice": "25.50",
            }],
        })),
    )
    .await
}

#[tokio::test]
async fn open_deposit_withdraw_close_reconciles() {
    let app = TestApp::new().await;

    let response = open_register(&app, "100.00").await;
    assert_eq!(response.status(), 201);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cash-registers/deposit",
            Some(json!({ "amount": "50.00", "notes": "change float" })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let movement = response_json(response).await;
    assert_eq!(decimal_of(&movement["previousBalance"]), dec!(100.00));
    assert_eq!(decimal_of(&movement["newBalance"]), dec!(150.00));

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cash-registers/withdraw",
            Some(json!({ "amount": "30.00" })),
        )
        .await;
    assert_eq!(response.status(), 201);

    let status = register_status(&app).await;
    assert_eq!(status["isOpen"], true);
    assert_eq!(decimal_of(&status["currentBalance"]), dec!(120.00));

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cash-registers/close",
            Some(json!({ "actualAmount": "120.00" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let outcome = response_json(response).await;
    assert_eq!(decimal_of(&outcome["expectedAmount"]), dec!(120.00));
    assert_eq!(decimal_of(&outcome["actualAmount"]), dec!(120.00));
    assert_eq!(decimal_of(&outcome["difference"]), dec!(0));
    assert_eq!(outcome["register"]["status"], "CLOSED");

    let status = register_status(&app).await;
    assert_eq!(status["isOpen"], false);
    assert!(status["register"].is_null());
}

#[tokio::test]
async fn close_folds_movements_made_during_the_session() {
    let app = TestApp::new().await;
    assert_eq!(open_register(&app, "50.00").await.status(), 201);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cash-registers/deposit",
            Some(json!({ "amount": "25.00" })),
        )
        .await;
    assert_eq!(response.status(), 201);

    // The expected amount is folded when the close runs, not earlier.
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cash-registers/close",
            Some(json!({ "actualAmount": "80.00" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let outcome = response_json(response).await;
    assert_eq!(decimal_of(&outcome["expectedAmount"]), dec!(75.00));
    assert_eq!(decimal_of(&outcome["difference"]), dec!(5.00));
}

#[tokio::test]
async fn shortfall_shows_as_negative_difference() {
    let app = TestApp::new().await;
    assert_eq!(open_register(&app, "100.00").await.status(), 201);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cash-registers/close",
            Some(json!({ "actualAmount": "90.00" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let outcome = response_json(response).await;
    assert_eq!(decimal_of(&outcome["difference"]), dec!(-10.00));
}

#[tokio::test]
async fn a_second_open_register_is_rejected() {
    let app = TestApp::new().await;
    assert_eq!(open_register(&app, "100.00").await.status(), 201);
    assert_eq!(open_register(&app, "50.00").await.status(), 400);
}

#[tokio::test]
async fn negative_opening_amounts_are_rejected() {
    let app = TestApp::new().await;
    assert_eq!(open_register(&app, "-1.00").await.status(), 400);
}

#[tokio::test]
async fn withdrawals_cannot_exceed_the_balance() {
    let app = TestApp::new().await;
    assert_eq!(open_register(&app, "20.00").await.status(), 201);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cash-registers/withdraw",
            Some(json!({ "amount": "20.01" })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let status = register_status(&app).await;
    assert_eq!(decimal_of(&status["currentBalance"]), dec!(20.00));
}

#[tokio::test]
async fn drawer_movements_require_an_open_register() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cash-registers/deposit",
            Some(json!({ "amount": "10.00" })),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn paid_cash_sales_flow_into_the_drawer() {
    let app = TestApp::new().await;
    let item_id = seed_item(&app).await;
    assert_eq!(open_register(&app, "100.00").await.status(), 201);

    let response = cash_sale(&app, &item_id, 1).await;
    assert_eq!(response.status(), 201);

    let status = register_status(&app).await;
    assert_eq!(decimal_of(&status["currentBalance"]), dec!(125.50));

    // The SALE movement references the sale and snapshots the balance.
    let response = app
        .request_authenticated(Method::GET, "/api/v1/cash-registers/history", None)
        .await;
    assert_eq!(response.status(), 200);
    let history = response_json(response).await;
    let movements = history["data"][0]["movements"].as_array().unwrap();
    let sale_movement = movements
        .iter()
        .find(|m| m["movementType"] == "SALE")
        .expect("sale movement recorded");
    assert_eq!(decimal_of(&sale_movement["previousBalance"]), dec!(100.00));
    assert_eq!(decimal_of(&sale_movement["newBalance"]), dec!(125.50));
    assert_eq!(sale_movement["referenceType"], "SALE");
}

#[tokio::test]
async fn cash_sales_without_an_open_register_still_complete() {
    let app = TestApp::new().await;
    let item_id = seed_item(&app).await;

    let response = cash_sale(&app, &item_id, 1).await;
    assert_eq!(response.status(), 201);

    // No session, so nothing reached any cash ledger.
    let response = app
        .request_authenticated(Method::GET, "/api/v1/cash-registers/history", None)
        .await;
    let history = response_json(response).await;
    assert_eq!(history["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn cash_returns_need_the_money_to_be_in_the_drawer() {
    let app = TestApp::new().await;
    assert_eq!(open_register(&app, "20.00").await.status(), 201);

    let db = &*app.state.db;
    let sale_id = uuid::Uuid::new_v4();

    let err = record_cash_return(db, "test-user", dec!(25.50), sale_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        retail_pos_api::errors::ServiceError::ValidationError(_)
    ));

    let movement = record_cash_return(db, "test-user", dec!(10.00), sale_id)
        .await
        .unwrap()
        .expect("open register takes the return");
    assert_eq!(movement.previous_balance, dec!(20.00));
    assert_eq!(movement.new_balance, dec!(10.00));

    let status = register_status(&app).await;
    assert_eq!(decimal_of(&status["currentBalance"]), dec!(10.00));

    // Without an open session the return is skipped, same as cash sales.
    let skipped = record_cash_return(db, "someone-else", dec!(1.00), sale_id)
        .await
        .unwrap();
    assert!(skipped.is_none());
}

#[tokio::test]
async fn history_lists_sessions_most_recent_first() {
    let app = TestApp::new().await;

    assert_eq!(open_register(&app, "10.00").await.status(), 201);
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cash-registers/close",
            Some(json!({ "actualAmount": "10.00" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    assert_eq!(open_register(&app, "20.00").await.status(), 201);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/cash-registers/history", None)
        .await;
    let history = response_json(response).await;
    let sessions = history["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(decimal_of(&sessions[0]["register"]["openingAmount"]), dec!(20.00));
    assert_eq!(decimal_of(&sessions[1]["register"]["openingAmount"]), dec!(10.00));

    // Each session carries its own movement trail, oldest first.
    let first_session = &sessions[1];
    let types: Vec<&str> = first_session["movements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["movementType"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["OPENING", "CLOSING"]);
}
