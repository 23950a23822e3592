pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod openapi;
pub mod services;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde_json::json;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::services::{
    CashRegisterService, CategoryService, CustomerService, InventoryService, ItemService,
    PurchaseOrderService, SaleService,
};

/// Per-resource services, constructed once at startup and cloned into the
/// router state. Each holds its own `Arc` to the connection pool.
#[derive(Clone)]
pub struct Services {
    pub categories: CategoryService,
    pub items: ItemService,
    pub customers: CustomerService,
    pub sales: SaleService,
    pub purchase_orders: PurchaseOrderService,
    pub cash_registers: CashRegisterService,
    pub inventory: InventoryService,
}

impl Services {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        Self {
            categories: CategoryService::new(db.clone()),
            items: ItemService::new(db.clone()),
            customers: CustomerService::new(db.clone()),
            sales: SaleService::new(db.clone(), config.allow_negative_stock),
            purchase_orders: PurchaseOrderService::new(db.clone()),
            cash_registers: CashRegisterService::new(db.clone()),
            inventory: InventoryService::new(db),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub services: Services,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Self {
        let services = Services::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

/// All versioned API routes, nested under `/api/v1` by [`build_router`].
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/categories", handlers::categories::routes())
        .nest("/items", handlers::items::routes())
        .nest("/customers", handlers::customers::routes())
        .nest("/sales", handlers::sales::routes())
        .nest("/purchase-orders", handlers::purchase_orders::routes())
        .nest("/cash-registers", handlers::cash_registers::routes())
        .nest("/inventory", handlers::inventory::routes())
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    Json(json!({
        "status": db_status,
        "database": db_status,
        "timestamp": chrono::Utc::now(),
    }))
}

async fn status() -> &'static str {
    "retail-pos-api up"
}

/// The full application router with middleware layers applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
