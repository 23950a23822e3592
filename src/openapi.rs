use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Retail POS API",
        version = "1.0.0",
        description = r#"
# Retail Point-of-Sale API

Backend for a two-store retail operation: catalog with categories, items and
variants, sales, purchase orders, cash-register sessions, and an append-only
inventory movement ledger.

## Authentication

All endpoints require a JWT bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20).
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "categories", description = "Category tree management"),
        (name = "items", description = "Catalog items and variants"),
        (name = "customers", description = "Customer lookup"),
        (name = "sales", description = "Point-of-sale transactions"),
        (name = "purchase-orders", description = "Supplier purchase orders"),
        (name = "cash-registers", description = "Cash-register sessions and the cash ledger"),
        (name = "inventory", description = "Item movement ledger")
    ),
    paths(
        crate::handlers::categories::create_category,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        crate::handlers::items::create_item,
        crate::handlers::items::search_items,
        crate::handlers::items::get_item,

        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer,

        crate::handlers::sales::create_sale,
        crate::handlers::sales::list_sales,
        crate::handlers::sales::sales_summary,
        crate::handlers::sales::get_sale,

        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order_status,

        crate::handlers::cash_registers::open_register,
        crate::handlers::cash_registers::close_register,
        crate::handlers::cash_registers::deposit,
        crate::handlers::cash_registers::withdraw,
        crate::handlers::cash_registers::register_status,
        crate::handlers::cash_registers::register_history,

        crate::handlers::inventory::list_movements,
    ),
    components(
        schemas(
            crate::handlers::categories::CreateCategoryRequest,
            crate::handlers::categories::UpdateCategoryRequest,

            crate::services::items::CreateItemRequest,
            crate::services::items::VariantGroupRequest,
            crate::services::items::ItemDetails,

            crate::services::sales::CreateSaleRequest,
            crate::services::sales::SaleLineRequest,
            crate::services::sales::CustomerInfoRequest,
            crate::services::sales::SaleDetails,
            crate::services::sales::SalesSummary,

            crate::services::purchase_orders::CreatePurchaseOrderRequest,
            crate::services::purchase_orders::PurchaseOrderLineRequest,
            crate::services::purchase_orders::PurchaseOrderDetails,
            crate::handlers::purchase_orders::UpdateStatusRequest,

            crate::handlers::cash_registers::OpenRegisterRequest,
            crate::handlers::cash_registers::CloseRegisterRequest,
            crate::handlers::cash_registers::DrawerMovementRequest,
            crate::services::cash_registers::RegisterStatus,
            crate::services::cash_registers::CloseOutcome,
            crate::services::cash_registers::RegisterHistoryEntry,

            crate::entities::category::Model,
            crate::entities::customer::Model,
            crate::entities::item::Model,
            crate::entities::item::Store,
            crate::entities::item_variant::Model,
            crate::entities::item_movement::Model,
            crate::entities::item_movement::MovementType,
            crate::entities::item_movement::MovementStatus,
            crate::entities::sale::Model,
            crate::entities::sale::SaleStatus,
            crate::entities::sale::PaymentMethod,
            crate::entities::sale::PaymentStatus,
            crate::entities::sale_item::Model,
            crate::entities::purchase_order::Model,
            crate::entities::purchase_order::PurchaseOrderStatus,
            crate::entities::purchase_order_item::Model,
            crate::entities::cash_register::Model,
            crate::entities::cash_register::CashRegisterStatus,
            crate::entities::cash_movement::Model,
            crate::entities::cash_movement::CashMovementType,
            crate::entities::cash_movement::CashMovementStatus,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
