use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::CallerIdentity,
    entities::item::Store,
    errors::ServiceError,
    handlers::common::{
        created_response, default_page, default_per_page, success_response, validate_input,
        PaginatedResponse, PaginationParams,
    },
    services::items::{CreateItemRequest, ItemSearch},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ItemSearchQuery {
    pub query: Option<String>,
    pub category_id: Option<Uuid>,
    pub store: Option<Store>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub is_active: Option<bool>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created with generated code and expanded variants"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code collision persisted across retries", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let details = state.services.items.create(payload).await?;
    Ok(created_response(details))
}

#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(PaginationParams),
    responses(
        (status = 200, description = "Item list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn search_items(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Query(query): Query<ItemSearchQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .items
        .search(
            ItemSearch {
                query: query.query,
                category_id: query.category_id,
                store: query.store,
                min_price: query.min_price,
                max_price: query.max_price,
                is_active: query.is_active,
            },
            query.page,
            query.per_page,
        )
        .await?;
    Ok(success_response(PaginatedResponse::new(
        items,
        query.page,
        query.per_page,
        total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item with variants and category"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.items.get(id).await?;
    Ok(success_response(details))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search_items).post(create_item))
        .route("/:id", get(get_item))
}
