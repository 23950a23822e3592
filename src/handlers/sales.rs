use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::CallerIdentity,
    entities::sale::{PaymentMethod, SaleStatus},
    errors::ServiceError,
    handlers::common::{
        created_response, default_page, default_per_page, success_response, validate_input,
        PaginatedResponse, PaginationParams,
    },
    services::sales::{CreateSaleRequest, SaleFilter},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SaleListQuery {
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale completed"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item or variant not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let details = state
        .services
        .sales
        .create_sale(&caller.user_id, payload)
        .await?;
    Ok(created_response(details))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(PaginationParams),
    responses(
        (status = 200, description = "Sale list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Query(query): Query<SaleListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (sales, total) = state
        .services
        .sales
        .list(
            SaleFilter {
                status: query.status,
                payment_method: query.payment_method,
                from: query.from,
                to: query.to,
            },
            query.page,
            query.per_page,
        )
        .await?;
    Ok(success_response(PaginatedResponse::new(
        sales,
        query.page,
        query.per_page,
        total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/summary",
    responses(
        (status = 200, description = "Aggregate figures over completed sales", body = crate::services::sales::SalesSummary),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn sales_summary(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.sales.summary(query.from, query.to).await?;
    Ok(success_response(summary))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale with lines and customer"),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.sales.get(id).await?;
    Ok(success_response(details))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/summary", get(sales_summary))
        .route("/:id", get(get_sale))
}
