use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::CallerIdentity,
    errors::ServiceError,
    handlers::common::{
        created_response, success_response, validate_input, PaginatedResponse, PaginationParams,
    },
    AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenRegisterRequest {
    pub opening_amount: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloseRegisterRequest {
    pub actual_amount: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawerMovementRequest {
    pub amount: Decimal,
    pub notes: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/cash-registers/open",
    request_body = OpenRegisterRequest,
    responses(
        (status = 201, description = "Register opened"),
        (status = 400, description = "Negative opening amount or a register is already open", body = crate::errors::ErrorResponse)
    ),
    tag = "cash-registers"
)]
pub async fn open_register(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(payload): Json<OpenRegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let register = state
        .services
        .cash_registers
        .open(&caller.user_id, payload.opening_amount, payload.notes)
        .await?;
    Ok(created_response(register))
}

#[utoipa::path(
    post,
    path = "/api/v1/cash-registers/close",
    request_body = CloseRegisterRequest,
    responses(
        (status = 200, description = "Register closed with reconciliation figures", body = crate::services::cash_registers::CloseOutcome),
        (status = 404, description = "No open register for this user", body = crate::errors::ErrorResponse)
    ),
    tag = "cash-registers"
)]
pub async fn close_register(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(payload): Json<CloseRegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let outcome = state
        .services
        .cash_registers
        .close(&caller.user_id, payload.actual_amount, payload.notes)
        .await?;
    Ok(success_response(outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/cash-registers/deposit",
    request_body = DrawerMovementRequest,
    responses(
        (status = 201, description = "Deposit recorded"),
        (status = 400, description = "Amount must be greater than zero", body = crate::errors::ErrorResponse),
        (status = 404, description = "No open register for this user", body = crate::errors::ErrorResponse)
    ),
    tag = "cash-registers"
)]
pub async fn deposit(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(payload): Json<DrawerMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let movement = state
        .services
        .cash_registers
        .deposit(&caller.user_id, payload.amount, payload.notes)
        .await?;
    Ok(created_response(movement))
}

#[utoipa::path(
    post,
    path = "/api/v1/cash-registers/withdraw",
    request_body = DrawerMovementRequest,
    responses(
        (status = 201, description = "Withdrawal recorded"),
        (status = 400, description = "Amount invalid or exceeds the drawer balance", body = crate::errors::ErrorResponse),
        (status = 404, description = "No open register for this user", body = crate::errors::ErrorResponse)
    ),
    tag = "cash-registers"
)]
pub async fn withdraw(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(payload): Json<DrawerMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let movement = state
        .services
        .cash_registers
        .withdraw(&caller.user_id, payload.amount, payload.notes)
        .await?;
    Ok(created_response(movement))
}

#[utoipa::path(
    get,
    path = "/api/v1/cash-registers/status",
    responses(
        (status = 200, description = "Open register and folded balance, or closed state", body = crate::services::cash_registers::RegisterStatus),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "cash-registers"
)]
pub async fn register_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<impl IntoResponse, ServiceError> {
    let status = state.services.cash_registers.status(&caller.user_id).await?;
    Ok(success_response(status))
}

#[utoipa::path(
    get,
    path = "/api/v1/cash-registers/history",
    params(PaginationParams),
    responses(
        (status = 200, description = "Past sessions with their movements, most recent first"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "cash-registers"
)]
pub async fn register_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (entries, total) = state
        .services
        .cash_registers
        .history(&caller.user_id, pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        entries,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/open", post(open_register))
        .route("/close", post(close_register))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/status", get(register_status))
        .route("/history", get(register_history))
}
