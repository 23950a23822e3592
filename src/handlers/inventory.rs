use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::CallerIdentity,
    entities::item_movement::MovementType,
    errors::ServiceError,
    handlers::common::{
        default_page, default_per_page, success_response, PaginatedResponse, PaginationParams,
    },
    services::inventory::MovementFilter,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct MovementListQuery {
    pub item_id: Option<Uuid>,
    pub item_variant_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/movements",
    params(PaginationParams),
    responses(
        (status = 200, description = "Movement ledger, newest first"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Query(query): Query<MovementListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (movements, total) = state
        .services
        .inventory
        .list_movements(
            MovementFilter {
                item_id: query.item_id,
                item_variant_id: query.item_variant_id,
                movement_type: query.movement_type,
            },
            query.page,
            query.per_page,
        )
        .await?;
    Ok(success_response(PaginatedResponse::new(
        movements,
        query.page,
        query.per_page,
        total,
    )))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/movements", get(list_movements))
}
