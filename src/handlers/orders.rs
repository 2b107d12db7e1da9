use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use uuid::Uuid;

use crate::domain::Order;
use crate::error::AppError;
use crate::schemas::ErrorResponse;
use crate::validation::RecordOrderRequest;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "All stored orders", body = [Order])
    ),
    tag = "Orders"
)]
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orders.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order", body = Order),
        (status = 404, description = "Unknown order", body = ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orders.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = RecordOrderRequest,
    responses(
        (status = 200, description = "Order recorded", body = Order),
        (status = 400, description = "Validation failure", body = ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn record_order(
    State(state): State<AppState>,
    payload: Result<Json<RecordOrderRequest>, JsonRejection>,
) -> Result<Json<Order>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let cmd = request.validate()?;
    Ok(Json(state.orders.record(cmd).await?))
}
