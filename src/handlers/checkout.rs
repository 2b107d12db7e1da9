use axum::{extract::State, Json};

use crate::error::AppError;
use crate::schemas::{CheckoutSessionResponse, ErrorResponse};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/checkout/create-session",
    responses(
        (status = 200, description = "Hosted checkout session created", body = CheckoutSessionResponse),
        (status = 502, description = "Payment provider error", body = ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    let response = state.checkout.create_checkout_session().await?;
    Ok(Json(response))
}
