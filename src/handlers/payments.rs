use axum::{extract::State, Json};

use crate::error::AppError;
use crate::schemas::{ErrorResponse, PaymentIntentResponse};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/payments/create-intent",
    responses(
        (status = 200, description = "Payment intent created", body = PaymentIntentResponse),
        (status = 502, description = "Payment provider error", body = ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_intent(
    State(state): State<AppState>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let response = state.checkout.create_payment_intent().await?;
    Ok(Json(response))
}
