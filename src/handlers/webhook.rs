use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::error::AppError;
use crate::schemas::{ErrorResponse, WEBHOOK_ACK};
use crate::stripe::signature::SIGNATURE_HEADER;
use crate::AppState;

/// Receives provider events. The raw body is needed for signature verification,
/// so it is taken as bytes rather than JSON.
///
/// Events that carry nothing actionable are still acknowledged with 200 so the
/// provider does not redeliver them.
#[utoipa::path(
    post,
    path = "/webhook",
    request_body(content = String, description = "Raw provider event payload"),
    params(("Stripe-Signature" = String, Header, description = "Provider signature")),
    responses(
        (status = 200, description = "Event accepted", body = String),
        (status = 400, description = "Malformed event or metadata", body = ErrorResponse),
        (status = 401, description = "Signature verification failed", body = ErrorResponse)
    ),
    tag = "Webhooks"
)]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    state.reconciler.handle(&body, signature).await?;
    Ok((StatusCode::OK, WEBHOOK_ACK))
}
