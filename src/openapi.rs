use utoipa::OpenApi;

use crate::domain::{Order, OrderStatus};
use crate::handlers;
use crate::schemas::{CheckoutSessionResponse, ErrorResponse, HealthStatus, PaymentIntentResponse};
use crate::validation::RecordOrderRequest;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::checkout::create_session,
        handlers::payments::create_intent,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::record_order,
        handlers::webhook::receive,
    ),
    components(schemas(
        Order,
        OrderStatus,
        RecordOrderRequest,
        CheckoutSessionResponse,
        PaymentIntentResponse,
        ErrorResponse,
        HealthStatus,
    )),
    tags(
        (name = "Checkout", description = "Hosted checkout sessions"),
        (name = "Payments", description = "Embedded payment intents"),
        (name = "Orders", description = "Order records"),
        (name = "Webhooks", description = "Provider event intake"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;
