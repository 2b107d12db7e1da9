use serde::Deserialize;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::OrderStatus;

pub const PRODUCT_NAME_MAX_LEN: usize = 255;
pub const PAYMENT_REFERENCE_MAX_LEN: usize = 255;
pub const MIN_ORDER_AMOUNT: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be blank"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_min_amount(field: &'static str, amount: i64) -> ValidationResult {
    if amount < MIN_ORDER_AMOUNT {
        return Err(ValidationError::new(
            field,
            format!("must be at least {}", MIN_ORDER_AMOUNT),
        ));
    }

    Ok(())
}

pub fn parse_order_id(field: &'static str, value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ValidationError::new(field, "must be a valid UUID"))
}

pub fn parse_status(field: &'static str, value: &str) -> Result<OrderStatus, ValidationError> {
    value.parse::<OrderStatus>().map_err(|_| {
        let allowed = OrderStatus::ALL.map(|s| s.as_str()).join(", ");
        ValidationError::new(field, format!("must be one of: {}", allowed))
    })
}

fn required<'a, T>(field: &'static str, value: &'a Option<T>) -> Result<&'a T, ValidationError> {
    value
        .as_ref()
        .ok_or_else(|| ValidationError::new(field, "is required"))
}

fn required_text(
    field: &'static str,
    value: &Option<String>,
    max_len: usize,
) -> Result<String, ValidationError> {
    let value = sanitize_string(required(field, value)?);
    validate_required(field, &value)?;
    validate_max_len(field, &value, max_len)?;
    Ok(value)
}

/// Client-reported order outcome, as received on `POST /api/orders`.
///
/// Every field is optional at the wire level so that a missing field is reported
/// as a validation error naming it.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordOrderRequest {
    pub order_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub product_name: Option<String>,
    pub amount: Option<i64>,
    pub status: Option<String>,
}

/// A validated record-order command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOrder {
    pub order_id: Uuid,
    pub payment_reference: String,
    pub product_name: String,
    pub amount: i64,
    pub status: OrderStatus,
}

impl RecordOrderRequest {
    pub fn validate(&self) -> Result<RecordOrder, ValidationError> {
        let order_id = parse_order_id("orderId", required("orderId", &self.order_id)?)?;
        let payment_reference =
            required_text("paymentIntentId", &self.payment_intent_id, PAYMENT_REFERENCE_MAX_LEN)?;
        let product_name = required_text("productName", &self.product_name, PRODUCT_NAME_MAX_LEN)?;
        let amount = *required("amount", &self.amount)?;
        validate_min_amount("amount", amount)?;
        let status = parse_status("status", required("status", &self.status)?)?;

        Ok(RecordOrder {
            order_id,
            payment_reference,
            product_name,
            amount,
            status,
        })
    }
}
