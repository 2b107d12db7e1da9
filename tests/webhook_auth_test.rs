mod common;

use axum::http::StatusCode;
use common::{body_json, test_app, webhook_with_header, WEBHOOK_SECRET};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use storefront_core::stripe::signature::sign;
use tower::ServiceExt;

type HmacSha256 = Hmac<Sha256>;

const PAYLOAD: &str = r#"{"id":"evt_1","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[test]
fn test_signature_matches_provider_scheme() {
    let timestamp = 1_717_000_000;
    let header = sign(PAYLOAD.as_bytes(), WEBHOOK_SECRET, timestamp).unwrap();

    let mut mac = HmacSha256::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, PAYLOAD).as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    assert_eq!(header, format!("t={},v1={}", timestamp, expected));
}

#[tokio::test]
async fn test_hand_computed_signature_is_accepted() {
    let app = test_app();
    let timestamp = now();

    let mut mac = HmacSha256::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, PAYLOAD).as_bytes());
    let header = format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()));

    let response = app
        .router
        .oneshot(webhook_with_header(PAYLOAD.to_string(), &header))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_secret_is_unauthorized() {
    let app = test_app();
    let header = sign(PAYLOAD.as_bytes(), "whsec_someone_else", now()).unwrap();

    let response = app
        .router
        .oneshot(webhook_with_header(PAYLOAD.to_string(), &header))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["status"], 401);
}

#[tokio::test]
async fn test_stale_delivery_is_unauthorized() {
    let app = test_app();
    let header = sign(PAYLOAD.as_bytes(), WEBHOOK_SECRET, now() - 3600).unwrap();

    let response = app
        .router
        .oneshot(webhook_with_header(PAYLOAD.to_string(), &header))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_header_is_unauthorized() {
    let app = test_app();

    let response = app
        .router
        .oneshot(webhook_with_header(PAYLOAD.to_string(), "sha256=deadbeef"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signed_garbage_is_bad_request() {
    let app = test_app();
    let payload = "not json at all";
    let header = sign(payload.as_bytes(), WEBHOOK_SECRET, now()).unwrap();

    let response = app
        .router
        .oneshot(webhook_with_header(payload.to_string(), &header))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
