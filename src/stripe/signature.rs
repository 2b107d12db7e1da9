//! Webhook signature verification.
//!
//! The provider signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends
//! `Stripe-Signature: t=<unix seconds>,v1=<hex digest>[,v1=<hex digest>...]`.
//! Several `v1` entries appear while a signing secret is being rolled.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing Stripe-Signature header")]
    MissingHeader,

    #[error("malformed signature header")]
    MalformedHeader,

    #[error("signature timestamp outside the tolerance window")]
    TimestampOutOfTolerance,

    #[error("no signature matches the payload")]
    Mismatch,

    #[error("invalid webhook secret configuration")]
    InvalidSecret,
}

/// Parsed form of the signature header.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: &'a str,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',').map(str::trim) {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(s) = part.strip_prefix("v1=") {
            signatures.push(s);
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader {
            timestamp,
            signatures,
        }),
        _ => Err(SignatureError::MalformedHeader),
    }
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verifies `header` against the raw `payload`.
///
/// `tolerance_secs <= 0` disables the timestamp window check. Digest comparison is
/// constant-time (`Mac::verify_slice`).
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let header = parse_header(header)?;

    let timestamp: i64 = header
        .timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;

    if tolerance_secs > 0 {
        // `t` is unauthenticated at this point, so the age may not fit in an i64.
        let age = now.checked_sub(timestamp);
        let within = age.is_some_and(|age| age.unsigned_abs() <= tolerance_secs.unsigned_abs());
        if !within {
            tracing::warn!(
                age_secs = ?age,
                tolerance_secs,
                "Webhook signature timestamp outside tolerance"
            );
            return Err(SignatureError::TimestampOutOfTolerance);
        }
    }

    let mac = signed_mac(secret, header.timestamp, payload)?;

    let matched = header
        .signatures
        .iter()
        .filter_map(|candidate| hex::decode(candidate).ok())
        .any(|expected| mac.clone().verify_slice(&expected).is_ok());

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Produces a header value the way the provider does. Used to sign fixtures
/// for tests and local replay tooling.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let timestamp = timestamp.to_string();
    let mac = signed_mac(secret, &timestamp, payload)?;
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}
