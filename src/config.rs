use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub frontend_url: String,
    pub stripe: StripeSettings,
    pub cors_allowed_origins: Vec<String>,
    pub log_request_body: bool,
}

/// Credentials and endpoints for the payment provider.
#[derive(Deserialize, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub webhook_tolerance_secs: i64,
}

impl std::fmt::Debug for StripeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeSettings")
            .field("secret_key", &mask_secret(&self.secret_key))
            .field("webhook_secret", &mask_secret(&self.webhook_secret))
            .field("api_base", &self.api_base)
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let frontend_url = env::var("FRONTEND_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());
        let frontend_url = frontend_url.trim_end_matches('/').to_string();

        let cors_allowed_origins = match env::var("CORS_ALLOWED_ORIGINS") {
            Ok(raw) => parse_origins(&raw),
            Err(_) => vec![frontend_url.clone()],
        };

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            frontend_url,
            stripe: StripeSettings {
                secret_key: required_secret("STRIPE_SECRET_KEY")?,
                webhook_secret: required_secret("STRIPE_WEBHOOK_SECRET")?,
                api_base: env::var("STRIPE_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),
                webhook_tolerance_secs: env::var("WEBHOOK_TOLERANCE_SECS")
                    .unwrap_or_else(|_| DEFAULT_WEBHOOK_TOLERANCE_SECS.to_string())
                    .parse()?,
            },
            cors_allowed_origins,
            log_request_body: env::var("LOG_REQUEST_BODY")
                .map(|v| v.parse::<bool>().unwrap_or(false))
                .unwrap_or(false),
        })
    }
}

fn required_secret(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => anyhow::bail!("{} must be configured", name),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.trim_end_matches('/').to_string())
        .collect()
}

/// Keeps the provider key prefix (`sk_test_`, `whsec_`) visible and hides the rest.
pub fn mask_secret(secret: &str) -> String {
    match secret.find('_') {
        Some(idx) if secret.len() > idx + 5 => {
            let prefix_end = secret[idx + 1..]
                .find('_')
                .map(|second| idx + 1 + second + 1)
                .unwrap_or(idx + 1);
            format!("{}****", &secret[..prefix_end])
        }
        _ => "****".to_string(),
    }
}
