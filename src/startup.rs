use crate::config::Config;
use anyhow::{Context, Result};
use sqlx::PgPool;

pub struct ValidationReport {
    pub environment: bool,
    pub database: Option<bool>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.database.unwrap_or(true)
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        match self.database {
            Some(ok) => println!("Database Connectivity: {}", status(ok)),
            None => println!("Database Connectivity: SKIPPED (in-memory store)"),
        }

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  - {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "PASS" } else { "FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "OK" } else { "FAIL" }
}

/// Checks the loaded configuration and, when a pool is given, database reachability.
pub async fn validate_environment(config: &Config, pool: Option<&PgPool>) -> ValidationReport {
    let mut report = ValidationReport {
        environment: true,
        database: None,
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {:#}", e));
    }

    if let Some(pool) = pool {
        match validate_database(pool).await {
            Ok(()) => report.database = Some(true),
            Err(e) => {
                report.database = Some(false);
                report.errors.push(format!("Database: {:#}", e));
            }
        }
    }

    report
}

fn validate_env_vars(config: &Config) -> Result<()> {
    if config.stripe.secret_key.trim().is_empty() {
        anyhow::bail!("STRIPE_SECRET_KEY is empty");
    }
    if config.stripe.webhook_secret.trim().is_empty() {
        anyhow::bail!("STRIPE_WEBHOOK_SECRET is empty");
    }
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }

    url::Url::parse(&config.frontend_url).context("FRONTEND_URL is not a valid URL")?;
    url::Url::parse(&config.stripe.api_base).context("STRIPE_API_BASE is not a valid URL")?;

    Ok(())
}

async fn validate_database(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Failed to connect to database")?;

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .context("Failed to check migrations table")?;

    if applied == 0 {
        anyhow::bail!("No migrations applied");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StripeSettings;

    fn config() -> Config {
        Config {
            server_port: 8080,
            database_url: None,
            frontend_url: "http://localhost:5173".to_string(),
            stripe: StripeSettings {
                secret_key: "sk_test_123".to_string(),
                webhook_secret: "whsec_123".to_string(),
                api_base: "https://api.stripe.com".to_string(),
                webhook_tolerance_secs: 300,
            },
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
            log_request_body: false,
        }
    }

    #[tokio::test]
    async fn test_valid_config_without_database() {
        let report = validate_environment(&config(), None).await;
        assert!(report.is_valid());
        assert_eq!(report.database, None);
    }

    #[test]
    fn test_validate_env_vars_invalid_frontend_url() {
        let config = Config {
            frontend_url: "not-a-url".to_string(),
            ..config()
        };

        assert!(validate_env_vars(&config).is_err());
    }

    #[test]
    fn test_validate_env_vars_blank_webhook_secret() {
        let mut config = config();
        config.stripe.webhook_secret = "  ".to_string();

        let err = validate_env_vars(&config).unwrap_err();
        assert!(err.to_string().contains("STRIPE_WEBHOOK_SECRET"));
    }
}
