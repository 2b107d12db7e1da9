use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::config::{mask_secret, Config};
use crate::ports::OrderStore;

#[derive(Parser)]
#[command(name = "storefront-core")]
#[command(about = "Storefront Core - checkout and payment reconciliation backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Order inspection commands
    #[command(subcommand)]
    Orders(OrderCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// List stored orders, newest first
    List,
}

fn require_database_url(config: &Config) -> anyhow::Result<&str> {
    config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for this command"))
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(require_database_url(config)?).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    println!("Database migrations completed");
    Ok(())
}

pub async fn handle_orders_list(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(require_database_url(config)?).await?;
    let store = crate::adapters::PostgresOrderStore::new(pool);
    let orders = store.list_all().await?;

    if orders.is_empty() {
        println!("No orders found");
        return Ok(());
    }

    println!(
        "{:<38} {:<8} {:>10} {:<30} {:<20}",
        "Order", "Status", "Amount", "Reference", "Updated"
    );
    println!("{}", "-".repeat(110));

    for order in orders {
        println!(
            "{:<38} {:<8} {:>10} {:<30} {:<20}",
            order.id,
            order.status.as_str(),
            order.amount,
            order.payment_reference.as_deref().unwrap_or("-"),
            order.updated_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}

pub async fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!(
        "  Database URL: {}",
        config
            .database_url
            .as_deref()
            .map(mask_password)
            .unwrap_or_else(|| "(unset, in-memory store)".to_string())
    );
    println!("  Frontend URL: {}", config.frontend_url);
    println!("  Stripe API Base: {}", config.stripe.api_base);
    println!("  Stripe Secret Key: {}", mask_secret(&config.stripe.secret_key));
    println!("  Webhook Secret: {}", mask_secret(&config.stripe.webhook_secret));
    println!("  Webhook Tolerance: {}s", config.stripe.webhook_tolerance_secs);
    println!("  CORS Origins: {}", config.cors_allowed_origins.join(", "));

    let pool: Option<PgPool> = match config.database_url.as_deref() {
        Some(url) => Some(crate::db::create_pool(url).await?),
        None => None,
    };

    let report = crate::startup::validate_environment(config, pool.as_ref()).await;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Configuration is invalid");
    }

    tracing::info!("Configuration is valid");
    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}
