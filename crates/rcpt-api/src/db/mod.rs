//! # Database Persistence Layer
//!
//! Postgres persistence for receipts via SQLx. Optional: when
//! `DATABASE_URL` is unset the service runs on the in-memory store and
//! receipts do not survive restarts.

pub mod receipts;

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

pub use receipts::PgReceiptStore;

/// Connect to Postgres and apply the embedded migrations.
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(&config.url)?;
    let database = config.effective_name(options.get_database()).to_string();
    let options = options.database(&database);

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(options)
        .await?;

    tracing::info!(database = %database, "Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}
