//! Connection pool construction and schema migrations.

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Settings;
use crate::error::Result;

/// Build a connection pool sized for `settings.max_workers` concurrent
/// outbound jobs plus headroom for HTTP request handlers.
pub async fn connect(settings: &Settings) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections((settings.max_workers as u32).max(5) + 10)
        .connect(&settings.database_url)
        .await?;
    Ok(pool)
}

/// Apply schema migrations embedded at compile time.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| crate::error::AppError::Fatal(format!("migration failed: {e}")))?;
    Ok(())
}
