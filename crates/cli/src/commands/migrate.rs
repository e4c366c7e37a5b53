//! Database migration command.
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded at
//! compile time. The storefront never applies them on startup.

use super::{CliError, connect};

/// Apply pending storefront migrations.
pub async fn storefront() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
