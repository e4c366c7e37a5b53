//! Refresh token denylist maintenance.

use chrono::Utc;

use sneakpeak_storefront::db::{RevokedTokenRepository, TokenDenylist};

use super::{CliError, connect};

/// Delete denylist rows whose token has expired.
///
/// An expired refresh token fails verification on its own, so its row no
/// longer guards anything.
pub async fn purge() -> Result<(), CliError> {
    let pool = connect().await?;
    let removed = RevokedTokenRepository::new(pool)
        .purge_expired(Utc::now())
        .await?;

    tracing::info!(removed, "Purged expired revoked tokens");
    Ok(())
}
