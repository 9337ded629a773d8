//! Database migration command.
//!
//! Applies `crates/api/migrations/` in order. The compound unique index on
//! contacts is not part of the migrations; the API builds it at startup, or
//! run `contacts-cli indexes sync`.

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `CommandError` if the connection or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
