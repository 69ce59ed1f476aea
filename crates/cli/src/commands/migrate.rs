//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! kp-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `KASHPAGES_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/web/migrations/` and create the `site` schema:
//! the admin allow-list, the audit log and the landing pages table.
//!
//! Example migration structure:
//! ```text
//! crates/web/migrations/
//! ├── 20250601000000_create_site_schema.sql
//! └── 20250601000100_create_landing_pages.sql
//! ```

use super::{DATABASE_URL_VAR, connect};

/// Errors that can occur during migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations to the site database.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect()
        .await?
        .ok_or(MigrationError::MissingEnvVar(DATABASE_URL_VAR))?;

    tracing::info!("Running site migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Site migrations complete!");
    Ok(())
}
