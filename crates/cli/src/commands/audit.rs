//! Audit log inspection.

use kashpages_web::db::{AuditLogRepository, RepositoryError};

use super::{DATABASE_URL_VAR, connect};

/// Errors that can occur while reading the audit log.
#[derive(Debug, thiserror::Error)]
pub enum AuditCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Print the `limit` most recent audit entries, newest first.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the query fails.
pub async fn recent(limit: i64) -> Result<(), AuditCommandError> {
    let pool = connect()
        .await?
        .ok_or(AuditCommandError::MissingEnvVar(DATABASE_URL_VAR))?;

    let entries = AuditLogRepository::new(pool).recent(limit).await?;

    if entries.is_empty() {
        tracing::info!("Audit log is empty");
        return Ok(());
    }

    for entry in entries {
        let email = entry
            .entry
            .admin_email
            .as_ref()
            .map_or("-", |email| email.as_str());
        tracing::info!(
            "#{} {} {} {}:{} by {} <{}> from {} {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.entry.action,
            entry.entry.target_type,
            entry.entry.target_id,
            entry.entry.admin_id,
            email,
            entry.entry.ip_address,
            entry.entry.changes
        );
    }
    Ok(())
}
