//! Administrator allow-list management commands.
//!
//! Admin access is granted per Firebase user id. The web server checks the
//! allow-list on every gated request, so a revoke takes effect on the
//! user's next request without touching their session cookie.

use kashpages_core::{SubjectId, SubjectIdError};
use kashpages_web::db::{AdminRepository, RepositoryError};

use super::{DATABASE_URL_VAR, connect};

/// Errors that can occur during admin management.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid subject id: {0}")]
    InvalidSubject(#[from] SubjectIdError),

    #[error("Profile must be a JSON object: {0}")]
    InvalidProfile(String),

    #[error("{0} is not an admin")]
    NotAnAdmin(String),
}

/// Parse the `--profile` argument. Only JSON objects are accepted.
fn parse_profile(raw: &str) -> Result<serde_json::Value, AdminError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| AdminError::InvalidProfile(e.to_string()))?;

    if !value.is_object() {
        return Err(AdminError::InvalidProfile(format!(
            "expected an object, got `{value}`"
        )));
    }
    Ok(value)
}

async fn repository() -> Result<AdminRepository, AdminError> {
    let pool = connect()
        .await?
        .ok_or(AdminError::MissingEnvVar(DATABASE_URL_VAR))?;
    Ok(AdminRepository::new(pool))
}

/// Grant admin access, replacing the stored profile if already granted.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or the database fails.
pub async fn grant(subject: &str, profile: &str) -> Result<(), AdminError> {
    let subject_id = SubjectId::parse(subject)?;
    let profile = parse_profile(profile)?;

    let record = repository().await?.grant(&subject_id, &profile).await?;

    tracing::info!(
        subject_id = %record.subject_id,
        profile = %record.profile,
        "Admin access granted"
    );
    Ok(())
}

/// Revoke admin access.
///
/// # Errors
///
/// Returns `AdminError::NotAnAdmin` if the subject was not on the allow-list.
pub async fn revoke(subject: &str) -> Result<(), AdminError> {
    let subject_id = SubjectId::parse(subject)?;

    match repository().await?.revoke(&subject_id).await {
        Ok(()) => {
            tracing::info!(subject_id = %subject_id, "Admin access revoked");
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(AdminError::NotAnAdmin(subject_id.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// List all admins, oldest grant first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list() -> Result<(), AdminError> {
    let admins = repository().await?.list().await?;

    if admins.is_empty() {
        tracing::info!("No admins found. Grant one with `kp-cli admin grant --subject <uid>`");
        return Ok(());
    }

    tracing::info!("Found {} admin(s):", admins.len());
    for admin in admins {
        tracing::info!(
            "  {} (granted {}) {}",
            admin.subject_id,
            admin.created_at.format("%Y-%m-%d %H:%M"),
            admin.profile
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_accepts_objects() {
        let profile = parse_profile(r#"{"name": "Burhan"}"#).unwrap();
        assert_eq!(profile["name"], "Burhan");
        assert!(parse_profile("{}").unwrap().as_object().unwrap().is_empty());
    }

    #[test]
    fn test_parse_profile_rejects_non_objects() {
        assert!(matches!(
            parse_profile("[1, 2]"),
            Err(AdminError::InvalidProfile(_))
        ));
        assert!(matches!(
            parse_profile("\"admin\""),
            Err(AdminError::InvalidProfile(_))
        ));
        assert!(matches!(
            parse_profile("{name:"),
            Err(AdminError::InvalidProfile(_))
        ));
    }
}
