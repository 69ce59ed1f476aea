//! Administrators allow-list repository.
//!
//! The site only ever reads this table; `grant`, `revoke` and `list` exist
//! for the CLI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kashpages_core::SubjectId;

use super::RepositoryError;
use crate::models::AdminRecord;
use crate::services::AdminRegistry;

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    subject_id: String,
    profile: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for AdminRecord {
    type Error = RepositoryError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        let subject_id = SubjectId::parse(&row.subject_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid subject id in database: {e}"))
        })?;

        Ok(Self {
            subject_id,
            profile: row.profile,
            created_at: row.created_at,
        })
    }
}

/// Repository for the `site.admin` table.
#[derive(Debug, Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    /// Create a new admin repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the admin record for a subject, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get(&self, subject_id: &SubjectId) -> Result<Option<AdminRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r"
            SELECT subject_id, profile, created_at
            FROM site.admin
            WHERE subject_id = $1
            ",
        )
        .bind(subject_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List all admin records, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list(&self) -> Result<Vec<AdminRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminRow>(
            r"
            SELECT subject_id, profile, created_at
            FROM site.admin
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Grant admin access to a subject, replacing the profile if already granted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn grant(
        &self,
        subject_id: &SubjectId,
        profile: &serde_json::Value,
    ) -> Result<AdminRecord, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r"
            INSERT INTO site.admin (subject_id, profile)
            VALUES ($1, $2)
            ON CONFLICT (subject_id) DO UPDATE SET profile = EXCLUDED.profile
            RETURNING subject_id, profile, created_at
            ",
        )
        .bind(subject_id.as_str())
        .bind(profile)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Revoke admin access. Takes effect on the subject's next request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the subject was not an admin.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revoke(&self, subject_id: &SubjectId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM site.admin WHERE subject_id = $1")
            .bind(subject_id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AdminRegistry for AdminRepository {
    async fn lookup(&self, subject_id: &SubjectId) -> Result<Option<AdminRecord>, RepositoryError> {
        self.get(subject_id).await
    }
}
