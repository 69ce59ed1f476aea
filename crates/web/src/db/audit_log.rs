//! Append-only audit log repository.
//!
//! Entries are never updated or deleted. The table rejects both with a trigger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kashpages_core::{AuditEntryId, Email, SubjectId};

use super::RepositoryError;
use crate::models::{AuditEntry, NewAuditEntry};
use crate::services::AuditStore;

#[derive(Debug, sqlx::FromRow)]
struct AuditEntryRow {
    id: i64,
    action: String,
    admin_id: String,
    admin_email: Option<String>,
    target_type: String,
    target_id: String,
    changes: serde_json::Value,
    ip_address: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditEntryRow> for AuditEntry {
    type Error = RepositoryError;

    fn try_from(row: AuditEntryRow) -> Result<Self, Self::Error> {
        let admin_id = SubjectId::parse(&row.admin_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid admin id in audit log: {e}"))
        })?;
        let admin_email = row
            .admin_email
            .map(|email| Email::parse(&email))
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid admin email in audit log: {e}"))
            })?;

        Ok(Self {
            id: AuditEntryId::new(row.id),
            entry: NewAuditEntry {
                action: row.action,
                admin_id,
                admin_email,
                target_type: row.target_type,
                target_id: row.target_id,
                changes: row.changes,
                ip_address: row.ip_address,
            },
            created_at: row.created_at,
        })
    }
}

/// Repository for the `site.audit_log` table.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    /// Create a new audit log repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, entry: &NewAuditEntry) -> Result<AuditEntryId, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO site.audit_log
                (action, admin_id, admin_email, target_type, target_id, changes, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(&entry.action)
        .bind(entry.admin_id.as_str())
        .bind(entry.admin_email.as_ref().map(Email::as_str))
        .bind(&entry.target_type)
        .bind(&entry.target_id)
        .bind(&entry.changes)
        .bind(&entry.ip_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(AuditEntryId::new(id))
    }

    /// Most recent entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, AuditEntryRow>(
            r"
            SELECT id, action, admin_id, admin_email, target_type, target_id,
                   changes, ip_address, created_at
            FROM site.audit_log
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl AuditStore for AuditLogRepository {
    async fn append(&self, entry: &NewAuditEntry) -> Result<(), RepositoryError> {
        self.insert(entry).await.map(|_| ())
    }
}
