//! Audit trail of admin mutations.
//!
//! Recording is best effort: an audit outage is logged and reported to
//! Sentry, but never fails the mutation that triggered it. Entries can be
//! lost.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::db::RepositoryError;
use crate::models::{AuditEvent, NewAuditEntry};
use crate::services::identity::IdentityProvider;

/// Append-only audit store.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects or cannot receive the entry.
    async fn append(&self, entry: &NewAuditEntry) -> Result<(), RepositoryError>;
}

/// Errors that can occur while recording an audit entry.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The audit store failed.
    #[error("audit write failed: {0}")]
    Store(#[from] RepositoryError),
}

/// Records admin mutations to the audit store.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl AuditLogger {
    /// Create a logger writing to `store`, resolving admin emails via `identity`.
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    /// Record an event, logging and discarding any failure.
    pub async fn record(&self, event: AuditEvent) {
        let action = event.action;
        let target_id = event.target_id.clone();

        if let Err(e) = self.try_record(event).await {
            let event_id = sentry::capture_error(&e);
            tracing::error!(
                error = %e,
                action = %action,
                target_id = %target_id,
                sentry_event_id = %event_id,
                "Failed to record audit entry"
            );
        }
    }

    /// Record an event in a background task and return its handle.
    pub fn spawn_record(&self, event: AuditEvent) -> JoinHandle<()> {
        let logger = self.clone();
        tokio::spawn(async move { logger.record(event).await })
    }

    /// Record an event.
    ///
    /// A failed email lookup does not fail the write; the entry is stored
    /// without an email.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Store` if the entry could not be appended.
    pub async fn try_record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let admin_email = match self.identity.user_email(&event.admin_id).await {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    subject_id = %event.admin_id,
                    "Could not resolve admin email for audit entry"
                );
                None
            }
        };

        let entry = NewAuditEntry::from_event(event, admin_email);
        self.store.append(&entry).await?;

        tracing::info!(
            action = %entry.action,
            subject_id = %entry.admin_id,
            target_type = %entry.target_type,
            target_id = %entry.target_id,
            "Audit entry recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kashpages_core::SubjectId;
    use serde_json::json;

    use super::*;
    use crate::models::{AuditAction, Changes};
    use crate::testing::{InMemoryAuditStore, StaticIdentityProvider};

    fn publish_event(admin: &str) -> AuditEvent {
        AuditEvent {
            action: AuditAction::PagePublish,
            admin_id: SubjectId::parse(admin).unwrap(),
            target_type: "landing_page",
            target_id: "1".to_string(),
            changes: Some(Changes::modified(
                json!({"status": "draft"}),
                json!({"status": "published"}),
            )),
            origin: None,
        }
    }

    #[tokio::test]
    async fn test_record_denormalizes_email() {
        let store = Arc::new(InMemoryAuditStore::new());
        let logger = AuditLogger::new(store.clone(), Arc::new(StaticIdentityProvider::fixtures()));

        logger.try_record(publish_event("uid_7")).await.unwrap();

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        let entry = entries.first().unwrap();
        assert_eq!(entry.action, "page.publish");
        assert_eq!(entry.admin_id.as_str(), "uid_7");
        assert_eq!(
            entry.admin_email.as_ref().map(|e| e.as_str()),
            Some("admin7@kashpages.in")
        );
        assert_eq!(entry.ip_address, "unknown");
    }

    #[tokio::test]
    async fn test_email_lookup_failure_still_writes() {
        let store = Arc::new(InMemoryAuditStore::new());
        let identity = StaticIdentityProvider::fixtures();
        identity.set_lookups_failing(true);
        let logger = AuditLogger::new(store.clone(), Arc::new(identity));

        logger.try_record(publish_event("uid_7")).await.unwrap();

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries.first().unwrap().admin_email.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_by_try_record() {
        let store = Arc::new(InMemoryAuditStore::new());
        store.set_failing(true);
        let logger = AuditLogger::new(store.clone(), Arc::new(StaticIdentityProvider::fixtures()));

        let result = logger.try_record(publish_event("uid_7")).await;
        assert!(matches!(result, Err(AuditError::Store(_))));
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_record_swallows_store_failure() {
        let store = Arc::new(InMemoryAuditStore::new());
        store.set_failing(true);
        let logger = AuditLogger::new(store.clone(), Arc::new(StaticIdentityProvider::fixtures()));

        // Completes without panicking or returning an error
        logger.record(publish_event("uid_7")).await;
        logger.spawn_record(publish_event("uid_7")).await.unwrap();
        assert!(store.entries().is_empty());
    }
}
