//! Administrators allow-list lookup.

use async_trait::async_trait;

use kashpages_core::SubjectId;

use crate::db::RepositoryError;
use crate::models::AdminRecord;

/// Keyed read of the administrators allow-list.
///
/// Implementations must not cache: revoking a record has to take effect on
/// the subject's very next request.
#[async_trait]
pub trait AdminRegistry: Send + Sync {
    /// Returns the admin record for a subject, or `None` if it is not an admin.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn lookup(&self, subject_id: &SubjectId) -> Result<Option<AdminRecord>, RepositoryError>;
}
