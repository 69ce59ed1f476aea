//! Administrator types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use kashpages_core::{Email, SubjectId};

/// An entry in the administrators allow-list.
///
/// Presence is the only thing the gate checks. `profile` is passthrough data
/// (display name, notes) that nothing in the site interprets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminRecord {
    /// Subject identifier of the verified identity.
    pub subject_id: SubjectId,
    /// Opaque profile fields.
    pub profile: serde_json::Value,
    /// When the record was granted.
    pub created_at: DateTime<Utc>,
}

/// The administrator admitted for the current request.
///
/// Inserted into request extensions by the admin gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentAdmin {
    /// Verified subject identifier.
    pub subject_id: SubjectId,
    /// Email from the verified credential, if the provider included one.
    pub email: Option<Email>,
    /// Profile copied from the admin record.
    pub profile: serde_json::Value,
}
