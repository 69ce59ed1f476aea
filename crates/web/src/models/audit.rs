//! Audit trail types.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use kashpages_core::{AuditEntryId, Email, SubjectId};

/// Value stored when the request origin could not be determined.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Admin mutations that are written to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    PageCreate,
    PageUpdate,
    PageDelete,
    PagePublish,
    PageUnpublish,
}

impl AuditAction {
    /// Stored action name, e.g. `page.publish`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PageCreate => "page.create",
            Self::PageUpdate => "page.update",
            Self::PageDelete => "page.delete",
            Self::PagePublish => "page.publish",
            Self::PageUnpublish => "page.unpublish",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Before/after snapshot of the entity a mutation touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl Changes {
    /// Snapshot of a newly created entity.
    #[must_use]
    pub const fn created(after: Value) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    /// Snapshot of a deleted entity.
    #[must_use]
    pub const fn deleted(before: Value) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }

    /// Snapshot of a modified entity.
    #[must_use]
    pub const fn modified(before: Value, after: Value) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    /// JSON object stored in the `changes` column.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut object = Map::new();
        if let Some(before) = self.before {
            object.insert("before".to_string(), before);
        }
        if let Some(after) = self.after {
            object.insert("after".to_string(), after);
        }
        Value::Object(object)
    }
}

/// A mutation as reported by the code that performed it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub action: AuditAction,
    /// Acting administrator.
    pub admin_id: SubjectId,
    /// Entity kind, e.g. `landing_page`.
    pub target_type: &'static str,
    pub target_id: String,
    pub changes: Option<Changes>,
    /// Client address of the request that caused the mutation.
    pub origin: Option<IpAddr>,
}

/// A fully resolved entry, ready to append.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAuditEntry {
    pub action: String,
    pub admin_id: SubjectId,
    /// Denormalized from the identity provider; `None` when the lookup failed.
    pub admin_email: Option<Email>,
    pub target_type: String,
    pub target_id: String,
    /// Always a JSON object; `{}` when the event carried no changes.
    pub changes: Value,
    /// Client IP, or `unknown`.
    pub ip_address: String,
}

impl NewAuditEntry {
    /// Resolve an event into a storable entry.
    #[must_use]
    pub fn from_event(event: AuditEvent, admin_email: Option<Email>) -> Self {
        Self {
            action: event.action.as_str().to_string(),
            admin_id: event.admin_id,
            admin_email,
            target_type: event.target_type.to_string(),
            target_id: event.target_id,
            changes: event
                .changes
                .map_or_else(|| Value::Object(Map::new()), Changes::into_value),
            ip_address: event
                .origin
                .map_or_else(|| UNKNOWN_ORIGIN.to_string(), |ip| ip.to_string()),
        }
    }
}

/// A stored audit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    #[serde(flatten)]
    pub entry: NewAuditEntry,
    pub created_at: DateTime<Utc>,
}
