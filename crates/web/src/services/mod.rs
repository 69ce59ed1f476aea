//! Business logic services for the site.
//!
//! # Services
//!
//! - `identity` - ID token verification and user lookup (Firebase)
//! - `admin_registry` - Administrators allow-list seam
//! - `audit` - Best-effort audit trail of admin mutations
//! - `rebuild` - Static site rebuild trigger (GitHub Actions or build hook)
//! - `pages` - Landing page editing and publishing

pub mod admin_registry;
pub mod audit;
pub mod identity;
pub mod pages;
pub mod rebuild;

pub use admin_registry::AdminRegistry;
pub use audit::{AuditError, AuditLogger, AuditStore};
pub use identity::{FirebaseIdentityProvider, IdentityError, IdentityProvider, VerifiedIdentity};
pub use pages::{Actor, PageError, PageService, PageStore};
pub use rebuild::{RebuildError, RebuildReason, RebuildTrigger};
