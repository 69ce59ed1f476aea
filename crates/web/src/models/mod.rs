//! Domain models for the site and its admin area.

pub mod admin;
pub mod audit;
pub mod landing_page;

pub use admin::{AdminRecord, CurrentAdmin};
pub use audit::{AuditAction, AuditEntry, AuditEvent, Changes, NewAuditEntry};
pub use landing_page::{LandingPage, LandingPageInput, PageContent, ValidationErrors};
