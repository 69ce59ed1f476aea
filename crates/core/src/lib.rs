//! KashPages Core - Shared types library.
//!
//! This crate provides common types used across all KashPages components:
//! - `web` - Public landing page site and the gated admin CMS
//! - `cli` - Command-line tools for migrations, admin grants and audit review
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, subjects, slugs, emails and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
