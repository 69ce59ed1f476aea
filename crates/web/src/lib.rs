//! KashPages web library.
//!
//! Serves published landing pages at `/{slug}` and the admin CMS behind a
//! cookie session gate. Admin identities come from Firebase Authentication;
//! authorization is membership in the `site.admin` allow-list.
//!
//! The binary in `main.rs` wires the production collaborators. Tests build
//! the same router over in-memory ones (see `testing`, enabled with the
//! `testing` feature).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
