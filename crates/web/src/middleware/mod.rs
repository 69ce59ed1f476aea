//! HTTP middleware stack for the site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Security headers
//! 4. Request ID (recorded on the span and Sentry scope)
//! 5. Admin gate (session cookie check for the admin prefix)

pub mod auth;
pub mod client_ip;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{AdminAuthRejection, AuthGate, GateOutcome, RequireAdminAuth, admin_gate};
pub use client_ip::ClientIp;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, SESSION_MAX_AGE_SECONDS, SessionCookies};
