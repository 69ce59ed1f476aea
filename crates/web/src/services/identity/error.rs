//! Identity provider error types.

use thiserror::Error;

/// Errors reported by an [`IdentityProvider`](super::IdentityProvider).
///
/// Every verification failure surfaces as [`IdentityError::InvalidCredential`];
/// the reason is only logged.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The credential is malformed, expired, forged, or could not be checked.
    #[error("invalid credential")]
    InvalidCredential,

    /// The provider operation needs configuration that is absent.
    #[error("identity provider not configured: {0}")]
    NotConfigured(&'static str),

    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Decoding, validating or signing a JWT failed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The provider's signing keys could not be fetched.
    #[error("signing keys unavailable: {0}")]
    Keys(String),

    /// The provider returned something unexpected.
    #[error("parse error: {0}")]
    Parse(String),
}
