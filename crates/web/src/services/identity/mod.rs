//! Identity verification against an external provider.
//!
//! The site never issues credentials itself. Admins sign in with the
//! provider in the browser and hand the resulting ID token to
//! `POST /api/auth/session`; from then on the token travels in the session
//! cookie and is verified on every gated request.

mod error;
pub mod firebase;

pub use error::IdentityError;
pub use firebase::FirebaseIdentityProvider;

use async_trait::async_trait;
use serde_json::{Map, Value};

use kashpages_core::{Email, SubjectId};

/// A credential that passed verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub subject_id: SubjectId,
    pub email: Option<Email>,
    /// Remaining token claims, passed through untouched.
    pub claims: Map<String, Value>,
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify an opaque bearer credential.
    ///
    /// Callers never pass an empty credential.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidCredential`] for every kind of
    /// verification failure, including the provider being unreachable.
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError>;

    /// Look up the email address of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup is not configured or the provider fails.
    async fn user_email(&self, subject_id: &SubjectId) -> Result<Option<Email>, IdentityError>;
}
