//! Admin gate middleware and extractors.
//!
//! Every request under the admin prefix, except the login page, must carry
//! a session cookie whose ID token verifies with the identity provider and
//! whose subject is in the administrators allow-list. Both checks run on
//! every request; nothing about the decision is cached.
//!
//! # Outcomes
//!
//! | Outcome        | Response                        |
//! |----------------|---------------------------------|
//! | `PassThrough`  | forwarded, no external calls    |
//! | `NoCredential` | redirect to login               |
//! | `VerifyFailed` | redirect to login, clear cookie |
//! | `NotAdmin`     | redirect to login, clear cookie |
//! | `Admitted`     | forwarded with [`CurrentAdmin`] |
//!
//! Provider and registry errors count as `VerifyFailed`. All failures
//! redirect to the same place so they look identical to the client.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tracing::Span;

use crate::config::AdminAreaConfig;
use crate::error::set_sentry_user;
use crate::models::CurrentAdmin;
use crate::services::{AdminRegistry, IdentityProvider};
use crate::state::AppState;

/// Result of running the gate on one request.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Path is outside the protected area or is the login page.
    PassThrough,
    /// No session cookie.
    NoCredential,
    /// The credential did not verify, or verification could not complete.
    VerifyFailed,
    /// The credential verified but the subject is not an admin.
    NotAdmin,
    /// Verified admin.
    Admitted(CurrentAdmin),
}

impl GateOutcome {
    /// Short name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::NoCredential => "no_credential",
            Self::VerifyFailed => "verify_failed",
            Self::NotAdmin => "not_admin",
            Self::Admitted(_) => "admitted",
        }
    }

    /// Whether the response must expire the session cookie.
    #[must_use]
    pub const fn clears_cookie(&self) -> bool {
        matches!(self, Self::VerifyFailed | Self::NotAdmin)
    }
}

/// Decides whether a request may reach the admin area.
#[derive(Clone)]
pub struct AuthGate {
    area: AdminAreaConfig,
    identity: Arc<dyn IdentityProvider>,
    admins: Arc<dyn AdminRegistry>,
}

impl AuthGate {
    #[must_use]
    pub fn new(
        area: AdminAreaConfig,
        identity: Arc<dyn IdentityProvider>,
        admins: Arc<dyn AdminRegistry>,
    ) -> Self {
        Self {
            area,
            identity,
            admins,
        }
    }

    /// Admin area paths.
    #[must_use]
    pub const fn area(&self) -> &AdminAreaConfig {
        &self.area
    }

    /// Whether `path` requires an admin session.
    ///
    /// The prefix matches whole segments only: with prefix `/admin`,
    /// `/admin` and `/admin/pages` are protected but `/administrator` is not.
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        if path == self.area.login_path {
            return false;
        }
        path.strip_prefix(self.area.prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Run the gate for a request path and the credential from its cookie.
    pub async fn evaluate(&self, path: &str, credential: Option<&str>) -> GateOutcome {
        if !self.is_protected(path) {
            return GateOutcome::PassThrough;
        }

        match credential.filter(|c| !c.is_empty()) {
            None => GateOutcome::NoCredential,
            Some(credential) => self.authorize(credential).await,
        }
    }

    /// Verify a credential and check the allow-list.
    ///
    /// Returns `VerifyFailed`, `NotAdmin` or `Admitted`.
    pub async fn authorize(&self, credential: &str) -> GateOutcome {
        let identity = match self.identity.verify(credential).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(error = %e, "Credential verification failed");
                return GateOutcome::VerifyFailed;
            }
        };

        match self.admins.lookup(&identity.subject_id).await {
            Ok(Some(record)) => GateOutcome::Admitted(CurrentAdmin {
                subject_id: identity.subject_id,
                email: identity.email,
                profile: record.profile,
            }),
            Ok(None) => {
                tracing::info!(
                    subject_id = %identity.subject_id,
                    "Verified identity is not an admin"
                );
                GateOutcome::NotAdmin
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    subject_id = %identity.subject_id,
                    "Admin registry lookup failed"
                );
                GateOutcome::VerifyFailed
            }
        }
    }
}

/// Middleware that applies the [`AuthGate`] to every request.
///
/// Apply with `axum::middleware::from_fn_with_state`.
pub async fn admin_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let credential = state.cookies().read(&jar);
    let outcome = state.gate().evaluate(&path, credential.as_deref()).await;

    match outcome {
        GateOutcome::PassThrough => next.run(request).await,
        GateOutcome::Admitted(admin) => {
            Span::current().record("subject_id", admin.subject_id.as_str());
            set_sentry_user(
                admin.subject_id.as_str(),
                admin.email.as_ref().map(|e| e.as_str()),
            );
            tracing::debug!(path = %path, subject_id = %admin.subject_id, "Admin admitted");
            request.extensions_mut().insert(admin);
            next.run(request).await
        }
        denied => {
            tracing::info!(path = %path, decision = denied.as_str(), "Admin gate denied request");
            let redirect = Redirect::to(&state.gate().area().login_path);
            if denied.clears_cookie() {
                (state.cookies().clear(jar), redirect).into_response()
            } else {
                redirect.into_response()
            }
        }
    }
}

/// Extractor for the admin admitted by [`admin_gate`].
///
/// Only routes behind the gate can produce it; anywhere else it rejects
/// with `401 Unauthorized`.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(RequireAdminAuth(admin): RequireAdminAuth) -> String {
///     admin.subject_id.to_string()
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Rejection when no admitted admin is attached to the request.
#[derive(Debug)]
pub struct AdminAuthRejection;

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAdmin>()
            .cloned()
            .map(Self)
            .ok_or(AdminAuthRejection)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryAdminRegistry, StaticIdentityProvider};

    struct Fixture {
        gate: AuthGate,
        identity: Arc<StaticIdentityProvider>,
        admins: Arc<InMemoryAdminRegistry>,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(StaticIdentityProvider::fixtures());
        let admins = Arc::new(InMemoryAdminRegistry::fixtures());
        let gate = AuthGate::new(
            AdminAreaConfig::default(),
            identity.clone(),
            admins.clone(),
        );
        Fixture {
            gate,
            identity,
            admins,
        }
    }

    #[test]
    fn test_protected_paths() {
        let f = fixture();
        assert!(f.gate.is_protected("/admin"));
        assert!(f.gate.is_protected("/admin/"));
        assert!(f.gate.is_protected("/admin/api/pages"));
        assert!(!f.gate.is_protected("/admin/login"));
        assert!(!f.gate.is_protected("/administrator"));
        assert!(!f.gate.is_protected("/srinagar-bakery"));
        assert!(!f.gate.is_protected("/"));
    }

    #[tokio::test]
    async fn test_unprotected_paths_make_no_calls() {
        let f = fixture();
        for path in ["/", "/srinagar-bakery", "/admin/login", "/api/auth/session"] {
            let outcome = f.gate.evaluate(path, Some("tok_valid_admin_1")).await;
            assert_eq!(outcome, GateOutcome::PassThrough);
        }
        assert_eq!(f.identity.verify_calls(), 0);
        assert_eq!(f.admins.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_or_empty_cookie_is_no_credential() {
        let f = fixture();
        assert_eq!(f.gate.evaluate("/admin", None).await, GateOutcome::NoCredential);
        assert_eq!(
            f.gate.evaluate("/admin", Some("")).await,
            GateOutcome::NoCredential
        );
        assert_eq!(f.identity.verify_calls(), 0);
    }

    #[tokio::test]
    async fn test_valid_admin_is_admitted() {
        let f = fixture();
        let outcome = f.gate.evaluate("/admin", Some("tok_valid_admin_1")).await;

        let GateOutcome::Admitted(admin) = outcome else {
            panic!("expected admitted, got {outcome:?}");
        };
        assert_eq!(admin.subject_id.as_str(), "uid_7");
        assert_eq!(admin.email.unwrap().as_str(), "admin7@kashpages.in");
    }

    #[tokio::test]
    async fn test_expired_token_fails_verification() {
        let f = fixture();
        let outcome = f.gate.evaluate("/admin", Some("tok_expired")).await;
        assert_eq!(outcome, GateOutcome::VerifyFailed);
        assert!(outcome.clears_cookie());
        assert_eq!(f.admins.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_admin_is_rejected() {
        let f = fixture();
        let outcome = f.gate.evaluate("/admin", Some("tok_valid_nonadmin")).await;
        assert_eq!(outcome, GateOutcome::NotAdmin);
        assert!(outcome.clears_cookie());
    }

    #[tokio::test]
    async fn test_registry_outage_fails_closed() {
        let f = fixture();
        f.admins.set_unavailable(true);
        let outcome = f.gate.evaluate("/admin", Some("tok_valid_admin_1")).await;
        assert_eq!(outcome, GateOutcome::VerifyFailed);
    }

    #[tokio::test]
    async fn test_every_request_is_checked() {
        let f = fixture();
        for _ in 0..2 {
            let outcome = f.gate.evaluate("/admin/api/pages", Some("tok_valid_admin_1")).await;
            assert!(matches!(outcome, GateOutcome::Admitted(_)));
        }
        assert_eq!(f.identity.verify_calls(), 2);
        assert_eq!(f.admins.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn test_revocation_applies_to_next_request() {
        let f = fixture();
        let first = f.gate.evaluate("/admin", Some("tok_valid_admin_1")).await;
        assert!(matches!(first, GateOutcome::Admitted(_)));

        f.admins.revoke("uid_7");
        let second = f.gate.evaluate("/admin", Some("tok_valid_admin_1")).await;
        assert_eq!(second, GateOutcome::NotAdmin);
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let f = fixture();
        let gate = AuthGate::new(
            AdminAreaConfig {
                prefix: "/cms".to_string(),
                login_path: "/cms/sign-in".to_string(),
            },
            f.identity.clone(),
            f.admins.clone(),
        );
        assert!(gate.is_protected("/cms/pages"));
        assert!(!gate.is_protected("/cms/sign-in"));
        assert!(!gate.is_protected("/admin"));
    }
}
