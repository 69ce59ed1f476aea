//! Application state shared across handlers.
//!
//! Long-lived clients (HTTP client, database pool, identity key cache) are
//! built once at startup and injected here. Handlers only see the services
//! through their trait seams.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::{AdminAreaConfig, WebConfig};
use crate::db::{AdminRepository, AuditLogRepository, LandingPageRepository};
use crate::middleware::{AuthGate, SessionCookies};
use crate::services::{
    AdminRegistry, AuditLogger, AuditStore, FirebaseIdentityProvider, IdentityError,
    IdentityProvider, PageService, PageStore, RebuildTrigger,
};

/// Timeout for all outgoing HTTP calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// External collaborators behind the trait seams.
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub admins: Arc<dyn AdminRegistry>,
    pub audit_store: Arc<dyn AuditStore>,
    pub pages: Arc<dyn PageStore>,
    pub rebuild: RebuildTrigger,
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    gate: AuthGate,
    cookies: SessionCookies,
    pages: PageService,
}

impl AppState {
    /// Assemble state from already-built collaborators.
    #[must_use]
    pub fn new(admin_area: AdminAreaConfig, secure_cookies: bool, deps: Collaborators) -> Self {
        let audit = AuditLogger::new(deps.audit_store, deps.identity.clone());
        let gate = AuthGate::new(admin_area, deps.identity, deps.admins);
        let pages = PageService::new(deps.pages, audit, deps.rebuild);

        Self {
            inner: Arc::new(AppStateInner {
                gate,
                cookies: SessionCookies::new(secure_cookies),
                pages,
            }),
        }
    }

    /// Build the production state: Firebase identity, Postgres stores and
    /// the configured rebuild backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the identity provider cannot
    /// be constructed.
    pub fn from_config(config: &WebConfig, pool: &PgPool) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let identity = FirebaseIdentityProvider::new(http.clone(), &config.firebase)?;

        let deps = Collaborators {
            identity: Arc::new(identity),
            admins: Arc::new(AdminRepository::new(pool.clone())),
            audit_store: Arc::new(AuditLogRepository::new(pool.clone())),
            pages: Arc::new(LandingPageRepository::new(pool.clone())),
            rebuild: RebuildTrigger::new(http, config.rebuild.clone()),
        };

        Ok(Self::new(
            config.admin.clone(),
            config.secure_cookies(),
            deps,
        ))
    }

    #[must_use]
    pub fn gate(&self) -> &AuthGate {
        &self.inner.gate
    }

    #[must_use]
    pub fn cookies(&self) -> &SessionCookies {
        &self.inner.cookies
    }

    #[must_use]
    pub fn admin_area(&self) -> &AdminAreaConfig {
        self.inner.gate.area()
    }

    #[must_use]
    pub fn pages(&self) -> &PageService {
        &self.inner.pages
    }
}
