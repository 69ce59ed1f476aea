//! In-memory collaborators and a throwaway HTTP server for tests.
//!
//! Compiled for this crate's tests and, with the `testing` feature, for
//! downstream test crates.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Router, extract::State};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Map, Value, json};

use kashpages_core::{Email, LandingPageId, PageStatus, Slug, SubjectId};

use crate::config::{AdminAreaConfig, RebuildConfig};
use crate::db::RepositoryError;
use crate::models::{AdminRecord, LandingPage, LandingPageInput, NewAuditEntry, PageContent};
use crate::services::{
    AdminRegistry, AuditStore, IdentityError, IdentityProvider, PageStore, RebuildTrigger,
    VerifiedIdentity,
};
use crate::state::{AppState, Collaborators};

/// How long `wait_for` helpers wait before failing the test.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// Poll `ready` until it returns true or the wait times out.
async fn wait_until(what: &str, ready: impl Fn() -> bool) {
    let waited = tokio::time::timeout(WAIT_TIMEOUT, async {
        while !ready() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Identity
// =============================================================================

/// Identity provider with a fixed token table.
#[derive(Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, VerifiedIdentity>,
    emails: HashMap<SubjectId, Email>,
    verify_calls: AtomicUsize,
    lookups_failing: AtomicBool,
}

impl StaticIdentityProvider {
    /// Standard fixtures:
    ///
    /// - `tok_valid_admin_1` verifies as `uid_7` (`admin7@kashpages.in`)
    /// - `tok_valid_nonadmin` verifies as `uid_9`
    /// - anything else, including `tok_expired`, is invalid
    #[must_use]
    pub fn fixtures() -> Self {
        let mut provider = Self::default();
        provider.add_user("tok_valid_admin_1", "uid_7", "admin7@kashpages.in");
        provider.add_user("tok_valid_nonadmin", "uid_9", "visitor9@example.com");
        provider
    }

    /// Register a token that verifies as `subject` with `email`.
    pub fn add_user(&mut self, token: &str, subject: &str, email: &str) {
        let subject_id = SubjectId::parse(subject).expect("valid subject id");
        let email = Email::parse(email).expect("valid email");
        let mut claims = Map::new();
        claims.insert("email_verified".to_string(), Value::Bool(true));

        self.tokens.insert(
            token.to_string(),
            VerifiedIdentity {
                subject_id: subject_id.clone(),
                email: Some(email.clone()),
                claims,
            },
        );
        self.emails.insert(subject_id, email);
    }

    /// Make `user_email` fail.
    pub fn set_lookups_failing(&self, failing: bool) {
        self.lookups_failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `verify` calls so far.
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .get(credential)
            .cloned()
            .ok_or(IdentityError::InvalidCredential)
    }

    async fn user_email(&self, subject_id: &SubjectId) -> Result<Option<Email>, IdentityError> {
        if self.lookups_failing.load(Ordering::SeqCst) {
            return Err(IdentityError::Api {
                status: 503,
                message: "lookup unavailable".to_string(),
            });
        }
        Ok(self.emails.get(subject_id).cloned())
    }
}

// =============================================================================
// Admin registry
// =============================================================================

/// Allow-list held in memory.
#[derive(Default)]
pub struct InMemoryAdminRegistry {
    admins: Mutex<HashMap<SubjectId, AdminRecord>>,
    lookup_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryAdminRegistry {
    /// Registry containing `uid_7` only.
    #[must_use]
    pub fn fixtures() -> Self {
        let registry = Self::default();
        registry.grant("uid_7");
        registry
    }

    pub fn grant(&self, subject: &str) {
        let subject_id = SubjectId::parse(subject).expect("valid subject id");
        lock(&self.admins).insert(
            subject_id.clone(),
            AdminRecord {
                subject_id,
                profile: json!({ "display_name": subject }),
                created_at: Utc::now(),
            },
        );
    }

    pub fn revoke(&self, subject: &str) {
        let subject_id = SubjectId::parse(subject).expect("valid subject id");
        lock(&self.admins).remove(&subject_id);
    }

    /// Make every lookup fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminRegistry for InMemoryAdminRegistry {
    async fn lookup(&self, subject_id: &SubjectId) -> Result<Option<AdminRecord>, RepositoryError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("admin registry".to_string()));
        }
        Ok(lock(&self.admins).get(subject_id).cloned())
    }
}

// =============================================================================
// Audit store
// =============================================================================

/// Append-only audit store held in memory.
#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: Mutex<Vec<NewAuditEntry>>,
    failing: AtomicBool,
}

impl InMemoryAuditStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every append fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Entries appended so far, oldest first.
    pub fn entries(&self) -> Vec<NewAuditEntry> {
        lock(&self.entries).clone()
    }

    /// Wait until at least `count` entries were appended.
    pub async fn wait_for(&self, count: usize) {
        wait_until("audit entries", || lock(&self.entries).len() >= count).await;
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &NewAuditEntry) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("audit store".to_string()));
        }
        lock(&self.entries).push(entry.clone());
        Ok(())
    }
}

// =============================================================================
// Page store
// =============================================================================

/// Landing page store held in memory. Enforces unique slugs.
#[derive(Default)]
pub struct InMemoryPageStore {
    pages: Mutex<Vec<LandingPage>>,
    next_id: AtomicUsize,
}

impl InMemoryPageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slug_taken(pages: &[LandingPage], slug: &Slug, except: Option<LandingPageId>) -> bool {
        pages
            .iter()
            .any(|p| &p.content.slug == slug && Some(p.id) != except)
    }
}

#[async_trait]
impl PageStore for InMemoryPageStore {
    async fn list(&self) -> Result<Vec<LandingPage>, RepositoryError> {
        let mut pages = lock(&self.pages).clone();
        pages.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(pages)
    }

    async fn get(&self, id: LandingPageId) -> Result<Option<LandingPage>, RepositoryError> {
        Ok(lock(&self.pages).iter().find(|p| p.id == id).cloned())
    }

    async fn find_published(&self, slug: &Slug) -> Result<Option<LandingPage>, RepositoryError> {
        Ok(lock(&self.pages)
            .iter()
            .find(|p| &p.content.slug == slug && p.status.is_published())
            .cloned())
    }

    async fn insert(&self, content: &PageContent) -> Result<LandingPage, RepositoryError> {
        let mut pages = lock(&self.pages);
        if Self::slug_taken(&pages, &content.slug, None) {
            return Err(RepositoryError::Conflict(
                "slug is already used by another page".to_string(),
            ));
        }

        let raw_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = i32::try_from(raw_id)
            .map_err(|_| RepositoryError::Unavailable("page ids exhausted".to_string()))?;
        let now = Utc::now();
        let page = LandingPage {
            id: LandingPageId::new(id),
            content: content.clone(),
            status: PageStatus::Draft,
            created_at: now,
            updated_at: now,
            published_at: None,
        };
        pages.push(page.clone());
        Ok(page)
    }

    async fn update(
        &self,
        id: LandingPageId,
        content: &PageContent,
    ) -> Result<Option<LandingPage>, RepositoryError> {
        let mut pages = lock(&self.pages);
        if Self::slug_taken(&pages, &content.slug, Some(id)) {
            return Err(RepositoryError::Conflict(
                "slug is already used by another page".to_string(),
            ));
        }

        Ok(pages.iter_mut().find(|p| p.id == id).map(|page| {
            page.content = content.clone();
            page.updated_at = Utc::now();
            page.clone()
        }))
    }

    async fn set_status(
        &self,
        id: LandingPageId,
        status: PageStatus,
    ) -> Result<Option<LandingPage>, RepositoryError> {
        let mut pages = lock(&self.pages);
        Ok(pages.iter_mut().find(|p| p.id == id).map(|page| {
            let now = Utc::now();
            page.status = status;
            page.updated_at = now;
            if status.is_published() {
                page.published_at = Some(now);
            }
            page.clone()
        }))
    }

    async fn delete(&self, id: LandingPageId) -> Result<bool, RepositoryError> {
        let mut pages = lock(&self.pages);
        let before = pages.len();
        pages.retain(|p| p.id != id);
        Ok(pages.len() < before)
    }
}

// =============================================================================
// Build hook
// =============================================================================

#[derive(Default)]
struct HookState {
    hits: AtomicUsize,
    failing: AtomicBool,
}

/// Local build hook endpoint that counts rebuild requests.
pub struct FakeBuildHook {
    url: String,
    state: Arc<HookState>,
}

impl FakeBuildHook {
    /// Start the hook server.
    pub async fn start() -> Self {
        let state = Arc::new(HookState::default());
        let app = Router::new()
            .route("/build", post(record_build))
            .with_state(state.clone());
        let base_url = spawn_server(app).await;

        Self {
            url: format!("{base_url}/build"),
            state,
        }
    }

    /// A rebuild trigger pointed at this hook.
    #[must_use]
    pub fn trigger(&self) -> RebuildTrigger {
        RebuildTrigger::new(
            reqwest::Client::new(),
            RebuildConfig::BuildHook {
                url: SecretString::from(self.url.clone()),
            },
        )
    }

    /// Answer every request with `500`.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Requests received so far, failed ones included.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` requests arrived.
    pub async fn wait_for(&self, count: usize) {
        wait_until("rebuild requests", || self.hits() >= count).await;
    }
}

async fn record_build(State(state): State<Arc<HookState>>) -> StatusCode {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if state.failing.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A valid landing page submission using `slug`.
#[must_use]
pub fn sample_input(slug: &str) -> LandingPageInput {
    LandingPageInput {
        title: "Srinagar Bakery".to_string(),
        slug: slug.to_string(),
        business_name: "Srinagar Bakery".to_string(),
        business_category: "food".to_string(),
        business_location: "Lal Chowk, Srinagar".to_string(),
        business_phone: Some("+91 194 245 1234".to_string()),
        business_email: Some("orders@srinagarbakery.in".to_string()),
        description: "Kashmiri breads baked every morning.".to_string(),
        meta_title: "Srinagar Bakery".to_string(),
        meta_description: "Fresh girda, lavasa and kulcha in Lal Chowk.".to_string(),
        html_content: "<h1>Srinagar Bakery</h1>".to_string(),
        ..LandingPageInput::default()
    }
}

/// The whole site wired to in-memory collaborators.
pub struct TestSite {
    pub identity: Arc<StaticIdentityProvider>,
    pub admins: Arc<InMemoryAdminRegistry>,
    pub audit: Arc<InMemoryAuditStore>,
    pub pages: Arc<InMemoryPageStore>,
    pub hook: FakeBuildHook,
    state: AppState,
}

impl TestSite {
    /// Site with the standard identity and admin fixtures, default admin
    /// paths and insecure cookies.
    pub async fn new() -> Self {
        let identity = Arc::new(StaticIdentityProvider::fixtures());
        let admins = Arc::new(InMemoryAdminRegistry::fixtures());
        let audit = Arc::new(InMemoryAuditStore::new());
        let pages = Arc::new(InMemoryPageStore::new());
        let hook = FakeBuildHook::start().await;

        let state = AppState::new(
            AdminAreaConfig::default(),
            false,
            Collaborators {
                identity: identity.clone(),
                admins: admins.clone(),
                audit_store: audit.clone(),
                pages: pages.clone(),
                rebuild: hook.trigger(),
            },
        );

        Self {
            identity,
            admins,
            audit,
            pages,
            hook,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Fresh router over the shared state.
    #[must_use]
    pub fn router(&self) -> Router {
        crate::routes::router(self.state.clone())
    }
}
