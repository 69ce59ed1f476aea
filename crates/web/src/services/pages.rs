//! Landing page editing and publishing.
//!
//! Every successful mutation records an audit entry. Mutations that change
//! the set of published pages also ask for a site rebuild. Both side effects
//! run in spawned tasks and cannot change the outcome of the mutation.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use kashpages_core::{LandingPageId, PageStatus, Slug, SubjectId};

use crate::db::RepositoryError;
use crate::models::landing_page::TARGET_TYPE;
use crate::models::{
    AuditAction, AuditEvent, Changes, LandingPage, LandingPageInput, PageContent, ValidationErrors,
};
use crate::services::audit::AuditLogger;
use crate::services::rebuild::{RebuildReason, RebuildTrigger};

/// Landing page persistence.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// All pages, most recently updated first.
    async fn list(&self) -> Result<Vec<LandingPage>, RepositoryError>;

    async fn get(&self, id: LandingPageId) -> Result<Option<LandingPage>, RepositoryError>;

    /// The published page at `slug`, if any.
    async fn find_published(&self, slug: &Slug) -> Result<Option<LandingPage>, RepositoryError>;

    /// Insert a new draft.
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    async fn insert(&self, content: &PageContent) -> Result<LandingPage, RepositoryError>;

    /// Replace the content of a page, keeping its status.
    ///
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    async fn update(
        &self,
        id: LandingPageId,
        content: &PageContent,
    ) -> Result<Option<LandingPage>, RepositoryError>;

    /// Change the status of a page. Publishing stamps `published_at`.
    async fn set_status(
        &self,
        id: LandingPageId,
        status: PageStatus,
    ) -> Result<Option<LandingPage>, RepositoryError>;

    /// Delete a page. Returns `false` if it did not exist.
    async fn delete(&self, id: LandingPageId) -> Result<bool, RepositoryError>;
}

/// Errors from landing page operations.
#[derive(Debug, Error)]
pub enum PageError {
    /// Submitted content failed validation.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// No page with the given id.
    #[error("landing page not found")]
    NotFound,

    /// The slug belongs to another page.
    #[error("{0}")]
    SlugTaken(String),

    /// Storage failed.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for PageError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(message) => Self::SlugTaken(message),
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// The admin performing a mutation, for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub subject_id: SubjectId,
    /// Client address of the request, if known.
    pub origin: Option<IpAddr>,
}

/// Landing page operations used by the admin API and the public site.
#[derive(Clone)]
pub struct PageService {
    store: Arc<dyn PageStore>,
    audit: AuditLogger,
    rebuild: RebuildTrigger,
}

impl PageService {
    #[must_use]
    pub fn new(store: Arc<dyn PageStore>, audit: AuditLogger, rebuild: RebuildTrigger) -> Self {
        Self {
            store,
            audit,
            rebuild,
        }
    }

    /// All pages, drafts included.
    ///
    /// # Errors
    ///
    /// Returns `PageError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<LandingPage>, PageError> {
        Ok(self.store.list().await?)
    }

    /// A single page by id.
    ///
    /// # Errors
    ///
    /// Returns `PageError::NotFound` if no such page exists.
    pub async fn get(&self, id: LandingPageId) -> Result<LandingPage, PageError> {
        self.store.get(id).await?.ok_or(PageError::NotFound)
    }

    /// The published page served at `slug`.
    ///
    /// Anything that is not a valid slug cannot match a page.
    ///
    /// # Errors
    ///
    /// Returns `PageError::Repository` if the store fails.
    pub async fn find_published(&self, slug: &str) -> Result<Option<LandingPage>, PageError> {
        let Ok(slug) = Slug::parse(slug) else {
            return Ok(None);
        };
        Ok(self.store.find_published(&slug).await?)
    }

    /// Create a draft page.
    ///
    /// # Errors
    ///
    /// Returns `PageError::Validation` for invalid input and
    /// `PageError::SlugTaken` if the slug is already used.
    pub async fn create(
        &self,
        actor: &Actor,
        input: LandingPageInput,
    ) -> Result<LandingPage, PageError> {
        let content = input.validate().map_err(PageError::Validation)?;
        let page = self.store.insert(&content).await?;

        tracing::info!(page_id = %page.id, slug = %page.content.slug, "Landing page created");
        self.audit(
            actor,
            AuditAction::PageCreate,
            &page,
            Changes::created(page.snapshot()),
        );
        Ok(page)
    }

    /// Replace the content of a page.
    ///
    /// Editing a published page changes the live site and triggers a rebuild.
    ///
    /// # Errors
    ///
    /// Returns `PageError::Validation`, `PageError::NotFound` or
    /// `PageError::SlugTaken`.
    pub async fn update(
        &self,
        actor: &Actor,
        id: LandingPageId,
        input: LandingPageInput,
    ) -> Result<LandingPage, PageError> {
        let content = input.validate().map_err(PageError::Validation)?;
        let before = self.get(id).await?;
        let page = self
            .store
            .update(id, &content)
            .await?
            .ok_or(PageError::NotFound)?;

        tracing::info!(page_id = %page.id, slug = %page.content.slug, "Landing page updated");
        self.audit(
            actor,
            AuditAction::PageUpdate,
            &page,
            Changes::modified(before.snapshot(), page.snapshot()),
        );
        if page.status.is_published() {
            self.rebuild.spawn(RebuildReason::PageUpdated);
        }
        Ok(page)
    }

    /// Delete a page. Deleting a published page triggers a rebuild.
    ///
    /// # Errors
    ///
    /// Returns `PageError::NotFound` if no such page exists.
    pub async fn delete(&self, actor: &Actor, id: LandingPageId) -> Result<(), PageError> {
        let before = self.get(id).await?;
        if !self.store.delete(id).await? {
            return Err(PageError::NotFound);
        }

        tracing::info!(page_id = %id, slug = %before.content.slug, "Landing page deleted");
        self.audit(
            actor,
            AuditAction::PageDelete,
            &before,
            Changes::deleted(before.snapshot()),
        );
        if before.status.is_published() {
            self.rebuild.spawn(RebuildReason::PageDeleted);
        }
        Ok(())
    }

    /// Make a page public and rebuild the site.
    ///
    /// Publishing an already published page returns it unchanged, without
    /// an audit entry or rebuild.
    ///
    /// # Errors
    ///
    /// Returns `PageError::NotFound` if no such page exists.
    pub async fn publish(&self, actor: &Actor, id: LandingPageId) -> Result<LandingPage, PageError> {
        self.transition(actor, id, PageStatus::Published).await
    }

    /// Take a page off the public site and rebuild the site.
    ///
    /// Unpublishing a draft returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `PageError::NotFound` if no such page exists.
    pub async fn unpublish(
        &self,
        actor: &Actor,
        id: LandingPageId,
    ) -> Result<LandingPage, PageError> {
        self.transition(actor, id, PageStatus::Draft).await
    }

    async fn transition(
        &self,
        actor: &Actor,
        id: LandingPageId,
        status: PageStatus,
    ) -> Result<LandingPage, PageError> {
        let before = self.get(id).await?;
        if before.status == status {
            return Ok(before);
        }

        let page = self
            .store
            .set_status(id, status)
            .await?
            .ok_or(PageError::NotFound)?;

        let (action, reason) = if status.is_published() {
            (AuditAction::PagePublish, RebuildReason::PagePublished)
        } else {
            (AuditAction::PageUnpublish, RebuildReason::PageUnpublished)
        };

        tracing::info!(
            page_id = %page.id,
            slug = %page.content.slug,
            status = %page.status,
            "Landing page status changed"
        );
        self.audit(
            actor,
            action,
            &page,
            Changes::modified(before.snapshot(), page.snapshot()),
        );
        self.rebuild.spawn(reason);
        Ok(page)
    }

    fn audit(&self, actor: &Actor, action: AuditAction, page: &LandingPage, changes: Changes) {
        self.audit.spawn_record(AuditEvent {
            action,
            admin_id: actor.subject_id.clone(),
            target_type: TARGET_TYPE,
            target_id: page.id.to_string(),
            changes: Some(changes),
            origin: actor.origin,
        });
    }
}
