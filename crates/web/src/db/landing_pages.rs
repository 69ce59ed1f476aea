//! Landing page repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kashpages_core::{
    BusinessCategory, Email, LandingPageId, PageStatus, Slug, TwitterCard,
};

use super::RepositoryError;
use crate::models::{LandingPage, PageContent};
use crate::services::PageStore;

const PAGE_COLUMNS: &str = r"
    id, title, slug, business_name, business_category, business_location,
    business_phone, business_email, business_website, description,
    meta_title, meta_description, og_title, og_description, og_image,
    twitter_card, html_content, status, created_at, updated_at, published_at
";

const SLUG_TAKEN: &str = "slug is already used by another page";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct LandingPageRow {
    id: i32,
    title: String,
    slug: String,
    business_name: String,
    business_category: String,
    business_location: String,
    business_phone: Option<String>,
    business_email: Option<String>,
    business_website: Option<String>,
    description: String,
    meta_title: String,
    meta_description: String,
    og_title: String,
    og_description: String,
    og_image: String,
    twitter_card: String,
    html_content: String,
    status: PageStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
}

impl TryFrom<LandingPageRow> for LandingPage {
    type Error = RepositoryError;

    fn try_from(row: LandingPageRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!(
                "invalid {what} in landing page {}: {e}",
                row.id
            ))
        };

        let slug = Slug::parse(&row.slug).map_err(|e| corrupt("slug", &e))?;
        let business_category = row
            .business_category
            .parse::<BusinessCategory>()
            .map_err(|e| corrupt("business category", &e))?;
        let twitter_card = row
            .twitter_card
            .parse::<TwitterCard>()
            .map_err(|e| corrupt("twitter card", &e))?;
        let business_email = row
            .business_email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| corrupt("business email", &e))?;

        Ok(Self {
            id: LandingPageId::new(row.id),
            content: PageContent {
                title: row.title,
                slug,
                business_name: row.business_name,
                business_category,
                business_location: row.business_location,
                business_phone: row.business_phone,
                business_email,
                business_website: row.business_website,
                description: row.description,
                meta_title: row.meta_title,
                meta_description: row.meta_description,
                og_title: row.og_title,
                og_description: row.og_description,
                og_image: row.og_image,
                twitter_card,
                html_content: row.html_content,
            },
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            published_at: row.published_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the `site.landing_page` table.
#[derive(Debug, Clone)]
pub struct LandingPageRepository {
    pool: PgPool,
}

impl LandingPageRepository {
    /// Create a new landing page repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageStore for LandingPageRepository {
    async fn list(&self) -> Result<Vec<LandingPage>, RepositoryError> {
        let rows = sqlx::query_as::<_, LandingPageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM site.landing_page ORDER BY updated_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get(&self, id: LandingPageId) -> Result<Option<LandingPage>, RepositoryError> {
        let row = sqlx::query_as::<_, LandingPageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM site.landing_page WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_published(&self, slug: &Slug) -> Result<Option<LandingPage>, RepositoryError> {
        let row = sqlx::query_as::<_, LandingPageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM site.landing_page WHERE slug = $1 AND status = $2"
        ))
        .bind(slug)
        .bind(PageStatus::Published)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert(&self, content: &PageContent) -> Result<LandingPage, RepositoryError> {
        let row = sqlx::query_as::<_, LandingPageRow>(&format!(
            r"
            INSERT INTO site.landing_page (
                title, slug, business_name, business_category, business_location,
                business_phone, business_email, business_website, description,
                meta_title, meta_description, og_title, og_description, og_image,
                twitter_card, html_content
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {PAGE_COLUMNS}
            "
        ))
        .bind(&content.title)
        .bind(&content.slug)
        .bind(&content.business_name)
        .bind(content.business_category.as_str())
        .bind(&content.business_location)
        .bind(content.business_phone.as_deref())
        .bind(content.business_email.as_ref().map(Email::as_str))
        .bind(content.business_website.as_deref())
        .bind(&content.description)
        .bind(&content.meta_title)
        .bind(&content.meta_description)
        .bind(&content.og_title)
        .bind(&content.og_description)
        .bind(&content.og_image)
        .bind(content.twitter_card.as_str())
        .bind(&content.html_content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, SLUG_TAKEN))?;

        row.try_into()
    }

    async fn update(
        &self,
        id: LandingPageId,
        content: &PageContent,
    ) -> Result<Option<LandingPage>, RepositoryError> {
        let row = sqlx::query_as::<_, LandingPageRow>(&format!(
            r"
            UPDATE site.landing_page SET
                title = $2, slug = $3, business_name = $4, business_category = $5,
                business_location = $6, business_phone = $7, business_email = $8,
                business_website = $9, description = $10, meta_title = $11,
                meta_description = $12, og_title = $13, og_description = $14,
                og_image = $15, twitter_card = $16, html_content = $17,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PAGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&content.title)
        .bind(&content.slug)
        .bind(&content.business_name)
        .bind(content.business_category.as_str())
        .bind(&content.business_location)
        .bind(content.business_phone.as_deref())
        .bind(content.business_email.as_ref().map(Email::as_str))
        .bind(content.business_website.as_deref())
        .bind(&content.description)
        .bind(&content.meta_title)
        .bind(&content.meta_description)
        .bind(&content.og_title)
        .bind(&content.og_description)
        .bind(&content.og_image)
        .bind(content.twitter_card.as_str())
        .bind(&content.html_content)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, SLUG_TAKEN))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_status(
        &self,
        id: LandingPageId,
        status: PageStatus,
    ) -> Result<Option<LandingPage>, RepositoryError> {
        // published_at tracks the most recent publish and survives unpublishing
        let row = sqlx::query_as::<_, LandingPageRow>(&format!(
            r"
            UPDATE site.landing_page SET
                status = $2,
                updated_at = NOW(),
                published_at = CASE WHEN $2 = 'published'::site.page_status
                                    THEN NOW() ELSE published_at END
            WHERE id = $1
            RETURNING {PAGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete(&self, id: LandingPageId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM site.landing_page WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
