//! Landing page domain types and form validation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use kashpages_core::{
    BusinessCategory, Email, LandingPageId, PageStatus, Slug, SlugError, TwitterCard,
};

/// Target type recorded in audit entries for landing pages.
pub const TARGET_TYPE: &str = "landing_page";

const MAX_TITLE_CHARS: usize = 200;
const MAX_META_TITLE_CHARS: usize = 60;
const MAX_META_DESCRIPTION_CHARS: usize = 160;
const MAX_PHONE_CHARS: usize = 32;

/// A stored landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingPage {
    pub id: LandingPageId,
    #[serde(flatten)]
    pub content: PageContent,
    pub status: PageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl LandingPage {
    /// JSON snapshot used for audit diffs.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Validated, editable content of a landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub title: String,
    pub slug: Slug,
    pub business_name: String,
    pub business_category: BusinessCategory,
    pub business_location: String,
    pub business_phone: Option<String>,
    pub business_email: Option<Email>,
    pub business_website: Option<String>,
    pub description: String,
    pub meta_title: String,
    pub meta_description: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub twitter_card: TwitterCard,
    /// Stored HTML, served verbatim at `/{slug}` once published.
    pub html_content: String,
}

/// Per-field validation failures, keyed by the form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Returns `true` if no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Message for a field, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Names of the fields that failed.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Landing page form submission as sent by the admin editor.
///
/// Every field defaults to empty so that missing fields are reported by
/// [`LandingPageInput::validate`] rather than rejected during decoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LandingPageInput {
    pub title: String,
    pub slug: String,
    pub business_name: String,
    pub business_category: String,
    pub business_location: String,
    pub business_phone: Option<String>,
    pub business_email: Option<String>,
    pub business_website: Option<String>,
    pub description: String,
    pub meta_title: String,
    pub meta_description: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub twitter_card: Option<String>,
    pub html_content: String,
}

impl LandingPageInput {
    /// Validate the submission and convert it into page content.
    ///
    /// # Errors
    ///
    /// Returns every failing field at once.
    pub fn validate(self) -> Result<PageContent, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = required(&mut errors, "title", &self.title);
        if title.chars().count() > MAX_TITLE_CHARS {
            errors.add("title", format!("must be at most {MAX_TITLE_CHARS} characters"));
        }
        let business_name = required(&mut errors, "businessName", &self.business_name);
        let business_location = required(&mut errors, "businessLocation", &self.business_location);
        if self.html_content.trim().is_empty() {
            errors.add("htmlContent", "is required");
        }

        let slug = match Slug::parse(self.slug.trim()) {
            Ok(slug) => Some(slug),
            Err(SlugError::Length { .. }) if self.slug.trim().is_empty() => {
                errors.add("slug", "is required");
                None
            }
            Err(e) => {
                errors.add("slug", e.to_string());
                None
            }
        };

        let category = required(&mut errors, "businessCategory", &self.business_category);
        let business_category = if category.is_empty() {
            None
        } else {
            category
                .parse::<BusinessCategory>()
                .map_err(|e| errors.add("businessCategory", e))
                .ok()
        };

        let business_phone = optional(self.business_phone.as_deref());
        if let Some(phone) = &business_phone {
            let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')');
            if phone.chars().count() > MAX_PHONE_CHARS || !phone.chars().all(allowed) {
                errors.add("businessPhone", "must be a phone number");
            }
        }

        let business_email = optional(self.business_email.as_deref()).and_then(|email| {
            Email::parse(&email)
                .map_err(|e| errors.add("businessEmail", e.to_string()))
                .ok()
        });

        let business_website = optional(self.business_website.as_deref());
        if let Some(website) = &business_website
            && let Err(e) = parse_http_url(website)
        {
            errors.add("businessWebsite", e);
        }

        let og_image = self.og_image.trim().to_string();
        if !og_image.is_empty()
            && let Err(e) = parse_http_url(&og_image)
        {
            errors.add("ogImage", e);
        }

        let meta_title = self.meta_title.trim().to_string();
        if meta_title.chars().count() > MAX_META_TITLE_CHARS {
            errors.add(
                "metaTitle",
                format!("must be at most {MAX_META_TITLE_CHARS} characters"),
            );
        }
        let meta_description = self.meta_description.trim().to_string();
        if meta_description.chars().count() > MAX_META_DESCRIPTION_CHARS {
            errors.add(
                "metaDescription",
                format!("must be at most {MAX_META_DESCRIPTION_CHARS} characters"),
            );
        }

        let twitter_card = match optional(self.twitter_card.as_deref()) {
            None => TwitterCard::default(),
            Some(card) => card
                .parse::<TwitterCard>()
                .map_err(|e| errors.add("twitterCard", e))
                .unwrap_or_default(),
        };

        match (slug, business_category) {
            (Some(slug), Some(business_category)) if errors.is_empty() => Ok(PageContent {
                title,
                slug,
                business_name,
                business_category,
                business_location,
                business_phone,
                business_email,
                business_website,
                description: self.description.trim().to_string(),
                meta_title,
                meta_description,
                og_title: self.og_title.trim().to_string(),
                og_description: self.og_description.trim().to_string(),
                og_image,
                twitter_card,
                html_content: self.html_content,
            }),
            _ => Err(errors),
        }
    }
}

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "is required");
    }
    value.to_string()
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_http_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|_| "must be a valid URL".to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err("must be an http or https URL".to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_input() -> LandingPageInput {
        LandingPageInput {
            title: "MITC Store".to_string(),
            slug: "mitc-store".to_string(),
            business_name: "MITC Computer Store".to_string(),
            business_category: "retail".to_string(),
            business_location: "Residency Road, Srinagar".to_string(),
            business_phone: Some("+91 194 245 0000".to_string()),
            business_email: Some("hello@mitcstore.in".to_string()),
            business_website: Some("https://mitcstore.in".to_string()),
            description: "Laptops and repairs".to_string(),
            meta_title: "MITC Store Srinagar".to_string(),
            meta_description: "Laptops, accessories and repairs in Srinagar.".to_string(),
            og_title: String::new(),
            og_description: String::new(),
            og_image: String::new(),
            twitter_card: None,
            html_content: "<h1>MITC Store</h1>".to_string(),
        }
    }

    #[test]
    fn test_valid_input() {
        let content = valid_input().validate().unwrap();
        assert_eq!(content.slug.as_str(), "mitc-store");
        assert_eq!(content.business_category, BusinessCategory::Retail);
        assert_eq!(content.twitter_card, TwitterCard::SummaryLargeImage);
        assert_eq!(
            content.business_email.unwrap().as_str(),
            "hello@mitcstore.in"
        );
    }

    #[test]
    fn test_empty_input_reports_required_fields() {
        let errors = LandingPageInput::default().validate().unwrap_err();
        let fields: Vec<_> = errors.fields().collect();
        assert_eq!(
            fields,
            vec![
                "businessCategory",
                "businessLocation",
                "businessName",
                "htmlContent",
                "slug",
                "title",
            ]
        );
        assert_eq!(errors.get("slug"), Some("is required"));
    }

    #[test]
    fn test_rejects_bad_fields() {
        let input = LandingPageInput {
            slug: "Admin Page".to_string(),
            business_category: "restaurant".to_string(),
            business_email: Some("not-an-email".to_string()),
            business_website: Some("ftp://mitcstore.in".to_string()),
            meta_title: "x".repeat(61),
            meta_description: "x".repeat(161),
            ..valid_input()
        };
        let errors = input.validate().unwrap_err();
        for field in [
            "slug",
            "businessCategory",
            "businessEmail",
            "businessWebsite",
            "metaTitle",
            "metaDescription",
        ] {
            assert!(errors.get(field).is_some(), "{field} should fail");
        }
        assert!(errors.get("title").is_none());
    }

    #[test]
    fn test_reserved_slug() {
        let input = LandingPageInput {
            slug: "admin".to_string(),
            ..valid_input()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.get("slug"), Some("slug 'admin' is reserved"));
    }

    #[test]
    fn test_blank_optional_fields_are_dropped() {
        let input = LandingPageInput {
            business_phone: Some("  ".to_string()),
            business_email: Some(String::new()),
            business_website: None,
            ..valid_input()
        };
        let content = input.validate().unwrap();
        assert!(content.business_phone.is_none());
        assert!(content.business_email.is_none());
        assert!(content.business_website.is_none());
    }

    #[test]
    fn test_meta_limits_count_characters() {
        let input = LandingPageInput {
            meta_title: "ک".repeat(60),
            ..valid_input()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let input: LandingPageInput = serde_json::from_str(
            r#"{"title":"T","slug":"abc","businessName":"B","businessCategory":"food",
                "businessLocation":"L","htmlContent":"<p>x</p>","twitterCard":"summary"}"#,
        )
        .unwrap();
        let content = input.validate().unwrap();
        assert_eq!(content.twitter_card, TwitterCard::Summary);
        assert_eq!(content.business_category, BusinessCategory::Food);
    }

    #[test]
    fn test_validation_errors_display() {
        let errors = LandingPageInput {
            title: String::new(),
            ..valid_input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.to_string(), "title: is required");
    }
}
