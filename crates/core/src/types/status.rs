//! Status and classification enums for landing pages.

use serde::{Deserialize, Serialize};

/// Publication status of a landing page.
///
/// Only `Published` pages are served on the public site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "site.page_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Editable, not publicly visible.
    #[default]
    Draft,
    /// Served at its slug.
    Published,
}

impl PageStatus {
    /// Returns `true` if the page is publicly visible.
    #[must_use]
    pub const fn is_published(self) -> bool {
        matches!(self, Self::Published)
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

impl std::str::FromStr for PageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(format!("invalid page status: {s}")),
        }
    }
}

/// Business category shown on a landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessCategory {
    Retail,
    Food,
    Services,
    Tech,
    Healthcare,
    Education,
    Other,
}

impl BusinessCategory {
    /// Stable lowercase identifier, as stored and submitted by the admin form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Retail => "retail",
            Self::Food => "food",
            Self::Services => "services",
            Self::Tech => "tech",
            Self::Healthcare => "healthcare",
            Self::Education => "education",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for BusinessCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BusinessCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retail" => Ok(Self::Retail),
            "food" => Ok(Self::Food),
            "services" => Ok(Self::Services),
            "tech" => Ok(Self::Tech),
            "healthcare" => Ok(Self::Healthcare),
            "education" => Ok(Self::Education),
            "other" => Ok(Self::Other),
            _ => Err(format!("invalid business category: {s}")),
        }
    }
}

/// Twitter card layout for social previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TwitterCard {
    Summary,
    #[default]
    SummaryLargeImage,
}

impl TwitterCard {
    /// Value of the `twitter:card` meta tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::SummaryLargeImage => "summary_large_image",
        }
    }
}

impl std::fmt::Display for TwitterCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TwitterCard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(Self::Summary),
            "summary_large_image" => Ok(Self::SummaryLargeImage),
            _ => Err(format!("invalid twitter card: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_status_defaults_to_draft() {
        assert_eq!(PageStatus::default(), PageStatus::Draft);
        assert!(!PageStatus::Draft.is_published());
        assert!(PageStatus::Published.is_published());
    }

    #[test]
    fn test_page_status_string_forms_agree() {
        for status in [PageStatus::Draft, PageStatus::Published] {
            let parsed: PageStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
        assert!("archived".parse::<PageStatus>().is_err());
    }

    #[test]
    fn test_business_category_accepts_form_values() {
        for value in ["retail", "food", "services", "tech", "healthcare", "education", "other"] {
            let category: BusinessCategory = value.parse().unwrap();
            assert_eq!(category.as_str(), value);
        }
        assert!("restaurant".parse::<BusinessCategory>().is_err());
    }

    #[test]
    fn test_twitter_card_defaults_to_large_image() {
        assert_eq!(TwitterCard::default().as_str(), "summary_large_image");
        assert_eq!("summary".parse::<TwitterCard>().unwrap(), TwitterCard::Summary);
    }
}
