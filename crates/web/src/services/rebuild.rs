//! Static site rebuild trigger.
//!
//! Publishing or unpublishing a page changes what the static export must
//! contain, so the CI/build system is asked to regenerate it. One backend is
//! configured per deployment:
//!
//! - **GitHub Actions**: `workflow_dispatch` on the site repository
//! - **Build hook**: bare `POST` to a hook URL (e.g. Netlify)
//!
//! Triggering is fire-and-forget. A missing backend or a failed call is
//! logged and never reaches the request that caused it.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use reqwest::header::{ACCEPT, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{GitHubDispatchConfig, RebuildConfig};

/// GitHub REST API version header value.
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Errors that can occur when triggering a rebuild.
#[derive(Debug, Error)]
pub enum RebuildError {
    /// No rebuild backend is configured.
    #[error("rebuild backend not configured")]
    NotConfigured,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Why a rebuild was requested. Sent to the workflow as the `trigger` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    PagePublished,
    PageUnpublished,
    PageUpdated,
    PageDeleted,
}

impl RebuildReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PagePublished => "page_published",
            Self::PageUnpublished => "page_unpublished",
            Self::PageUpdated => "page_updated",
            Self::PageDeleted => "page_deleted",
        }
    }
}

impl std::fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
struct DispatchRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: DispatchInputs<'a>,
}

#[derive(Debug, Serialize)]
struct DispatchInputs<'a> {
    trigger: &'a str,
    timestamp: String,
}

/// Client for the configured rebuild backend.
#[derive(Clone)]
pub struct RebuildTrigger {
    inner: Arc<RebuildTriggerInner>,
}

struct RebuildTriggerInner {
    http: reqwest::Client,
    config: RebuildConfig,
}

impl RebuildTrigger {
    /// Create a trigger for the given backend.
    #[must_use]
    pub fn new(http: reqwest::Client, config: RebuildConfig) -> Self {
        Self {
            inner: Arc::new(RebuildTriggerInner { http, config }),
        }
    }

    /// A trigger with no backend; every call is skipped.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(reqwest::Client::new(), RebuildConfig::Disabled)
    }

    /// Request a rebuild, logging and discarding any failure.
    pub async fn trigger(&self, reason: RebuildReason) {
        match self.try_trigger(reason).await {
            Ok(()) => {}
            Err(RebuildError::NotConfigured) => {
                tracing::warn!(
                    reason = %reason,
                    "Rebuild backend not configured, skipping rebuild"
                );
            }
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    reason = %reason,
                    sentry_event_id = %event_id,
                    "Failed to trigger rebuild"
                );
            }
        }
    }

    /// Request a rebuild in a background task and return its handle.
    pub fn spawn(&self, reason: RebuildReason) -> JoinHandle<()> {
        let trigger = self.clone();
        tokio::spawn(async move { trigger.trigger(reason).await })
    }

    /// Request a rebuild.
    ///
    /// # Errors
    ///
    /// Returns `RebuildError::NotConfigured` if no backend is configured, or
    /// an HTTP/API error if the backend call fails.
    pub async fn try_trigger(&self, reason: RebuildReason) -> Result<(), RebuildError> {
        let response = match &self.inner.config {
            RebuildConfig::Disabled => return Err(RebuildError::NotConfigured),
            RebuildConfig::GitHub(github) => self.dispatch_workflow(github, reason).await?,
            RebuildConfig::BuildHook { url } => {
                self.inner.http.post(url.expose_secret()).send().await?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RebuildError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(reason = %reason, "Rebuild triggered");
        Ok(())
    }

    async fn dispatch_workflow(
        &self,
        github: &GitHubDispatchConfig,
        reason: RebuildReason,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!(
            "{}/repos/{}/{}/actions/workflows/{}/dispatches",
            github.api_url.trim_end_matches('/'),
            github.owner,
            github.repo,
            github.workflow
        );
        let body = DispatchRequest {
            git_ref: &github.git_ref,
            inputs: DispatchInputs {
                trigger: reason.as_str(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        };

        self.inner
            .http
            .post(&url)
            .bearer_auth(github.token.expose_secret())
            .header(ACCEPT, HeaderValue::from_static("application/vnd.github+json"))
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .json(&body)
            .send()
            .await
    }
}
