//! Integration tests for KashPages.
//!
//! Each test serves the full router on a localhost port, wired to the
//! in-memory collaborators from `kashpages_web::testing`, and talks to it
//! over real HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kashpages-integration-tests
//! ```
//!
//! No database or Firebase project is needed.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{Response, StatusCode};
use serde_json::Value;

use kashpages_web::middleware::SESSION_COOKIE_NAME;
use kashpages_web::testing::{TestSite, spawn_server};

pub use kashpages_web::testing::sample_input;

/// Token the fixtures map to an allow-listed admin (`uid_7`).
pub const ADMIN_TOKEN: &str = "tok_valid_admin_1";

/// Token the fixtures map to a verified user who is not an admin.
pub const NON_ADMIN_TOKEN: &str = "tok_valid_nonadmin";

/// A running site plus an HTTP client that does not follow redirects.
pub struct TestContext {
    pub site: TestSite,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestContext {
    pub async fn new() -> Self {
        let site = TestSite::new().await;
        let base_url = spawn_server(site.router()).await;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("build test client");

        Self {
            site,
            base_url,
            client,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path`, sending `token` as the session cookie when given.
    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.header(COOKIE, session_cookie(token));
        }
        request.send().await.expect("GET request")
    }

    /// POST a JSON body to `path` as the admin behind `token`.
    pub async fn post_json(&self, path: &str, token: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .header(COOKIE, session_cookie(token))
            .header("cf-connecting-ip", "203.0.113.9")
            .json(body)
            .send()
            .await
            .expect("POST request")
    }

    /// Exchange an ID token for a session cookie.
    pub async fn sign_in(&self, id_token: &str) -> Response {
        self.client
            .post(self.url("/api/auth/session"))
            .json(&serde_json::json!({ "id_token": id_token }))
            .send()
            .await
            .expect("session exchange")
    }
}

/// `Cookie` header value carrying `token`.
#[must_use]
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE_NAME}={token}")
}

/// The `Location` header, if any.
#[must_use]
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// The session `Set-Cookie` header, if any.
#[must_use]
pub fn session_set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(SESSION_COOKIE_NAME))
        .map(str::to_string)
}

/// Assert `response` is the gate's redirect to the login page.
pub fn assert_redirected_to_login(response: &Response) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response).as_deref(), Some("/admin/login"));
}
