//! Session cookie carrying the identity provider's ID token.
//!
//! There is no server-side session store. The cookie holds the bearer
//! credential itself and the admin gate re-verifies it on every request.
//! Expiry is absolute: the cookie lives 7 days from issuance and is not
//! refreshed on use.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration as TimeDuration;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "kashpages_auth";

/// Session lifetime in seconds (7 days).
pub const SESSION_MAX_AGE_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Issues, reads and clears the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCookies {
    secure: bool,
}

impl SessionCookies {
    /// `secure` sets the `Secure` attribute (production / HTTPS deployments).
    #[must_use]
    pub const fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Set the session cookie, replacing any existing one.
    #[must_use]
    pub fn issue(&self, jar: CookieJar, credential: &str) -> CookieJar {
        let cookie = Cookie::build((SESSION_COOKIE_NAME, credential.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(TimeDuration::seconds(SESSION_MAX_AGE_SECONDS));

        jar.add(cookie)
    }

    /// The credential in the request's session cookie. An empty cookie reads
    /// as absent.
    #[must_use]
    pub fn read(&self, jar: &CookieJar) -> Option<String> {
        jar.get(SESSION_COOKIE_NAME)
            .map(Cookie::value)
            .filter(|value| !value.is_empty())
            .map(String::from)
    }

    /// Expire the session cookie. Safe to call when no cookie is present.
    #[must_use]
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let removal = Cookie::build((SESSION_COOKIE_NAME, ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(TimeDuration::ZERO);

        jar.add(removal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};
    use axum::response::IntoResponse;

    use super::*;

    fn set_cookie_headers(jar: CookieJar) -> Vec<String> {
        let response = (jar, ()).into_response();
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn jar_with(cookie: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_issue_sets_fixed_attributes() {
        let cookies = SessionCookies::new(true);
        let headers = set_cookie_headers(cookies.issue(CookieJar::new(), "tok_valid_admin_1"));

        assert_eq!(headers.len(), 1);
        let cookie = headers.first().unwrap();
        assert!(cookie.starts_with("kashpages_auth=tok_valid_admin_1"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn test_issue_without_secure_in_development() {
        let cookies = SessionCookies::new(false);
        let headers = set_cookie_headers(cookies.issue(CookieJar::new(), "tok"));
        assert!(!headers.first().unwrap().contains("Secure"));
    }

    #[test]
    fn test_reissue_overwrites() {
        let cookies = SessionCookies::new(false);
        let jar = cookies.issue(CookieJar::new(), "first");
        let jar = cookies.issue(jar, "second");

        assert_eq!(cookies.read(&jar).as_deref(), Some("second"));
        let headers = set_cookie_headers(jar);
        assert_eq!(headers.len(), 1);
        assert!(headers.first().unwrap().starts_with("kashpages_auth=second"));
    }

    #[test]
    fn test_read() {
        let cookies = SessionCookies::new(false);
        assert_eq!(
            cookies.read(&jar_with("kashpages_auth=tok_valid_admin_1; theme=dark")).as_deref(),
            Some("tok_valid_admin_1")
        );
        assert_eq!(cookies.read(&jar_with("kashpages_auth=")), None);
        assert_eq!(cookies.read(&jar_with("theme=dark")), None);
        assert_eq!(cookies.read(&CookieJar::new()), None);
    }

    #[test]
    fn test_clear_emits_removal_cookie() {
        let cookies = SessionCookies::new(false);
        let jar = cookies.clear(jar_with("kashpages_auth=tok_expired"));

        assert_eq!(cookies.read(&jar), None);
        let headers = set_cookie_headers(jar);
        let cookie = headers.first().unwrap();
        assert!(cookie.starts_with("kashpages_auth=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Path=/"));
    }

    #[test]
    fn test_clear_without_cookie_is_safe() {
        let cookies = SessionCookies::new(false);
        let headers = set_cookie_headers(cookies.clear(CookieJar::new()));
        assert!(headers.first().unwrap().contains("Max-Age=0"));
    }
}
