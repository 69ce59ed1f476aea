//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! # Session exchange (public)
//! GET    {login path}                      - Login page shell
//! POST   /api/auth/session                 - Exchange ID token for session cookie
//! POST   /api/auth/logout                  - Clear session cookie
//!
//! # Admin (behind the gate, default prefix /admin)
//! GET    {prefix}                          - Admin shell
//! GET    {prefix}/api/me                   - Signed-in admin
//! GET    {prefix}/api/pages                - List pages
//! POST   {prefix}/api/pages                - Create draft
//! GET    {prefix}/api/pages/{id}           - Page detail
//! PUT    {prefix}/api/pages/{id}           - Replace content
//! DELETE {prefix}/api/pages/{id}           - Delete page
//! POST   {prefix}/api/pages/{id}/publish   - Publish + rebuild
//! POST   {prefix}/api/pages/{id}/unpublish - Unpublish + rebuild
//!
//! # Public site
//! GET    /{slug}                           - Published landing page HTML
//! ```
//!
//! Health endpoints are mounted by the binary since they need the pool.

pub mod auth;
pub mod pages;
pub mod public;

use axum::{Router, middleware};

use crate::error::AppError;
use crate::middleware::{admin_gate, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Build the application router with its middleware.
pub fn router(state: AppState) -> Router {
    let area = state.admin_area().clone();

    Router::new()
        .merge(auth::router(&area))
        .nest(&format!("{}/api", area.prefix), pages::router())
        .merge(public::router())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), admin_gate))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("route".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::testing::{TestSite, sample_input};

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = cookie {
            builder = builder.header(header::COOKIE, format!("kashpages_auth={token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn send_json(method: Method, uri: &str, cookie: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("kashpages_auth={cookie}"))
            .header(header::CONTENT_TYPE, "application/json")
            .header("cf-connecting-ip", "203.0.113.9")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_no_cookie_redirects_without_set_cookie() {
        let site = TestSite::new().await;
        let response = site.router().oneshot(get("/admin", None)).await.unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/admin/login");
        assert!(set_cookies(&response).is_empty());
        assert_eq!(site.identity.verify_calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_credential_redirects_and_clears_cookie() {
        let site = TestSite::new().await;
        let response = site
            .router()
            .oneshot(get("/admin", Some("tok_expired")))
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/admin/login");
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        let cookie = cookies.first().unwrap();
        assert!(cookie.starts_with("kashpages_auth=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_non_admin_redirects_and_clears_cookie() {
        let site = TestSite::new().await;
        let response = site
            .router()
            .oneshot(get("/admin/api/pages", Some("tok_valid_nonadmin")))
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/admin/login");
        assert!(set_cookies(&response).first().unwrap().contains("Max-Age=0"));
        assert_eq!(site.admins.lookup_calls(), 1);
    }

    #[tokio::test]
    async fn test_admin_is_admitted_without_cookie_mutation() {
        let site = TestSite::new().await;
        let response = site
            .router()
            .oneshot(get("/admin/api/me", Some("tok_valid_admin_1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let body = body_json(response).await;
        assert_eq!(body["subject_id"], "uid_7");
    }

    #[tokio::test]
    async fn test_two_sequential_requests_both_admitted() {
        let site = TestSite::new().await;
        for _ in 0..2 {
            let response = site
                .router()
                .oneshot(get("/admin", Some("tok_valid_admin_1")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(site.identity.verify_calls(), 2);
        assert_eq!(site.admins.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn test_login_path_always_admitted() {
        let site = TestSite::new().await;
        for cookie in [None, Some("tok_expired"), Some("tok_valid_nonadmin")] {
            let response = site
                .router()
                .oneshot(get("/admin/login", cookie))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(set_cookies(&response).is_empty());
        }
        assert_eq!(site.identity.verify_calls(), 0);
    }

    #[tokio::test]
    async fn test_public_paths_skip_verification() {
        let site = TestSite::new().await;
        let response = site
            .router()
            .oneshot(get("/unknown-business", Some("tok_expired")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(site.identity.verify_calls(), 0);
        assert_eq!(site.admins.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_admin_route_is_still_gated() {
        let site = TestSite::new().await;
        let response = site
            .router()
            .oneshot(get("/admin/does/not/exist", None))
            .await
            .unwrap();
        assert!(response.status().is_redirection());
    }

    #[tokio::test]
    async fn test_security_headers_on_redirects_and_pages() {
        let site = TestSite::new().await;
        for request in [get("/admin", None), get("/admin/login", None)] {
            let response = site.router().oneshot(request).await.unwrap();
            assert_eq!(response.headers()["x-content-type-options"], "nosniff");
            assert_eq!(response.headers()["x-frame-options"], "DENY");
            assert!(response.headers().contains_key("x-request-id"));
        }
    }

    #[tokio::test]
    async fn test_session_exchange_issues_cookie() {
        let site = TestSite::new().await;
        let response = site
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/session")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"id_token": "tok_valid_admin_1"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        let cookie = cookies.first().unwrap();
        assert!(cookie.starts_with("kashpages_auth=tok_valid_admin_1"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_session_exchange_refusals_are_indistinguishable() {
        let site = TestSite::new().await;
        let mut bodies = Vec::new();
        for token in ["tok_expired", "tok_valid_nonadmin", ""] {
            let response = site
                .router()
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri("/api/auth/session")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(json!({"id_token": token}).to_string()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert!(set_cookies(&response).is_empty());
            bodies.push(body_json(response).await);
        }
        assert!(bodies.windows(2).all(|w| w.first() == w.get(1)));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let site = TestSite::new().await;
        let response = site
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/logout")
                    .header(header::COOKIE, "kashpages_auth=tok_valid_admin_1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/admin/login");
        assert!(set_cookies(&response).first().unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_publish_flow_serves_public_page() {
        let site = TestSite::new().await;
        let mut input = sample_input("chinar-cafe");
        input.html_content = "<h1>Chinar Cafe</h1>".to_string();
        let body = serde_json::to_value(input).unwrap();

        let response = site
            .router()
            .oneshot(send_json(Method::POST, "/admin/api/pages", "tok_valid_admin_1", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["status"], "draft");

        // Drafts are not public
        let response = site.router().oneshot(get("/chinar-cafe", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = site
            .router()
            .oneshot(send_json(
                Method::POST,
                &format!("/admin/api/pages/{id}/publish"),
                "tok_valid_admin_1",
                &json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = site.router().oneshot(get("/chinar-cafe", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&html[..], b"<h1>Chinar Cafe</h1>");

        site.audit.wait_for(2).await;
        site.hook.wait_for(1).await;
        let entries = site.audit.entries();
        let publish = entries.iter().find(|e| e.action == "page.publish").unwrap();
        assert_eq!(publish.ip_address, "203.0.113.9");
        assert_eq!(publish.admin_id.as_str(), "uid_7");
    }

    #[tokio::test]
    async fn test_publish_outcome_ignores_side_effect_failures() {
        let site = TestSite::new().await;
        site.audit.set_failing(true);
        site.hook.set_failing(true);
        let body = serde_json::to_value(sample_input("apple-orchard")).unwrap();

        let response = site
            .router()
            .oneshot(send_json(Method::POST, "/admin/api/pages", "tok_valid_admin_1", &body))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_i64().unwrap();

        let response = site
            .router()
            .oneshot(send_json(
                Method::POST,
                &format!("/admin/api/pages/{id}/publish"),
                "tok_valid_admin_1",
                &json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "published");
        site.hook.wait_for(1).await;
    }

    #[tokio::test]
    async fn test_invalid_page_is_422_and_duplicate_slug_409() {
        let site = TestSite::new().await;
        let mut invalid = sample_input("ok-slug");
        invalid.meta_description = "x".repeat(161);
        let body = serde_json::to_value(invalid).unwrap();
        let response = site
            .router()
            .oneshot(send_json(Method::POST, "/admin/api/pages", "tok_valid_admin_1", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["fields"]["metaDescription"].is_string());

        let body = serde_json::to_value(sample_input("twin-slug")).unwrap();
        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let response = site
                .router()
                .oneshot(send_json(Method::POST, "/admin/api/pages", "tok_valid_admin_1", &body))
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }
}
