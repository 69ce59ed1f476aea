//! Integration tests for the admin session gate over HTTP.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;

use kashpages_integration_tests::{
    ADMIN_TOKEN, NON_ADMIN_TOKEN, TestContext, assert_redirected_to_login, session_set_cookie,
};

// =============================================================================
// Gate Decisions
// =============================================================================

#[tokio::test]
async fn test_anonymous_request_is_redirected_without_touching_cookies() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/admin", None).await;

    assert_redirected_to_login(&response);
    assert!(session_set_cookie(&response).is_none());
    assert_eq!(ctx.site.identity.verify_calls(), 0);
}

#[tokio::test]
async fn test_invalid_token_is_redirected_and_cleared() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/admin/api/pages", Some("tok_expired")).await;

    assert_redirected_to_login(&response);
    let cleared = session_set_cookie(&response).unwrap();
    assert!(cleared.contains("Max-Age=0"), "cookie not cleared: {cleared}");
}

#[tokio::test]
async fn test_non_admin_is_redirected_and_cleared() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/admin", Some(NON_ADMIN_TOKEN)).await;

    assert_redirected_to_login(&response);
    assert!(session_set_cookie(&response).is_some());
}

#[tokio::test]
async fn test_admin_is_admitted_on_every_request() {
    let ctx = TestContext::new().await;

    for _ in 0..3 {
        let response = ctx.get("/admin/api/me", Some(ADMIN_TOKEN)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_set_cookie(&response).is_none());
    }

    assert_eq!(ctx.site.identity.verify_calls(), 3);
    assert_eq!(ctx.site.admins.lookup_calls(), 3);
}

#[tokio::test]
async fn test_revoked_admin_is_refused_on_next_request() {
    let ctx = TestContext::new().await;

    let before = ctx.get("/admin", Some(ADMIN_TOKEN)).await;
    assert_eq!(before.status(), StatusCode::OK);

    ctx.site.admins.revoke("uid_7");

    let after = ctx.get("/admin", Some(ADMIN_TOKEN)).await;
    assert_redirected_to_login(&after);
}

#[tokio::test]
async fn test_login_and_public_paths_are_not_gated() {
    let ctx = TestContext::new().await;

    let login = ctx.get("/admin/login", None).await;
    assert_eq!(login.status(), StatusCode::OK);

    let missing_page = ctx.get("/no-such-page", Some("tok_expired")).await;
    assert_eq!(missing_page.status(), StatusCode::NOT_FOUND);

    let lookalike = ctx.get("/administrator", None).await;
    assert_eq!(lookalike.status(), StatusCode::NOT_FOUND);

    assert_eq!(ctx.site.identity.verify_calls(), 0);
}

// =============================================================================
// Session Exchange
// =============================================================================

#[tokio::test]
async fn test_signed_in_cookie_opens_the_admin_area() {
    let ctx = TestContext::new().await;

    let response = ctx.sign_in(ADMIN_TOKEN).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = session_set_cookie(&response).unwrap();
    assert!(cookie.contains("HttpOnly"), "cookie: {cookie}");
    assert!(cookie.contains("SameSite=Lax"), "cookie: {cookie}");

    let token = cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value.to_string())
        .unwrap();
    assert_eq!(token, ADMIN_TOKEN);

    let admin = ctx.get("/admin", Some(&token)).await;
    assert_eq!(admin.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refused_sign_ins_look_the_same() {
    let ctx = TestContext::new().await;

    let non_admin = ctx.sign_in(NON_ADMIN_TOKEN).await;
    let status = non_admin.status();
    let non_admin_body = non_admin.text().await.unwrap();

    let invalid = ctx.sign_in("tok_garbage").await;
    assert_eq!(invalid.status(), status);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(invalid.text().await.unwrap(), non_admin_body);
}
