//! Session exchange and admin shell routes.
//!
//! Admins sign in with Firebase in the browser, then post the resulting ID
//! token here. The token is checked exactly as the gate would check it, then
//! stored in the session cookie.

use axum::{
    Json, Router,
    extract::State,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::config::AdminAreaConfig;
use crate::error::{AppError, clear_sentry_user};
use crate::middleware::{GateOutcome, RequireAdminAuth};
use crate::models::CurrentAdmin;
use crate::state::AppState;

const LOGIN_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta name="robots" content="noindex">
  <title>Sign in - KashPages Admin</title>
</head>
<body>
  <main id="login-root" data-session-endpoint="/api/auth/session"></main>
</body>
</html>
"#;

const ADMIN_SHELL: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta name="robots" content="noindex">
  <title>KashPages Admin</title>
</head>
<body>
  <main id="admin-root"></main>
</body>
</html>
"#;

/// Build the auth router for the configured admin area.
pub fn router(area: &AdminAreaConfig) -> Router<AppState> {
    Router::new()
        .route(&area.login_path, get(login_page))
        .route(&area.prefix, get(admin_shell))
        .route("/api/auth/session", post(create_session))
        .route("/api/auth/logout", post(logout))
}

/// Login page shell. Rendering the sign-in form is left to the client.
///
/// GET {login path}
async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

/// Admin dashboard shell.
///
/// GET {prefix}
async fn admin_shell(RequireAdminAuth(_admin): RequireAdminAuth) -> Html<&'static str> {
    Html(ADMIN_SHELL)
}

#[derive(Debug, Deserialize)]
struct SessionRequest {
    id_token: String,
}

/// Exchange a Firebase ID token for a session cookie.
///
/// Any failure is a bare 401 so callers cannot tell an invalid token from a
/// non-admin.
///
/// POST /api/auth/session
async fn create_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SessionRequest>,
) -> Result<(CookieJar, Json<CurrentAdmin>), AppError> {
    let token = request.id_token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    match state.gate().authorize(token).await {
        GateOutcome::Admitted(admin) => {
            tracing::info!(subject_id = %admin.subject_id, "Admin session created");
            Ok((state.cookies().issue(jar, token), Json(admin)))
        }
        outcome => {
            tracing::info!(decision = outcome.as_str(), "Session exchange refused");
            Err(AppError::Unauthorized)
        }
    }
}

/// Clear the session cookie and return to the login page.
///
/// POST /api/auth/logout
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    clear_sentry_user();
    (
        state.cookies().clear(jar),
        Redirect::to(&state.admin_area().login_path),
    )
}
