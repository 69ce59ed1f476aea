//! Landing page admin API.
//!
//! Mounted under `{prefix}/api`, behind the admin gate. Responses are never
//! cached.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    routing::{get, post},
};
use tower_http::set_header::SetResponseHeaderLayer;

use kashpages_core::LandingPageId;

use crate::error::AppError;
use crate::middleware::{ClientIp, RequireAdminAuth};
use crate::models::{CurrentAdmin, LandingPage, LandingPageInput};
use crate::services::Actor;
use crate::state::AppState;

/// Build the admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/pages", get(list).post(create))
        .route("/pages/{id}", get(show).put(update).delete(destroy))
        .route("/pages/{id}/publish", post(publish))
        .route("/pages/{id}/unpublish", post(unpublish))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

fn actor(admin: CurrentAdmin, ClientIp(origin): ClientIp) -> Actor {
    Actor {
        subject_id: admin.subject_id,
        origin,
    }
}

/// The signed-in admin.
///
/// GET {prefix}/api/me
async fn me(RequireAdminAuth(admin): RequireAdminAuth) -> Json<CurrentAdmin> {
    Json(admin)
}

/// GET {prefix}/api/pages
async fn list(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<LandingPage>>, AppError> {
    Ok(Json(state.pages().list().await?))
}

/// GET {prefix}/api/pages/{id}
async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<LandingPageId>,
) -> Result<Json<LandingPage>, AppError> {
    Ok(Json(state.pages().get(id).await?))
}

/// POST {prefix}/api/pages
async fn create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    client_ip: ClientIp,
    Json(input): Json<LandingPageInput>,
) -> Result<(StatusCode, Json<LandingPage>), AppError> {
    let page = state
        .pages()
        .create(&actor(admin, client_ip), input)
        .await?;
    Ok((StatusCode::CREATED, Json(page)))
}

/// PUT {prefix}/api/pages/{id}
async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    client_ip: ClientIp,
    Path(id): Path<LandingPageId>,
    Json(input): Json<LandingPageInput>,
) -> Result<Json<LandingPage>, AppError> {
    let page = state
        .pages()
        .update(&actor(admin, client_ip), id, input)
        .await?;
    Ok(Json(page))
}

/// DELETE {prefix}/api/pages/{id}
async fn destroy(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    client_ip: ClientIp,
    Path(id): Path<LandingPageId>,
) -> Result<StatusCode, AppError> {
    state.pages().delete(&actor(admin, client_ip), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST {prefix}/api/pages/{id}/publish
async fn publish(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    client_ip: ClientIp,
    Path(id): Path<LandingPageId>,
) -> Result<Json<LandingPage>, AppError> {
    let page = state.pages().publish(&actor(admin, client_ip), id).await?;
    Ok(Json(page))
}

/// POST {prefix}/api/pages/{id}/unpublish
async fn unpublish(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    client_ip: ClientIp,
    Path(id): Path<LandingPageId>,
) -> Result<Json<LandingPage>, AppError> {
    let page = state
        .pages()
        .unpublish(&actor(admin, client_ip), id)
        .await?;
    Ok(Json(page))
}
