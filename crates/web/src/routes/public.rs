//! Public landing pages.

use axum::{
    Router,
    extract::{Path, State},
    response::Html,
    routing::get,
};

use crate::error::AppError;
use crate::state::AppState;

/// Build the public router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{slug}", get(show))
}

/// Serve the stored HTML of a published page, unchanged.
///
/// Drafts and unknown slugs are 404.
///
/// GET /{slug}
async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    state
        .pages()
        .find_published(&slug)
        .await?
        .map(|page| Html(page.content.html_content))
        .ok_or_else(|| AppError::NotFound(format!("page {slug}")))
}
