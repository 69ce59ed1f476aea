//! CLI subcommands.

pub mod admin;
pub mod audit;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;

/// Environment variable holding the site database URL (`DATABASE_URL` is the fallback).
pub const DATABASE_URL_VAR: &str = "KASHPAGES_DATABASE_URL";

/// Database URL from the environment, loading `.env` first.
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
        .map(SecretString::from)
}

/// Connect to the site database.
async fn connect() -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url() else {
        return Ok(None);
    };

    tracing::info!("Connecting to site database...");
    kashpages_web::db::create_pool(&url).await.map(Some)
}
