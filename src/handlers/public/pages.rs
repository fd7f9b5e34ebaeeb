// handlers/public/pages.rs - GET /, /glossary, /content/:page and the 404 fallback

use axum::{
    extract::{Path, State},
    http::Uri,
};
use serde_json::json;

use crate::app::AppState;
use crate::config;
use crate::error::ApiError;
use crate::middleware::{Flash, Page};

pub const FEED_LENGTH: i64 = 5;

pub async fn homepage(State(state): State<AppState>, flash: Flash) -> Result<Page, ApiError> {
    let feed = state.repo.latest_feed(FEED_LENGTH).await?;
    let site = &config::config().site;

    Ok(Page::new(
        "central/homepage.html",
        json!({
            "feed": feed,
            "central_contact_email": site.central_contact_email,
            "wiki_url": site.wiki_url,
        }),
    )
    .with_flash(flash))
}

pub async fn glossary(flash: Flash) -> Page {
    Page::new("central/glossary.html", json!({})).with_flash(flash)
}

/// GET /content/:page - render `central/content/{page}.html`
pub async fn content_page(Path(page): Path<String>, flash: Flash) -> Result<Page, ApiError> {
    if !is_valid_page_name(&page) {
        return Err(ApiError::not_found(format!("No content page named '{page}'")));
    }
    Ok(Page::new(format!("central/content/{page}.html"), json!({})).with_flash(flash))
}

pub async fn handler_404(uri: Uri) -> Page {
    tracing::debug!("No route for {}", uri.path());
    Page::not_found()
}

fn is_valid_page_name(page: &str) -> bool {
    !page.is_empty()
        && page
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_cannot_escape_content_dir() {
        assert!(is_valid_page_name("about"));
        assert!(is_valid_page_name("faq-2_sync"));
        assert!(!is_valid_page_name(""));
        assert!(!is_valid_page_name("../settings"));
        assert!(!is_valid_page_name("About"));
    }
}
