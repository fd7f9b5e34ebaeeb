// handlers/public/mod.rs - Public handlers (no login required)
//
// Static and content pages, the 404 fallback and newsletter sign-up.
pub mod pages;
pub mod subscribe;

pub use pages::{content_page, glossary, handler_404, homepage};
pub use subscribe::{subscribe_get, subscribe_post};
