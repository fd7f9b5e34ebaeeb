use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use super::flash::Flash;
use crate::config;

pub const ACCESS_DENIED_MESSAGE: &str =
    "You must be logged in with an account authorized to view this page.";

/// Turns 401/403 responses of browser requests into a flash error plus a
/// redirect to the login page. AJAX callers keep the JSON error body.
pub async fn access_denied_middleware(request: Request, next: Next) -> Response {
    let ajax = is_ajax(request.headers());
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let mut flash = Flash::from_headers(request.headers());

    let response = next.run(request).await;
    let status = response.status();
    if ajax || !(status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN) {
        return response;
    }

    tracing::warn!("Access denied ({}) for {}, redirecting to login", status, path);
    flash.error(ACCESS_DENIED_MESSAGE);
    flash.redirect(&login_redirect(&path))
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false)
}

fn login_redirect(next_path: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next_path)
        .finish();
    format!("{}?{}", config::config().security.login_url, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn login_redirect_encodes_next_path() {
        assert_eq!(
            login_redirect("/crypto_login?ip=10.0.0.1"),
            "/accounts/login/?next=%2Fcrypto_login%3Fip%3D10.0.0.1"
        );
    }

    #[test]
    fn detects_ajax_header() {
        let mut headers = HeaderMap::new();
        assert!(!is_ajax(&headers));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(is_ajax(&headers));
    }
}
