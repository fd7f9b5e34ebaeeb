use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth;
use crate::config;
use crate::database::models::User;
use crate::error::ApiError;

/// The logged-in user, resolved by `session_middleware`
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Resolves the session token (bearer header first, then the session cookie)
/// into a user and stores it in the request extensions. Anonymous requests
/// pass through untouched; handlers that need a user extract `CurrentUser`.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_session_token(request.headers()) {
        if let Some(user) = auth::authenticate(state.repo.as_ref(), &token).await? {
            tracing::debug!("Authenticated request for user '{}'", user.username);
            request.extensions_mut().insert(CurrentUser(user));
        }
    }

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    read_cookie(headers, &config::config().security.session_cookie)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .trim()
        .strip_prefix("Bearer ")
        .or_else(|| value.trim().strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Read a single cookie value from the `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
        .find(|val| !val.is_empty())
}
