use axum::{
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use super::flash::{clear_cookie_header, Flash, Message};

/// A rendered page: the template name plus the context handed to it.
///
/// Template rendering happens outside this service, so the page goes out as a
/// JSON view model `{ "template", "context", "messages" }`.
#[derive(Debug)]
pub struct Page {
    pub template: String,
    context: Result<Value, String>,
    status: StatusCode,
    messages: Vec<Message>,
    clear_flash: bool,
}

impl Page {
    pub fn new(template: impl Into<String>, context: impl Serialize) -> Self {
        Self {
            template: template.into(),
            context: serde_json::to_value(context).map_err(|e| e.to_string()),
            status: StatusCode::OK,
            messages: Vec::new(),
            clear_flash: false,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Consume pending flash messages; the flash cookie is cleared on the way out.
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.messages.extend(flash.into_messages());
        self.clear_flash = true;
        self
    }

    pub fn not_found() -> Self {
        Self::new("central/404.html", json!({})).with_status(StatusCode::NOT_FOUND)
    }

    pub fn server_error() -> Self {
        Self::new("central/500.html", json!({})).with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let context = match self.context {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize context for {}: {}", self.template, e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "template": "central/500.html",
                        "context": {},
                        "messages": []
                    })),
                )
                    .into_response();
            }
        };

        let body = json!({
            "template": self.template,
            "context": context,
            "messages": self.messages,
        });

        let mut response = (self.status, Json(body)).into_response();
        if self.clear_flash {
            if let Some(cookie) = clear_cookie_header() {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

    #[tokio::test]
    async fn page_body_carries_template_context_and_messages() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("central_messages=success=saved"));
        let page = Page::new("central/glossary.html", json!({ "title": "Glossary" }))
            .with_flash(Flash::from_headers(&headers));

        let response = page.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["template"], "central/glossary.html");
        assert_eq!(body["context"]["title"], "Glossary");
        assert_eq!(body["messages"][0]["level"], "success");
        assert_eq!(body["messages"][0]["text"], "saved");
    }

    #[test]
    fn error_pages_use_their_status() {
        assert_eq!(Page::not_found().into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Page::server_error().into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
