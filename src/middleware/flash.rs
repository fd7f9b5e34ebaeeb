//! One-shot user messages carried between a redirect and the next rendered page.
//!
//! Messages live in a cookie as `level=text` pairs in form-urlencoded form.
//! A redirect writes every pending message (old and new) back to the cookie;
//! rendering a page hands them to the page and clears the cookie.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts, HeaderMap, HeaderValue},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Serialize;
use std::convert::Infallible;

use super::auth::read_cookie;
use crate::config;

pub const FLASH_COOKIE: &str = "central_messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(Level::Success),
            "info" => Some(Level::Info),
            "warning" => Some(Level::Warning),
            "error" => Some(Level::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Flash {
    messages: Vec<Message>,
}

impl Flash {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let messages = read_cookie(headers, FLASH_COOKIE)
            .map(|raw| decode(&raw))
            .unwrap_or_default();
        Self { messages }
    }

    pub fn push(&mut self, level: Level, text: impl Into<String>) {
        self.messages.push(Message {
            level,
            text: text.into(),
        });
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(Level::Success, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(Level::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Level::Error, text);
    }

    /// Redirect (303) while keeping every pending message for the next page.
    pub fn redirect(self, to: &str) -> Response {
        let cookie = if self.messages.is_empty() {
            None
        } else {
            cookie_header(&encode(&self.messages), None)
        };

        match cookie {
            Some(cookie) => (AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to(to)).into_response(),
            None => Redirect::to(to).into_response(),
        }
    }

    /// Hand the messages to a page being rendered.
    pub(crate) fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flash::from_headers(&parts.headers))
    }
}

/// `Set-Cookie` value that expires the flash cookie.
pub(crate) fn clear_cookie_header() -> Option<HeaderValue> {
    cookie_header("", Some(0))
}

fn cookie_header(value: &str, max_age: Option<u64>) -> Option<HeaderValue> {
    let mut cookie = format!("{FLASH_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if config::config().security.secure_cookies {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

fn encode(messages: &[Message]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(messages.iter().map(|m| (m.level.as_str(), m.text.as_str())))
        .finish()
}

fn decode(raw: &str) -> Vec<Message> {
    url::form_urlencoded::parse(raw.as_bytes())
        .filter_map(|(level, text)| {
            Some(Message {
                level: Level::parse(&level)?,
                text: text.into_owned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, StatusCode};

    #[test]
    fn cookie_value_survives_punctuation() {
        let messages = vec![
            Message {
                level: Level::Error,
                text: "You cannot delete 'Lab; East' because it has 2 zone(s) affiliated with it.".into(),
            },
            Message {
                level: Level::Success,
                text: "a=b & c".into(),
            },
        ];
        let encoded = encode(&messages);
        assert!(!encoded.contains(';'));
        assert!(!encoded.contains(' '));
        assert_eq!(decode(&encoded), messages);
    }

    #[test]
    fn unknown_levels_are_dropped() {
        assert_eq!(decode("debug=hidden&info=shown").len(), 1);
    }

    #[test]
    fn redirect_carries_old_and_new_messages() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("central_messages=info=earlier"));
        let mut flash = Flash::from_headers(&headers);
        flash.success("later");

        let response = flash.redirect("/org_management");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("central_messages=info=earlier&success=later;"));
    }

    #[test]
    fn redirect_without_messages_sets_no_cookie() {
        let response = Flash::default().redirect("/");
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
