#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, Method, Request, StatusCode,
    },
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use central_admin::{
    app::{app, AppState},
    auth,
    database::{
        models::{NewOrganization, Organization, User},
        MemoryRepository, Repository,
    },
    services::{InvitationEmail, MailError, Mailer},
};

/// Mailer that keeps every invitation it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<InvitationEmail>>,
    fail: Mutex<bool>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<InvitationEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn fail_next(&self) {
        if let Ok(mut fail) = self.fail.lock() {
            *fail = true;
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), MailError> {
        let mut fail = self.fail.lock().map_err(|e| MailError::Transport(e.to_string()))?;
        if *fail {
            *fail = false;
            return Err(MailError::Transport("mail relay down".into()));
        }
        self.sent
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?
            .push(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub repo: Arc<MemoryRepository>,
    pub mailer: Arc<RecordingMailer>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(repo.clone(), mailer.clone());
        Self {
            repo,
            mailer,
            router: app(state),
        }
    }

    pub async fn user(&self, username: &str, superuser: bool) -> Result<User> {
        let email = format!("{username}@example.org");
        Ok(self.repo.create_user(username, &email, superuser).await?)
    }

    pub async fn org(&self, owner: &User, name: &str) -> Result<Organization> {
        Ok(self
            .repo
            .create_organization(
                NewOrganization {
                    name: name.to_string(),
                    description: None,
                    url: None,
                },
                owner.id,
            )
            .await?)
    }

    pub async fn get(&self, path: &str, user: Option<&User>) -> Result<TestResponse> {
        self.request(Method::GET, path, user, None, &[]).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        user: Option<&User>,
        fields: &[(&str, &str)],
    ) -> Result<TestResponse> {
        self.request(Method::POST, path, user, Some(fields), &[]).await
    }

    /// POST as an XMLHttpRequest, so denials come back as JSON errors.
    pub async fn post_form_ajax(
        &self,
        path: &str,
        user: Option<&User>,
        fields: &[(&str, &str)],
    ) -> Result<TestResponse> {
        self.request(
            Method::POST,
            path,
            user,
            Some(fields),
            &[("x-requested-with", "XMLHttpRequest")],
        )
        .await
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        user: Option<&User>,
        fields: Option<&[(&str, &str)]>,
        headers: &[(&str, &str)],
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(user) = user {
            let token = auth::session_token_for(user)?;
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = match fields {
            Some(fields) => {
                builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(
                    url::form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(fields.iter())
                        .finish(),
                )
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).context("failed to build request")?)
            .await
            .context("router failed")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    /// Send a request carrying a flash cookie (as a browser would after a redirect).
    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .uri(path)
            .header(COOKIE, cookie)
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Flash messages written by a redirect, as (level, text) pairs.
    pub fn flash(&self) -> Vec<(String, String)> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.strip_prefix("central_messages="))
            .filter_map(|v| v.split(';').next())
            .flat_map(|v| {
                url::form_urlencoded::parse(v.as_bytes())
                    .map(|(level, text)| (level.into_owned(), text.into_owned()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn flash_cookie(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("central_messages="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}
