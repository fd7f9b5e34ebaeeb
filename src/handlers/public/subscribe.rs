// handlers/public/subscribe.rs - GET/POST /subscribe handler

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::Response,
    Form,
};
use serde::Deserialize;
use std::net::SocketAddr;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::Flash;

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeForm {
    #[serde(default)]
    pub email: String,
}

pub async fn subscribe_get(flash: Flash) -> Response {
    flash.redirect("/")
}

pub async fn subscribe_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut flash: Flash,
    Form(form): Form<SubscribeForm>,
) -> Result<Response, ApiError> {
    let email = form.email.trim();
    if email.is_empty() {
        flash.error("Please enter an email address to subscribe.");
        return Ok(flash.redirect("/"));
    }

    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    state.repo.create_subscription(email, &ip).await?;
    tracing::info!("Subscription added for '{}' from '{}'", email, ip);

    flash.success(format!("A subscription for '{email}' was added."));
    Ok(flash.redirect("/"))
}

/// The forwarding header wins as sent; otherwise the peer socket address.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_string();
    }
    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}
