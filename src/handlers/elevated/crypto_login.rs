// handlers/elevated/crypto_login.rs - GET /crypto_login?ip=<addr> handler
//
// Logs a superuser into a distributed server: open a session with the peer,
// then send the browser to the peer's login endpoint with our client nonce.
// Peer failures are reported as plain-text 200 bodies.

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::SyncClient;

#[derive(Debug, Default, Deserialize)]
pub struct CryptoLoginQuery {
    #[serde(default)]
    pub ip: String,
}

pub async fn crypto_login(
    CurrentUser(user): CurrentUser,
    Query(query): Query<CryptoLoginQuery>,
) -> Result<Response, ApiError> {
    if !user.is_superuser {
        tracing::warn!("Non-superuser '{}' attempted a crypto login", user.username);
        return Err(ApiError::forbidden("Only superusers may log in to distributed servers."));
    }

    let ip = query.ip.trim();
    if ip.is_empty() {
        return Ok((StatusCode::NOT_FOUND, "Please specify an IP (as a GET param).").into_response());
    }

    let host = format!("http://{ip}/");
    let unreachable = || format!("Unable to connect to a distributed server at {host}").into_response();

    let mut client = match SyncClient::new(&host, false) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Bad peer address '{}': {}", ip, e);
            return Ok(unreachable());
        }
    };

    if let Err(e) = client.test_connection().await {
        tracing::warn!("Peer {} is unreachable: {}", host, e);
        return Ok(unreachable());
    }

    if let Err(e) = client.start_session().await {
        tracing::warn!("Peer {} refused a session: {}", host, e);
    }
    let nonce = match client.session.as_ref().map(|s| s.client_nonce.as_str()) {
        Some(nonce) if !nonce.is_empty() => nonce.to_string(),
        _ => {
            return Ok(format!("Unable to establish a session with distributed server at {host}")
                .into_response())
        }
    };

    tracing::info!("Superuser '{}' handed off to peer {}", user.username, host);
    Ok(Redirect::to(&client.crypto_login_url(&nonce)).into_response())
}
