//! Client side of the session handshake with a distributed (peer) server.
//!
//! Only the first leg lives here: check that the peer answers, then open a
//! session by exchanging nonces. The cryptographic login that follows is the
//! peer's business; the browser is sent there with our client nonce.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::config;

const TEST_PATH: &str = "securesync/api/test";
const SESSION_CREATE_PATH: &str = "securesync/api/session/create";
const CRYPTO_LOGIN_PATH: &str = "securesync/cryptologin/";

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Invalid peer address: {0}")]
    InvalidHost(String),
    #[error("Peer request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Peer answered with status {0}")]
    Status(u16),
    #[error("Peer refused the session: {0}")]
    Refused(String),
    #[error("Peer is not a trusted server")]
    Untrusted,
}

/// An open session with a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSession {
    pub client_nonce: String,
    pub server_nonce: String,
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    client_nonce: &'a str,
    client_device: &'a str,
    client_version: &'a str,
    client_os: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    session: Option<SessionBody>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    server_nonce: String,
    #[serde(default)]
    trusted: bool,
}

pub struct SyncClient {
    host: Url,
    require_trusted: bool,
    http: reqwest::Client,
    pub session: Option<SyncSession>,
}

impl SyncClient {
    /// `host` is the peer base URL, e.g. `http://10.0.0.5:8008/`.
    pub fn new(host: &str, require_trusted: bool) -> Result<Self, SyncError> {
        let host = parse_host(host)?;
        let timeout = Duration::from_secs(config::config().sync.peer_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SyncError::Request)?;

        Ok(Self {
            host,
            require_trusted,
            http,
            session: None,
        })
    }

    /// Succeeds when the peer answers the test endpoint with a 2xx status.
    pub async fn test_connection(&self) -> Result<(), SyncError> {
        let url = self.endpoint(TEST_PATH)?;
        tracing::debug!("Testing peer connection at {}", url);

        let response = self.http.get(url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(SyncError::Status(response.status().as_u16()))
        }
    }

    /// Open a session with the peer. On success `self.session` holds both nonces;
    /// on any failure it stays empty.
    pub async fn start_session(&mut self) -> Result<(), SyncError> {
        self.session = None;

        let client_nonce = Uuid::new_v4().simple().to_string();
        let sync = &config::config().sync;
        let body = SessionRequest {
            client_nonce: &client_nonce,
            client_device: &sync.device_id,
            client_version: &sync.client_version,
            client_os: std::env::consts::OS,
        };

        let url = self.endpoint(SESSION_CREATE_PATH)?;
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status.as_u16()));
        }

        let payload: SessionResponse = response.json().await?;
        if let Some(error) = payload.error {
            return Err(SyncError::Refused(error));
        }
        let session = payload
            .session
            .ok_or_else(|| SyncError::Refused("no session in response".to_string()))?;
        if self.require_trusted && !session.trusted {
            return Err(SyncError::Untrusted);
        }

        tracing::info!("Opened session with peer {}", self.host);
        self.session = Some(SyncSession {
            client_nonce,
            server_nonce: session.server_nonce,
        });
        Ok(())
    }

    /// Where to send the browser to finish logging in on the peer.
    pub fn crypto_login_url(&self, client_nonce: &str) -> String {
        format!("{}{}?client_nonce={}", self.host, CRYPTO_LOGIN_PATH, client_nonce)
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.host
            .join(path)
            .map_err(|e| SyncError::InvalidHost(e.to_string()))
    }
}

fn parse_host(host: &str) -> Result<Url, SyncError> {
    let mut url = Url::parse(host).map_err(|e| SyncError::InvalidHost(format!("{host}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(SyncError::InvalidHost(host.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
