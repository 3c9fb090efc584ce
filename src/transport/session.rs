use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::AuthMethod;
use crate::errors::{MetabaseError, MetabaseResult};

pub const SESSION_HEADER: &str = "X-Metabase-Session";
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Supplies the credential the transport authenticates with.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session_token(&self) -> MetabaseResult<String>;
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
}

/// Logs in once per process and caches the session id.
/// With API-key auth the key itself is the token and no login happens.
pub struct SessionManager {
    client: reqwest::Client,
    base_url: String,
    auth: AuthMethod,
    token: Mutex<Option<String>>,
}

impl SessionManager {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            token: Mutex::new(None),
        }
    }

    /// Header name and value to attach to every API request.
    pub async fn auth_header(&self) -> MetabaseResult<(&'static str, String)> {
        match &self.auth {
            AuthMethod::ApiKey(key) => Ok((API_KEY_HEADER, key.clone())),
            AuthMethod::Session { .. } => Ok((SESSION_HEADER, self.session_token().await?)),
        }
    }

    /// Drops the cached session so the next call logs in again.
    pub async fn invalidate(&self) {
        if matches!(self.auth, AuthMethod::Session { .. }) {
            *self.token.lock().await = None;
        }
    }

    async fn login(&self, username: &str, password: &str) -> MetabaseResult<String> {
        let url = format!("{}/api/session", self.base_url);
        tracing::debug!(url = %url, "requesting Metabase session");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Metabase authentication failed");
            return Err(MetabaseError::Session(format!(
                "authentication failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let session: SessionResponse = response.json().await?;
        tracing::info!("Metabase session established");
        Ok(session.id)
    }
}

#[async_trait]
impl SessionProvider for SessionManager {
    async fn session_token(&self) -> MetabaseResult<String> {
        let (username, password) = match &self.auth {
            AuthMethod::ApiKey(key) => return Ok(key.clone()),
            AuthMethod::Session { username, password } => (username, password),
        };

        // Held across the login so concurrent invocations share one session.
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login(username, password).await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
