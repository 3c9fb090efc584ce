use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::MetabaseConfig;
use crate::errors::{MetabaseError, MetabaseResult};
use crate::transport::session::SessionManager;
use crate::transport::{ApiRequest, Transport};

/// `Transport` backed by reqwest. Timeouts come from the client; there is no
/// retry layer.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
    session: Arc<SessionManager>,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, session: Arc<SessionManager>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            session,
        }
    }

    /// Builds the client, session manager and transport from config.
    pub fn from_config(config: &MetabaseConfig) -> MetabaseResult<(Self, Arc<SessionManager>)> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let session = Arc::new(SessionManager::new(
            client.clone(),
            config.url.clone(),
            config.auth_method()?,
        ));
        let transport = Self::new(client, config.url.clone(), session.clone());
        Ok((transport, session))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: ApiRequest) -> MetabaseResult<Option<Value>> {
        let url = self.url(&request.path);
        let (header, credential) = self.session.auth_header().await?;

        tracing::debug!(method = request.method.as_str(), url = %url, "sending Metabase request");

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .header(header, credential);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.session.invalidate().await;
            }
            let text = response.text().await.unwrap_or_default();
            let data = serde_json::from_str::<Value>(&text).ok();
            tracing::debug!(status = status.as_u16(), body = %text, "Metabase request failed");
            let mut message = format!(
                "API request failed with status {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown status")
            );
            let detail = text.trim();
            if data.is_none() && !detail.is_empty() {
                message = format!("{message}: {detail}");
            }
            return Err(MetabaseError::Api {
                status: status.as_u16(),
                message,
                data,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }
}
