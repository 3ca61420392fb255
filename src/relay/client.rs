//! Relay client used by the terminal chat client.
//!
//! The chat session controller talks to the relay through the [`Relay`]
//! trait; [`HttpRelayClient`] is the reqwest implementation against a
//! running `kondate serve` instance. Keeping the trait here lets session
//! tests run against a mock relay without a server.

use crate::error::{KondateError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Successful reply from POST /api/chat
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    /// Assistant answer text
    pub answer: String,
    /// Vendor conversation token (tracked relay-side; informational here)
    #[serde(rename = "conversationId", default)]
    pub conversation_id: String,
    /// Vendor id of the answer message
    #[serde(rename = "messageId", default)]
    pub message_id: String,
}

/// Reply from GET /api/health
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    /// Liveness marker, "ok" when the relay is up
    pub status: String,
    /// Whether the relay has a vendor credential configured
    #[serde(rename = "apiConfigured", default)]
    pub api_configured: bool,
}

/// Error body the relay returns on non-success statuses
#[derive(Debug, Deserialize)]
struct RelayErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Client-side interface to the relay server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Relay: Send + Sync {
    /// Send one chat turn for the given user
    async fn send_chat(&self, message: &str, user_id: &str) -> Result<ChatReply>;

    /// Clear the relay's stored vendor conversation for the user
    async fn reset(&self, user_id: &str) -> Result<()>;

    /// Check relay liveness and vendor configuration
    async fn health(&self) -> Result<HealthStatus>;
}

/// HTTP relay client
pub struct HttpRelayClient {
    client: Client,
    base_url: String,
}

impl HttpRelayClient {
    /// Create a client for the relay at `base_url`
    ///
    /// # Examples
    ///
    /// ```
    /// use kondate::relay::client::HttpRelayClient;
    ///
    /// let client = HttpRelayClient::new("http://127.0.0.1:3000").unwrap();
    /// ```
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("kondate/0.2.0")
            .build()
            .map_err(|e| KondateError::Relay(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Turn a non-success relay response into a readable error.
    async fn decode_error(response: reqwest::Response) -> KondateError {
        let status = response.status();
        let body: RelayErrorBody = response.json().await.unwrap_or(RelayErrorBody {
            error: None,
            details: None,
        });

        let mut text = body
            .error
            .unwrap_or_else(|| "APIエラーが発生しました".to_string());
        if let Some(details) = body.details {
            if !details.is_empty() {
                text = format!("{}: {}", text, details);
            }
        }

        KondateError::Relay(format!("status={}, {}", status.as_u16(), text))
    }
}

#[async_trait]
impl Relay for HttpRelayClient {
    async fn send_chat(&self, message: &str, user_id: &str) -> Result<ChatReply> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&serde_json::json!({ "message": message, "userId": user_id }))
            .send()
            .await
            .map_err(|e| KondateError::Relay(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::decode_error(response).await.into());
        }

        let reply = response
            .json()
            .await
            .map_err(|e| KondateError::Relay(format!("Malformed response: {}", e)))?;
        Ok(reply)
    }

    async fn reset(&self, user_id: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/reset", self.base_url))
            .json(&serde_json::json!({ "userId": user_id }))
            .send()
            .await
            .map_err(|e| KondateError::Relay(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::decode_error(response).await.into());
        }
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus> {
        let status = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(|e| KondateError::Relay(format!("Request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| KondateError::Relay(format!("Malformed response: {}", e)))?;
        Ok(status)
    }
}
