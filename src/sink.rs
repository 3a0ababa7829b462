//! Notification sink — where formatted payment notices go.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::SinkError;

/// Accepts one formatted notice at a time. The pipeline driver calls
/// this once per new payment, in batch order; redelivery on failure is
/// an external concern.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, display_message: &str) -> Result<(), SinkError>;
}

// ── Slack implementation ────────────────────────────────────────────

const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// HTTP timeout for every delivery; nothing here waits unbounded.
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Posts notices to a Slack channel via the Web API.
pub struct SlackSink {
    client: reqwest::Client,
    token: SecretString,
    channel_id: String,
}

impl SlackSink {
    pub fn new(token: SecretString, channel_id: String) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| SinkError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            channel_id,
        })
    }
}

/// Slack wraps transport-level success around an `ok` flag; a delivery
/// only counts when both layers accept it.
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl NotificationSink for SlackSink {
    async fn deliver(&self, display_message: &str) -> Result<(), SinkError> {
        let response = self
            .client
            .post(SLACK_POST_MESSAGE_URL)
            .bearer_auth(self.token.expose_secret())
            .json(&json!({
                "channel": self.channel_id,
                "text": display_message,
            }))
            .send()
            .await
            .map_err(|e| SinkError::Http(format!("Post failed: {e}")))?
            .error_for_status()
            .map_err(|e| SinkError::Http(format!("Post rejected: {e}")))?;

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Http(format!("Response parse failed: {e}")))?;

        if !body.ok {
            return Err(SinkError::Rejected(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        info!(channel = %self.channel_id, "Notice delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slack_response_parses_ok() {
        let body: SlackResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(body.ok);
        assert!(body.error.is_none());
    }

    #[test]
    fn slack_response_parses_error() {
        let body: SlackResponse =
            serde_json::from_str(r#"{"ok": false, "error": "channel_not_found"}"#).unwrap();
        assert!(!body.ok);
        assert_eq!(body.error.as_deref(), Some("channel_not_found"));
    }
}
