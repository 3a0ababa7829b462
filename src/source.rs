//! Message source — where candidate notification bodies come from.
//!
//! The pipeline consumes a narrow contract: list message handles for a
//! bounded window, then fetch bodies one at a time. Failures degrade to
//! an empty listing / absent body so one unreachable source never blocks
//! the pipeline; the implementation logs what actually went wrong.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::SourceError;

/// How far back and how much to pull per cycle.
#[derive(Debug, Clone, Copy)]
pub struct FetchWindow {
    /// Only consider messages newer than this many days.
    pub newer_than_days: u32,
    /// Bounded page size per pull.
    pub page_size: usize,
}

impl Default for FetchWindow {
    fn default() -> Self {
        Self {
            newer_than_days: 1,
            page_size: 10,
        }
    }
}

/// A listed message: identifier plus arrival time when the transport
/// exposes it at listing time.
#[derive(Debug, Clone)]
pub struct MessageHandle {
    pub id: String,
    pub received_at: Option<DateTime<Utc>>,
}

/// Supplies raw message bodies for a time window.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// List candidate messages in the window. Network failure yields an
    /// empty list, not an error.
    async fn list_candidates(&self, window: &FetchWindow) -> Vec<MessageHandle>;

    /// Fetch a message's plain-text body. Absent on failure or when the
    /// message has no text part.
    async fn fetch_body(&self, message_id: &str) -> Option<String>;
}

// ── Gmail REST implementation ───────────────────────────────────────

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// HTTP timeout for every source call; nothing here waits unbounded.
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Gmail-backed message source.
///
/// Takes a ready OAuth access token as a plain config value; token
/// acquisition and refresh are outside this contract.
pub struct GmailSource {
    client: reqwest::Client,
    token: SecretString,
    /// Base search filter, e.g. `from:messaging@cash.app`. The window's
    /// `newer_than` bound is appended per request.
    query: String,
}

impl GmailSource {
    pub fn new(token: SecretString, query: String) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| SourceError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            query,
        })
    }

    async fn list_inner(&self, window: &FetchWindow) -> Result<Vec<MessageHandle>, SourceError> {
        let q = format!("{} newer_than:{}d", self.query, window.newer_than_days);
        let max_results = window.page_size.to_string();
        let response = self
            .client
            .get(format!("{GMAIL_API_BASE}/messages"))
            .bearer_auth(self.token.expose_secret())
            .query(&[("q", q.as_str()), ("maxResults", max_results.as_str())])
            .send()
            .await
            .map_err(|e| SourceError::Http(format!("List request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SourceError::Http(format!("List request rejected: {e}")))?;

        let listing: MessageList = response
            .json()
            .await
            .map_err(|e| SourceError::Payload(format!("List response parse failed: {e}")))?;

        Ok(listing
            .messages
            .into_iter()
            .map(|m| MessageHandle {
                id: m.id,
                received_at: None,
            })
            .collect())
    }

    async fn fetch_inner(&self, message_id: &str) -> Result<Option<String>, SourceError> {
        let response = self
            .client
            .get(format!("{GMAIL_API_BASE}/messages/{message_id}"))
            .bearer_auth(self.token.expose_secret())
            .query(&[("format", "full")])
            .send()
            .await
            .map_err(|e| SourceError::Http(format!("Fetch request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SourceError::Http(format!("Fetch request rejected: {e}")))?;

        let message: MessageDetail = response
            .json()
            .await
            .map_err(|e| SourceError::Payload(format!("Fetch response parse failed: {e}")))?;

        match message.payload {
            Some(payload) => Ok(plain_text_body(&payload)?),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MessageSource for GmailSource {
    async fn list_candidates(&self, window: &FetchWindow) -> Vec<MessageHandle> {
        match self.list_inner(window).await {
            Ok(handles) => {
                debug!(count = handles.len(), "Listed candidate messages");
                handles
            }
            Err(e) => {
                error!(error = %e, "Message listing failed; continuing with empty batch");
                Vec::new()
            }
        }
    }

    async fn fetch_body(&self, message_id: &str) -> Option<String> {
        match self.fetch_inner(message_id).await {
            Ok(body) => body,
            Err(e) => {
                error!(id = %message_id, error = %e, "Body fetch failed; skipping message");
                None
            }
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageDetail {
    payload: Option<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct MessagePart {
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    #[serde(default)]
    body: PartBody,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
struct PartBody {
    data: Option<String>,
}

/// Find the first `text/plain` part, depth-first, and decode it from
/// base64url. Padding is stripped before decoding since the transport is
/// inconsistent about including it.
fn plain_text_body(part: &MessagePart) -> Result<Option<String>, SourceError> {
    if part.mime_type == "text/plain" {
        if let Some(data) = &part.body.data {
            let bytes = URL_SAFE_NO_PAD
                .decode(data.trim_end_matches('='))
                .map_err(|e| SourceError::Decode(format!("Invalid base64url body: {e}")))?;
            return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
        }
    }
    for child in &part.parts {
        if let Some(text) = plain_text_body(child)? {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    fn part(mime: &str, data: Option<&str>, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: mime.into(),
            body: PartBody {
                data: data.map(String::from),
            },
            parts,
        }
    }

    fn encode(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text.as_bytes())
    }

    #[test]
    fn decodes_top_level_plain_text() {
        let payload = part("text/plain", Some(&encode("You received $45.00")), vec![]);
        assert_eq!(
            plain_text_body(&payload).unwrap(),
            Some("You received $45.00".into())
        );
    }

    #[test]
    fn finds_nested_plain_text_part() {
        let payload = part(
            "multipart/alternative",
            None,
            vec![
                part("text/html", Some(&encode("<b>html</b>")), vec![]),
                part("text/plain", Some(&encode("plain body")), vec![]),
            ],
        );
        assert_eq!(plain_text_body(&payload).unwrap(), Some("plain body".into()));
    }

    #[test]
    fn tolerates_padded_base64() {
        let padded = format!("{}==", encode("hi"));
        let trimmed_len = padded.trim_end_matches('=').len();
        assert!(trimmed_len < padded.len());

        let payload = part("text/plain", Some(&padded), vec![]);
        assert_eq!(plain_text_body(&payload).unwrap(), Some("hi".into()));
    }

    #[test]
    fn no_text_part_is_absent() {
        let payload = part(
            "multipart/mixed",
            None,
            vec![part("image/png", Some("aGk"), vec![])],
        );
        assert_eq!(plain_text_body(&payload).unwrap(), None);
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let payload = part("text/plain", Some("not base64!!!"), vec![]);
        assert!(matches!(
            plain_text_body(&payload),
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn default_window_bounds() {
        let w = FetchWindow::default();
        assert_eq!(w.newer_than_days, 1);
        assert_eq!(w.page_size, 10);
    }
}
