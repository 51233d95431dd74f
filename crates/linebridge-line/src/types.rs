//! Wire types for LINE webhooks and outbound messages.

use serde::{Deserialize, Serialize};

/// Body of a webhook POST from the LINE platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Bot user ID the events were delivered to.
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// `message`, `follow`, `unfollow`, `postback`, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: Option<EventMessage>,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub timestamp: i64,
    /// `active` or `standby`.
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    /// `text`, `image`, `sticker`, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    /// `user`, `group` or `room`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl WebhookEvent {
    pub fn source_user_id(&self) -> Option<&str> {
        self.source.as_ref()?.user_id.as_deref()
    }

    /// Text of a `message` event carrying a non-empty text message.
    pub fn text(&self) -> Option<&str> {
        if self.kind != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.kind != "text" {
            return None;
        }
        message.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Reduce a raw event to an [`IncomingText`] if it is a text message
    /// from `authorized_user_id`.
    pub fn to_incoming(&self, authorized_user_id: &str) -> Option<IncomingText> {
        let text = self.text()?;
        if !crate::allow::is_allowed(authorized_user_id, self) {
            return None;
        }
        Some(IncomingText {
            user_id: authorized_user_id.to_string(),
            text: text.to_string(),
            reply_token: self.reply_token.clone(),
        })
    }
}

/// A text message accepted for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingText {
    pub user_id: String,
    pub text: String,
    pub reply_token: Option<String>,
}

/// Outbound `{ "type": "text", "text": ... }` message object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    pub text: String,
}

impl TextMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: "text",
            text: text.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplyRequest<'a> {
    pub reply_token: &'a str,
    pub messages: &'a [TextMessage],
}

#[derive(Debug, Serialize)]
pub(crate) struct PushRequest<'a> {
    pub to: &'a str,
    pub messages: &'a [TextMessage],
}
