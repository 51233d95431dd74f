use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::LineError;
use crate::types::{PushRequest, ReplyRequest, TextMessage};

const REPLY_PATH: &str = "/v2/bot/message/reply";
const PUSH_PATH: &str = "/v2/bot/message/push";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Outbound half of a chat platform: answer an event or message a user.
///
/// Implemented by [`LineClient`]; handlers depend on the trait so tests can
/// record calls instead of hitting the network.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Answer a webhook event using its one-shot reply token.
    async fn reply(&self, reply_token: &str, messages: &[TextMessage]) -> Result<(), LineError>;

    /// Send messages to a user at any time.
    async fn push(&self, to: &str, messages: &[TextMessage]) -> Result<(), LineError>;
}

/// LINE Messaging API client authenticated with a channel access token.
pub struct LineClient {
    http: reqwest::Client,
    api_base: String,
    channel_token: String,
}

impl LineClient {
    pub fn new(
        channel_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, LineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            channel_token: channel_token.into(),
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), LineError> {
        let url = format!("{}{}", self.api_base, path);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.channel_token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, path, "LINE request failed");
                LineError::Http(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), path, body = %body, "LINE API rejected request");
            return Err(LineError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessageGateway for LineClient {
    async fn reply(&self, reply_token: &str, messages: &[TextMessage]) -> Result<(), LineError> {
        debug!(count = messages.len(), "LINE reply");
        self.post(
            REPLY_PATH,
            &ReplyRequest {
                reply_token,
                messages,
            },
        )
        .await
    }

    async fn push(&self, to: &str, messages: &[TextMessage]) -> Result<(), LineError> {
        debug!(to, count = messages.len(), "LINE push");
        self.post(PUSH_PATH, &PushRequest { to, messages }).await
    }
}
