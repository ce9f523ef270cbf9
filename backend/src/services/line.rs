//! LINE Messaging API client
//!
//! Push messages use the owning organization's channel access token, so a
//! client is constructed per organization inside the dispatcher. Webhook
//! replies use the deployment-wide messaging token from configuration.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// LINE Messaging API client
#[derive(Clone)]
pub struct LineMessagingClient {
    channel_access_token: String,
    http_client: reqwest::Client,
}

/// LINE message types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LineMessage {
    #[serde(rename = "text")]
    Text { text: String },
}

impl LineMessage {
    pub fn text(text: impl Into<String>) -> Self {
        LineMessage::Text { text: text.into() }
    }
}

/// LINE push message request
#[derive(Debug, Serialize)]
struct LinePushRequest {
    to: String,
    messages: Vec<LineMessage>,
}

/// LINE reply message request
#[derive(Debug, Serialize)]
struct LineReplyRequest {
    #[serde(rename = "replyToken")]
    reply_token: String,
    messages: Vec<LineMessage>,
}

/// LINE API error response
#[derive(Debug, Deserialize)]
struct LineApiResponse {
    #[serde(default)]
    message: Option<String>,
}

impl LineMessagingClient {
    /// Create a client for a channel access token
    pub fn new(channel_access_token: String) -> Self {
        Self {
            channel_access_token,
            http_client: reqwest::Client::new(),
        }
    }

    /// Send a push message to a user.
    ///
    /// Failures are recipient-scoped (blocked accounts, revoked tokens), so
    /// the error is a plain string for the caller to log and skip.
    pub async fn push_message(
        &self,
        line_user_id: &str,
        message: LineMessage,
    ) -> Result<(), String> {
        let request = LinePushRequest {
            to: line_user_id.to_string(),
            messages: vec![message],
        };

        let response = self
            .http_client
            .post("https://api.line.me/v2/bot/message/push")
            .header(
                "Authorization",
                format!("Bearer {}", self.channel_access_token),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to send LINE message: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error: LineApiResponse = response.json().await.unwrap_or(LineApiResponse {
                message: Some("Unknown error".to_string()),
            });
            Err(error.message.unwrap_or_else(|| "Unknown error".to_string()))
        }
    }

    /// Reply to a webhook event using its reply token
    pub async fn reply_message(&self, reply_token: &str, text: &str) -> AppResult<()> {
        let request = LineReplyRequest {
            reply_token: reply_token.to_string(),
            messages: vec![LineMessage::text(text)],
        };

        let response = self
            .http_client
            .post("https://api.line.me/v2/bot/message/reply")
            .header(
                "Authorization",
                format!("Bearer {}", self.channel_access_token),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::LineApiError(format!("LINE reply error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::LineApiError(format!(
                "LINE reply failed: {}",
                error_text
            )));
        }

        Ok(())
    }
}
