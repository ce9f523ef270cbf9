//! LINE webhook event processing
//!
//! Dispatches over the event envelope delivered by the Messaging API:
//! follow events get a welcome (personalized when the account is already
//! linked), token-shaped text messages attempt an admin link claim, help
//! keywords get static usage text. Each event is handled in isolation —
//! one failing event never breaks the 200 acknowledgment, because LINE
//! retries non-200 deliveries and a retried claim would surface as a
//! spurious "already used" to the user.

use serde::Deserialize;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::line::LineMessagingClient;
use crate::services::pii::mask_name;
use crate::services::token::LinkTokenService;

/// LINE webhook request body
/// See: https://developers.line.biz/en/reference/messaging-api/#webhook-event-objects
#[derive(Debug, Deserialize)]
pub struct LineWebhookRequest {
    /// User ID of the LINE Official Account that received the webhook event
    #[serde(default)]
    pub destination: Option<String>,
    /// Array of webhook event objects; a delivery without one is
    /// acknowledged and ignored
    #[serde(default)]
    pub events: Vec<LineWebhookEvent>,
}

/// LINE webhook event
#[derive(Debug, Deserialize)]
pub struct LineWebhookEvent {
    /// Event type
    #[serde(rename = "type")]
    pub event_type: String,
    /// Token for replying to this event (only for events that can be replied to)
    #[serde(rename = "replyToken")]
    pub reply_token: Option<String>,
    /// Source of the event
    pub source: Option<LineEventSource>,
    /// Message object (only for message events)
    pub message: Option<LineEventMessage>,
    /// Time of the event in milliseconds
    #[serde(default)]
    pub timestamp: i64,
}

/// LINE event source
#[derive(Debug, Deserialize)]
pub struct LineEventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// LINE event message
#[derive(Debug, Deserialize)]
pub struct LineEventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub id: Option<String>,
    pub text: Option<String>,
}

/// Webhook event router
pub struct WebhookService {
    db: PgPool,
    tokens: LinkTokenService,
    reply_client: Option<LineMessagingClient>,
}

impl WebhookService {
    /// `messaging_token` is the deployment's reply channel token; without it
    /// events are still processed but replies are skipped.
    pub fn new(db: PgPool, messaging_token: Option<String>) -> Self {
        Self {
            tokens: LinkTokenService::new(db.clone()),
            db,
            reply_client: messaging_token.map(LineMessagingClient::new),
        }
    }

    /// Process a webhook delivery.
    ///
    /// Per-event failures are logged and swallowed so the remaining events
    /// in the batch still run and the caller can acknowledge with 200.
    pub async fn process_webhook(&self, request: LineWebhookRequest) {
        for event in request.events {
            if let Err(e) = self.handle_event(&event).await {
                tracing::warn!("webhook event handling failed: {}", e);
            }
        }
    }

    async fn handle_event(&self, event: &LineWebhookEvent) -> AppResult<()> {
        match event.event_type.as_str() {
            "follow" => self.handle_follow(event).await,
            "message" => self.handle_message(event).await,
            _ => Ok(()),
        }
    }

    /// Friend-add: greet linked drivers by name, point everyone else at the
    /// registration flow.
    async fn handle_follow(&self, event: &LineWebhookEvent) -> AppResult<()> {
        let Some(line_user_id) = event.source.as_ref().and_then(|s| s.user_id.as_deref()) else {
            return Ok(());
        };

        let driver_name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM drivers WHERE line_user_id = $1",
        )
        .bind(line_user_id)
        .fetch_optional(&self.db)
        .await?;

        let text = match driver_name {
            Some(name) => format!(
                "{} さん、安全管理システムへようこそ！\n\n画面下部のメニューから日報の提出ができます。",
                name
            ),
            None => "安全管理システムです。\n\n管理者から受け取った登録URLを開いて、LINE連携を完了してください。"
                .to_string(),
        };

        self.reply(event, &text).await;
        Ok(())
    }

    async fn handle_message(&self, event: &LineWebhookEvent) -> AppResult<()> {
        let Some(message) = &event.message else {
            return Ok(());
        };
        if message.message_type != "text" {
            return Ok(());
        }
        let (Some(text), Some(line_user_id)) = (
            message.text.as_deref(),
            event.source.as_ref().and_then(|s| s.user_id.as_deref()),
        ) else {
            return Ok(());
        };

        let text = text.trim();

        // Admin LINE link: token-shaped messages attempt a claim first.
        // Driver tokens share the shape but are claimed through the LIFF
        // registration page, so an unknown token falls through silently.
        if is_token_shaped(text) {
            match self.tokens.claim_admin_token(text, line_user_id).await {
                Ok(actor) => {
                    tracing::info!(
                        admin = %mask_name(&actor.name),
                        "admin LINE link completed via webhook"
                    );
                    self.reply(
                        event,
                        &format!(
                            "{}さん、LINE連携が完了しました！\n\n今後、提出状況のサマリー通知がこのLINEに届きます。",
                            actor.name
                        ),
                    )
                    .await;
                    return Ok(());
                }
                Err(AppError::LinkTokenNotFound) => {
                    // Not an admin token; fall through to the plain handlers.
                }
                Err(AppError::LinkTokenExpired) => {
                    self.reply(
                        event,
                        "登録トークンの有効期限が切れています。管理画面から再発行してください。",
                    )
                    .await;
                    return Ok(());
                }
                Err(AppError::LinkTokenAlreadyUsed) | Err(AppError::LineAccountAlreadyLinked) => {
                    self.reply(
                        event,
                        "LINE連携の処理中にエラーが発生しました。管理画面から再度お試しください。",
                    )
                    .await;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        let text_lower = text.to_lowercase();
        if text_lower.contains("ヘルプ") || text_lower == "help" {
            self.reply(
                event,
                "安全管理システム\n\n画面下部のメニューから以下の操作ができます：\n・出勤 → 業務前報告\n・点検 → 日常点検\n・退勤 → 業務後報告\n・事故 → 事故報告",
            )
            .await;
        }

        Ok(())
    }

    /// Best-effort reply; missing reply token or client means no reply.
    async fn reply(&self, event: &LineWebhookEvent, text: &str) {
        let (Some(client), Some(reply_token)) = (&self.reply_client, &event.reply_token) else {
            return;
        };
        if let Err(e) = client.reply_message(reply_token, text).await {
            tracing::warn!("webhook reply failed: {}", e);
        }
    }
}

/// Whether a message looks like a link token (hyphenated UUID form,
/// 8-4-4-4-12 hex groups).
pub fn is_token_shaped(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => *b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape_accepts_uuids() {
        assert!(is_token_shaped("123e4567-e89b-12d3-a456-426614174000"));
        assert!(is_token_shaped("ABCDEF01-2345-6789-abcd-ef0123456789"));
    }

    #[test]
    fn test_token_shape_rejects_other_text() {
        assert!(!is_token_shaped("help"));
        assert!(!is_token_shaped("ヘルプ"));
        assert!(!is_token_shaped(""));
        // Right length, wrong hyphen placement
        assert!(!is_token_shaped("123e4567e-89b-12d3-a456-426614174000"));
        // Non-hex characters
        assert!(!is_token_shaped("123e4567-e89b-12d3-a456-42661417400g"));
        // Unhyphenated form is not accepted
        assert!(!is_token_shaped("123e4567e89b12d3a456426614174000"));
    }

    #[test]
    fn test_webhook_request_deserialization() {
        let json = r#"{
            "destination": "U1234567890abcdef",
            "events": [
                {
                    "type": "message",
                    "replyToken": "reply-token-123",
                    "source": {
                        "type": "user",
                        "userId": "U9876543210fedcba"
                    },
                    "message": {
                        "type": "text",
                        "id": "msg-123",
                        "text": "ヘルプ"
                    },
                    "timestamp": 1234567890123
                }
            ]
        }"#;

        let request: LineWebhookRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.destination.as_deref(), Some("U1234567890abcdef"));
        assert_eq!(request.events.len(), 1);

        let event = &request.events[0];
        assert_eq!(event.event_type, "message");
        assert_eq!(event.reply_token.as_deref(), Some("reply-token-123"));

        let source = event.source.as_ref().unwrap();
        assert_eq!(source.source_type, "user");
        assert_eq!(source.user_id.as_deref(), Some("U9876543210fedcba"));

        let message = event.message.as_ref().unwrap();
        assert_eq!(message.message_type, "text");
        assert_eq!(message.text.as_deref(), Some("ヘルプ"));
    }

    #[test]
    fn test_webhook_request_minimal_fields() {
        let json = r#"{
            "events": [
                {
                    "type": "unfollow"
                }
            ]
        }"#;

        let request: LineWebhookRequest = serde_json::from_str(json).unwrap();
        assert!(request.destination.is_none());

        let event = &request.events[0];
        assert_eq!(event.event_type, "unfollow");
        assert!(event.reply_token.is_none());
        assert!(event.source.is_none());
        assert!(event.message.is_none());
        assert_eq!(event.timestamp, 0);
    }

    #[test]
    fn test_webhook_empty_events() {
        let request: LineWebhookRequest = serde_json::from_str(r#"{"events": []}"#).unwrap();
        assert!(request.events.is_empty());
    }
}
