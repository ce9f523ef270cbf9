//! HTTP handler for the LINE webhook

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use crate::services::signature::verify_line_signature;
use crate::services::webhook::{LineWebhookRequest, WebhookService};
use crate::AppState;

/// Response for webhook processing
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
}

/// Handle LINE webhook events
/// POST /webhook/line
///
/// Verifies the delivery signature and routes each event. Returns 200 for
/// every signature-verified delivery, even when individual events fail —
/// LINE retries non-200 responses, and a retried batch would replay token
/// claims.
pub async fn handle_line_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<WebhookResponse>)> {
    // Fail closed: without a channel secret no delivery can be verified.
    let Some(channel_secret) = state.config.line.channel_secret.as_deref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(WebhookResponse {
                success: false,
                message: "LINE channel not configured".to_string(),
            }),
        ));
    };

    let signature = headers
        .get("x-line-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_line_signature(&body, signature, channel_secret) {
        tracing::warn!("LINE webhook signature verification failed");
        return Err((
            StatusCode::FORBIDDEN,
            Json(WebhookResponse {
                success: false,
                message: "Invalid signature".to_string(),
            }),
        ));
    }

    // Parse webhook request
    let request: LineWebhookRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to parse LINE webhook: {}", e);
            return Err((
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse {
                    success: false,
                    message: format!("Invalid request body: {}", e),
                }),
            ));
        }
    };

    let service = WebhookService::new(state.db.clone(), state.config.line.messaging_token.clone());
    service.process_webhook(request).await;

    Ok(Json(WebhookResponse {
        success: true,
        message: "Webhook processed".to_string(),
    }))
}
