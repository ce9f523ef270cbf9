//! HTTP handler for driver LINE linking (LIFF registration page)

use std::time::Duration;

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::{bearer_token, enforce_rate_limit};
use crate::services::identity::IdentityService;
use crate::services::pii::mask_name;
use crate::services::token::LinkTokenService;
use crate::AppState;

/// Request body for a driver link claim
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDriverRequest {
    pub registration_token: Option<String>,
}

/// Response after a successful claim
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDriverResponse {
    pub success: bool,
    pub message: String,
    pub driver_name: String,
}

/// Claim a registration token for the verified LINE identity
/// POST /liff/link
pub async fn link_driver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LinkDriverRequest>,
) -> AppResult<Json<LinkDriverResponse>> {
    enforce_rate_limit(&state, &headers, "link", 10, Duration::from_secs(60))?;
    let id_token = bearer_token(&headers)?;

    let identity = IdentityService::new(state.db.clone(), state.config.line.channel_id.clone());
    let line_user_id = identity.verify_id_token(id_token).await?;

    let registration_token = input
        .registration_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Validation {
            field: "registrationToken".to_string(),
            message: "A registration token is required".to_string(),
            message_ja: "登録トークンが必要です".to_string(),
        })?;

    let tokens = LinkTokenService::new(state.db.clone());
    let actor = tokens
        .claim_driver_token(&registration_token, &line_user_id)
        .await?;

    tracing::info!(driver = %mask_name(&actor.name), "driver LINE link completed");

    Ok(Json(LinkDriverResponse {
        success: true,
        message: format!("{} さんのLINE連携が完了しました", actor.name),
        driver_name: actor.name,
    }))
}
