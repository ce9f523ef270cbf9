//! HTTP handlers for the scheduled notification jobs
//!
//! An external scheduler triggers these endpoints; they authenticate with a
//! bearer shared secret compared in constant time. An unconfigured secret
//! rejects every trigger rather than running unauthenticated.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::dispatch::{CheckType, DispatchService};
use crate::services::signature::verify_scheduler_token;
use crate::AppState;

/// Request body for the submission-check job
#[derive(Debug, Default, Deserialize)]
pub struct CheckSubmissionsRequest {
    #[serde(rename = "type")]
    pub check_type: Option<CheckType>,
}

/// Response for the submission-check job
#[derive(Debug, Serialize)]
pub struct CheckSubmissionsResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub alerts: u32,
}

/// Response for the morning-reminder job
#[derive(Debug, Serialize)]
pub struct MorningReminderResponse {
    pub success: bool,
    pub sent: u32,
}

/// Run a missing-submission check across all organizations
/// POST /jobs/check-submissions
pub async fn check_submissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<CheckSubmissionsRequest>>,
) -> AppResult<Json<CheckSubmissionsResponse>> {
    authorize_scheduler(&state, &headers)?;

    let check_type = body
        .and_then(|Json(request)| request.check_type)
        .unwrap_or(CheckType::PreWork);

    let alerts = DispatchService::new(state.db.clone()).run(check_type).await?;

    Ok(Json(CheckSubmissionsResponse {
        success: true,
        check_type,
        alerts,
    }))
}

/// Send the morning reminder to every linked active driver
/// POST /jobs/morning-reminder
pub async fn morning_reminder(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<MorningReminderResponse>> {
    authorize_scheduler(&state, &headers)?;

    let sent = DispatchService::new(state.db.clone())
        .run(CheckType::MorningReminder)
        .await?;

    Ok(Json(MorningReminderResponse { success: true, sent }))
}

fn authorize_scheduler(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let Some(cron_secret) = state.config.scheduler.cron_secret.as_deref() else {
        return Err(AppError::Unauthorized {
            message: "Scheduler secret is not configured".to_string(),
            message_ja: "スケジューラーの認証が設定されていません".to_string(),
        });
    };

    let auth_header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if !verify_scheduler_token(auth_header, cron_secret) {
        return Err(AppError::Unauthorized {
            message: "Invalid scheduler token".to_string(),
            message_ja: "スケジューラーの認証に失敗しました".to_string(),
        });
    }

    Ok(())
}
