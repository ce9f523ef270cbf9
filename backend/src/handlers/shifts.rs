//! HTTP handler for LIFF shift operations and emergency reports

use std::time::Duration;

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::{bearer_token, enforce_rate_limit};
use crate::services::identity::IdentityService;
use crate::services::shift::ShiftService;
use crate::AppState;
use shared::{EmergencyReportType, Shift, ShiftStatus};

/// Request body, tagged by `action`. Enum-valued fields arrive as strings
/// and are parsed in the handler so invalid values reject with 400.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ShiftRequest {
    #[serde(rename_all = "camelCase")]
    GetShifts { year_month: String },
    #[serde(rename_all = "camelCase")]
    RequestShift {
        shift_date: String,
        status: String,
        note: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Emergency {
        report_type: String,
        reason: Option<String>,
    },
}

/// Response for the shifts endpoint
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ShiftResponse {
    #[serde(rename_all = "camelCase")]
    Shifts {
        driver_name: String,
        shifts: Vec<Shift>,
    },
    Message { success: bool, message: String },
}

/// Handle shift listing, shift requests, and emergency reports
/// POST /liff/shifts
pub async fn handle_liff_shifts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ShiftRequest>,
) -> AppResult<Json<ShiftResponse>> {
    enforce_rate_limit(&state, &headers, "shift", 20, Duration::from_secs(60))?;
    let id_token = bearer_token(&headers)?;

    let identity = IdentityService::new(state.db.clone(), state.config.line.channel_id.clone());
    let driver = identity.authenticate_driver(id_token).await?;

    let service = ShiftService::new(state.db.clone());

    match request {
        ShiftRequest::GetShifts { year_month } => {
            let shifts = service.month_shifts(&driver, &year_month).await?;
            Ok(Json(ShiftResponse::Shifts {
                driver_name: driver.name,
                shifts,
            }))
        }
        ShiftRequest::RequestShift {
            shift_date,
            status,
            note,
        } => {
            let status = ShiftStatus::parse(&status).ok_or_else(|| AppError::Validation {
                field: "status".to_string(),
                message: "Invalid shift status".to_string(),
                message_ja: "無効なシフト種別です".to_string(),
            })?;
            service
                .request_shift(&driver, &shift_date, status, note)
                .await?;
            Ok(Json(ShiftResponse::Message {
                success: true,
                message: "シフトを申請しました".to_string(),
            }))
        }
        ShiftRequest::Emergency {
            report_type,
            reason,
        } => {
            let report_type =
                EmergencyReportType::parse(&report_type).ok_or_else(|| AppError::Validation {
                    field: "reportType".to_string(),
                    message: "Invalid emergency report type".to_string(),
                    message_ja: "無効な連絡種別です".to_string(),
                })?;
            service.submit_emergency(&driver, report_type, reason).await?;
            Ok(Json(ShiftResponse::Message {
                success: true,
                message: "緊急連絡を送信しました。管理者に通知されます。".to_string(),
            }))
        }
    }
}
