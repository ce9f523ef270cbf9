//! HTTP handler for LIFF report submission

use std::time::Duration;

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::{bearer_token, enforce_rate_limit};
use crate::services::identity::IdentityService;
use crate::services::report::{parse_report_input, ReportService};
use crate::AppState;
use shared::{Driver, Vehicle};

/// Actions accepted on the reports endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    Identify,
    Submit,
}

/// Request body: `identify` carries no payload, `submit` carries a report
/// type and its typed payload.
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub action: ReportAction,
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Response for the reports endpoint
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReportResponse {
    Identify {
        driver: Driver,
        vehicle: Option<Vehicle>,
    },
    Submit {
        success: bool,
        id: Uuid,
    },
}

/// Identify the driver or submit a daily report
/// POST /liff/reports
pub async fn handle_liff_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReportRequest>,
) -> AppResult<Json<ReportResponse>> {
    enforce_rate_limit(&state, &headers, "reports", 30, Duration::from_secs(60))?;
    let id_token = bearer_token(&headers)?;

    let identity = IdentityService::new(state.db.clone(), state.config.line.channel_id.clone());
    let driver = identity.authenticate_driver(id_token).await?;

    let service = ReportService::new(state.db.clone());

    match request.action {
        ReportAction::Identify => {
            let vehicle = service.default_vehicle(&driver).await?;
            Ok(Json(ReportResponse::Identify { driver, vehicle }))
        }
        ReportAction::Submit => {
            let report_type = request.report_type.ok_or_else(|| AppError::Validation {
                field: "type".to_string(),
                message: "A report type is required".to_string(),
                message_ja: "無効なレポート種別です".to_string(),
            })?;
            let report = parse_report_input(&report_type, request.data)?;
            let id = service.submit(&driver, report).await?;
            Ok(Json(ReportResponse::Submit { success: true, id }))
        }
    }
}
