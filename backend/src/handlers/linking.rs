//! HTTP handlers for admin-side link-token issuance and unlinking

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentAdmin;
use crate::services::token::LinkTokenService;
use crate::AppState;

/// Response carrying a freshly issued link token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenResponse {
    pub registration_token: String,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct UnlinkResponse {
    pub success: bool,
}

/// Issue a registration token for a driver
/// POST /drivers/:driver_id/registration-token
pub async fn issue_driver_token(
    State(state): State<AppState>,
    current_admin: CurrentAdmin,
    Path(driver_id): Path<Uuid>,
) -> AppResult<Json<IssueTokenResponse>> {
    let service = LinkTokenService::new(state.db.clone());
    let registration_token = service
        .issue_driver_token(current_admin.0.organization_id, driver_id)
        .await?;
    Ok(Json(IssueTokenResponse { registration_token }))
}

/// Remove a driver's LINE binding
/// DELETE /drivers/:driver_id/line-link
pub async fn unlink_driver(
    State(state): State<AppState>,
    current_admin: CurrentAdmin,
    Path(driver_id): Path<Uuid>,
) -> AppResult<Json<UnlinkResponse>> {
    let service = LinkTokenService::new(state.db.clone());
    service
        .unlink_driver(current_admin.0.organization_id, driver_id)
        .await?;
    Ok(Json(UnlinkResponse { success: true }))
}

/// Issue a LINE link token for an admin user
/// POST /admin-users/:admin_id/line-token
pub async fn issue_admin_line_token(
    State(state): State<AppState>,
    current_admin: CurrentAdmin,
    Path(admin_id): Path<Uuid>,
) -> AppResult<Json<IssueTokenResponse>> {
    let service = LinkTokenService::new(state.db.clone());
    let registration_token = service
        .issue_admin_token(current_admin.0.organization_id, admin_id)
        .await?;
    Ok(Json(IssueTokenResponse { registration_token }))
}

/// Remove an admin user's LINE binding
/// DELETE /admin-users/:admin_id/line-link
pub async fn unlink_admin_line(
    State(state): State<AppState>,
    current_admin: CurrentAdmin,
    Path(admin_id): Path<Uuid>,
) -> AppResult<Json<UnlinkResponse>> {
    let service = LinkTokenService::new(state.db.clone());
    service
        .unlink_admin(current_admin.0.organization_id, admin_id)
        .await?;
    Ok(Json(UnlinkResponse { success: true }))
}
