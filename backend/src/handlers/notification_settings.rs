//! HTTP handlers for organization notification settings

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentAdmin;
use crate::services::organization::OrganizationService;
use crate::AppState;
use shared::NotificationSettings;

/// Get the caller's organization notification settings
/// GET /organizations/notification-settings
pub async fn get_notification_settings(
    State(state): State<AppState>,
    current_admin: CurrentAdmin,
) -> AppResult<Json<NotificationSettings>> {
    let service = OrganizationService::new(state.db.clone());
    let settings = service
        .notification_settings(current_admin.0.organization_id)
        .await?;
    Ok(Json(settings))
}

/// Update the caller's organization notification settings
/// PUT /organizations/notification-settings
pub async fn update_notification_settings(
    State(state): State<AppState>,
    current_admin: CurrentAdmin,
    Json(settings): Json<NotificationSettings>,
) -> AppResult<Json<NotificationSettings>> {
    let service = OrganizationService::new(state.db.clone());
    let settings = service
        .update_notification_settings(current_admin.0.organization_id, settings)
        .await?;
    Ok(Json(settings))
}
