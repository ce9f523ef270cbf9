//! Organization notification settings
//!
//! The toggles live under the `notification` key of the organization's
//! settings blob. Updates replace that key only, so unrelated settings an
//! organization has saved are preserved.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::dispatch::notification_settings_from;
use shared::{is_valid_time_hhmm, NotificationSettings};

/// Organization-scoped settings access
#[derive(Clone)]
pub struct OrganizationService {
    db: PgPool,
}

impl OrganizationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The organization's notification settings, defaults when unset.
    pub async fn notification_settings(
        &self,
        organization_id: Uuid,
    ) -> AppResult<NotificationSettings> {
        let settings = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT settings FROM organizations WHERE id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization".to_string()))?;

        Ok(notification_settings_from(&settings))
    }

    /// Replace the organization's notification settings.
    pub async fn update_notification_settings(
        &self,
        organization_id: Uuid,
        notification: NotificationSettings,
    ) -> AppResult<NotificationSettings> {
        for (field, toggle) in [
            ("morningReminder", &notification.morning_reminder),
            ("preWorkAlert", &notification.pre_work_alert),
            ("postWorkAlert", &notification.post_work_alert),
            ("adminSummary", &notification.admin_summary),
        ] {
            if !is_valid_time_hhmm(&toggle.time) {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: "Delivery time must be HH:MM".to_string(),
                    message_ja: "配信時刻はHH:MM形式で入力してください".to_string(),
                });
            }
        }

        let mut settings = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT settings FROM organizations WHERE id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization".to_string()))?;

        let notification_value = serde_json::to_value(&notification)
            .map_err(|e| AppError::Internal(format!("settings encoding: {}", e)))?;

        match settings.as_object_mut() {
            Some(map) => {
                map.insert("notification".to_string(), notification_value);
            }
            None => {
                settings = serde_json::json!({ "notification": notification_value });
            }
        }

        sqlx::query("UPDATE organizations SET settings = $2, updated_at = NOW() WHERE id = $1")
            .bind(organization_id)
            .bind(&settings)
            .execute(&self.db)
            .await?;

        Ok(notification)
    }
}
