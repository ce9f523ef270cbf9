//! Shift calendar operations and the emergency side-effect chain
//!
//! Emergency reports trigger two follow-ups: the day's shift flips to
//! `absent` and every linked admin gets a push alert. The report insert is
//! authoritative; the follow-ups are best-effort and a failure there is
//! logged, not propagated — an eventual-consistency compromise carried over
//! deliberately rather than a transaction, since the admin notification leg
//! cannot be transactional anyway.

use chrono::{Months, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::dispatch::today_jst;
use crate::services::line::{LineMessage, LineMessagingClient};
use crate::services::pii::mask_name;
use shared::{
    is_valid_year_month, Driver, EmergencyReportType, Shift, ShiftStatus, ShiftSubmitter,
    SubmittedVia,
};

/// Shift and emergency operations for the driver LIFF app
#[derive(Clone)]
pub struct ShiftService {
    db: PgPool,
}

impl ShiftService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The driver's shift entries for a calendar month ("YYYY-MM").
    pub async fn month_shifts(&self, driver: &Driver, year_month: &str) -> AppResult<Vec<Shift>> {
        if !is_valid_year_month(year_month) {
            return Err(AppError::Validation {
                field: "yearMonth".to_string(),
                message: "Invalid year-month format, expected YYYY-MM".to_string(),
                message_ja: "年月の形式が不正です".to_string(),
            });
        }

        let start = NaiveDate::parse_from_str(&format!("{}-01", year_month), "%Y-%m-%d")
            .map_err(|_| AppError::Validation {
                field: "yearMonth".to_string(),
                message: "Invalid year-month".to_string(),
                message_ja: "年月の形式が不正です".to_string(),
            })?;
        let end = start
            .checked_add_months(Months::new(1))
            .ok_or_else(|| AppError::Internal("month range overflow".to_string()))?;

        let rows = sqlx::query_as::<_, (NaiveDate, String, Option<String>)>(
            r#"
            SELECT shift_date, status, note
            FROM shifts
            WHERE driver_id = $1 AND shift_date >= $2 AND shift_date < $3
            ORDER BY shift_date
            "#,
        )
        .bind(driver.id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        let mut shifts = Vec::with_capacity(rows.len());
        for (shift_date, status, note) in rows {
            let status = ShiftStatus::parse(&status)
                .ok_or_else(|| AppError::Internal(format!("unknown shift status '{}'", status)))?;
            shifts.push(Shift {
                shift_date,
                status,
                note,
            });
        }

        Ok(shifts)
    }

    /// Record a driver's shift request for a day, overwriting any entry.
    ///
    /// `absent` is reserved for the emergency flow and cannot be requested.
    pub async fn request_shift(
        &self,
        driver: &Driver,
        shift_date: &str,
        status: ShiftStatus,
        note: Option<String>,
    ) -> AppResult<()> {
        let shift_date =
            NaiveDate::parse_from_str(shift_date, "%Y-%m-%d").map_err(|_| AppError::Validation {
                field: "shiftDate".to_string(),
                message: "Invalid date format, expected YYYY-MM-DD".to_string(),
                message_ja: "日付の形式が不正です".to_string(),
            })?;

        if status == ShiftStatus::Absent {
            return Err(AppError::Validation {
                field: "status".to_string(),
                message: "Invalid shift status".to_string(),
                message_ja: "無効なシフト種別です".to_string(),
            });
        }

        self.upsert_shift(
            driver.organization_id,
            driver.id,
            shift_date,
            status,
            note.as_deref(),
            ShiftSubmitter::Driver,
        )
        .await
    }

    /// Record an emergency report and run the side-effect chain.
    pub async fn submit_emergency(
        &self,
        driver: &Driver,
        report_type: EmergencyReportType,
        reason: Option<String>,
    ) -> AppResult<()> {
        let today = today_jst();

        sqlx::query(
            r#"
            INSERT INTO emergency_reports (
                organization_id, driver_id, report_date, report_type, reason, submitted_via
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(driver.organization_id)
        .bind(driver.id)
        .bind(today)
        .bind(report_type.as_str())
        .bind(&reason)
        .bind(SubmittedVia::Liff.as_str())
        .execute(&self.db)
        .await?;

        // Best-effort from here: the emergency report itself is recorded.
        let note = format!(
            "緊急連絡: {}",
            reason.as_deref().unwrap_or_else(|| report_type.label_ja())
        );
        if let Err(e) = self
            .upsert_shift(
                driver.organization_id,
                driver.id,
                today,
                ShiftStatus::Absent,
                Some(&note),
                ShiftSubmitter::System,
            )
            .await
        {
            tracing::error!(
                driver = %mask_name(&driver.name),
                "failed to mark shift absent after emergency report: {}",
                e
            );
        }

        if let Err(e) = self.notify_admins(driver, report_type, reason.as_deref()).await {
            tracing::error!(
                driver = %mask_name(&driver.name),
                "failed to notify admins of emergency report: {}",
                e
            );
        }

        Ok(())
    }

    /// Insert-or-update the shift row for (driver, date).
    async fn upsert_shift(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        shift_date: NaiveDate,
        status: ShiftStatus,
        note: Option<&str>,
        submitted_by: ShiftSubmitter,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shifts (organization_id, driver_id, shift_date, status, note, submitted_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (driver_id, shift_date) DO UPDATE
            SET status = EXCLUDED.status,
                note = EXCLUDED.note,
                submitted_by = EXCLUDED.submitted_by,
                updated_at = NOW()
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .bind(shift_date)
        .bind(status.as_str())
        .bind(note)
        .bind(submitted_by.as_str())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Push an emergency alert to every linked admin of the organization.
    async fn notify_admins(
        &self,
        driver: &Driver,
        report_type: EmergencyReportType,
        reason: Option<&str>,
    ) -> AppResult<()> {
        let channel_access_token = sqlx::query_scalar::<_, Option<String>>(
            "SELECT line_channel_access_token FROM organizations WHERE id = $1",
        )
        .bind(driver.organization_id)
        .fetch_optional(&self.db)
        .await?
        .flatten();

        let Some(channel_access_token) = channel_access_token else {
            return Ok(());
        };

        let admins = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT id, line_user_id
            FROM admin_users
            WHERE organization_id = $1 AND line_user_id IS NOT NULL
            "#,
        )
        .bind(driver.organization_id)
        .fetch_all(&self.db)
        .await?;

        let alert = compose_emergency_alert(&driver.name, report_type, reason);
        let client = LineMessagingClient::new(channel_access_token);

        for (admin_id, line_user_id) in admins {
            if let Err(e) = client
                .push_message(&line_user_id, LineMessage::text(alert.clone()))
                .await
            {
                tracing::warn!(admin_id = %admin_id, "emergency alert push failed: {}", e);
            }
        }

        Ok(())
    }
}

/// Compose the admin-facing emergency alert text.
pub fn compose_emergency_alert(
    driver_name: &str,
    report_type: EmergencyReportType,
    reason: Option<&str>,
) -> String {
    let mut alert = format!(
        "🚨 緊急連絡\n\n{}さんから緊急連絡がありました。\n種別: {}\n",
        driver_name,
        report_type.label_ja()
    );
    if let Some(reason) = reason {
        alert += &format!("理由: {}\n", reason);
    }
    alert += "\n管理画面の「緊急連絡」ページで確認してください。";
    alert
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emergency_alert_with_reason() {
        let alert = compose_emergency_alert(
            "佐藤 太郎",
            EmergencyReportType::VehicleTrouble,
            Some("エンジン警告灯が点灯"),
        );
        assert!(alert.contains("🚨 緊急連絡"));
        assert!(alert.contains("佐藤 太郎さんから"));
        assert!(alert.contains("種別: 車両故障"));
        assert!(alert.contains("理由: エンジン警告灯が点灯"));
    }

    #[test]
    fn test_emergency_alert_without_reason() {
        let alert = compose_emergency_alert("佐藤 太郎", EmergencyReportType::Absent, None);
        assert!(alert.contains("種別: 体調不良・欠勤"));
        assert!(!alert.contains("理由:"));
    }
}
