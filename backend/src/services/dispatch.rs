//! Scheduled notification fan-out
//!
//! An external cron trigger posts to the job endpoints; this service walks
//! every organization with an outbound LINE channel, checks the matching
//! notification toggle, computes the recipients, and pushes one message per
//! recipient. Isolation boundaries: a failed push skips that recipient only,
//! and a failed organization skips that organization only, so one revoked
//! channel token or blocked account never takes down the whole run.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::line::{LineMessage, LineMessagingClient};
use crate::services::pii::mask_name;
use shared::{DriverStatus, NotificationSettings, NotificationToggle};

/// Which scheduled check is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    PreWork,
    PostWork,
    AdminSummary,
    MorningReminder,
}

impl CheckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::PreWork => "pre_work",
            CheckType::PostWork => "post_work",
            CheckType::AdminSummary => "admin_summary",
            CheckType::MorningReminder => "morning_reminder",
        }
    }
}

/// An organization with outbound messaging configured
struct MessagingOrg {
    id: Uuid,
    name: String,
    channel_access_token: String,
    settings: NotificationSettings,
}

/// A LINE-linked recipient (driver or admin)
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: Uuid,
    pub name: String,
    pub line_user_id: String,
}

/// Scheduled notification dispatcher
pub struct DispatchService {
    db: PgPool,
}

impl DispatchService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Run one check across all organizations; returns messages sent.
    pub async fn run(&self, check_type: CheckType) -> AppResult<u32> {
        let today = today_jst();
        let orgs = self.load_messaging_orgs().await?;

        let mut sent = 0;
        for org in orgs {
            if !toggle_for(&org.settings, check_type).enabled {
                tracing::debug!(org_id = %org.id, check = check_type.as_str(), "toggle disabled, skipping");
                continue;
            }
            match self.run_for_org(&org, check_type, today).await {
                Ok(count) => sent += count,
                Err(e) => {
                    tracing::error!(org_id = %org.id, "dispatch failed for organization: {}", e);
                }
            }
        }

        Ok(sent)
    }

    async fn run_for_org(
        &self,
        org: &MessagingOrg,
        check_type: CheckType,
        today: NaiveDate,
    ) -> AppResult<u32> {
        let drivers = self.linked_active_drivers(org.id).await?;
        if drivers.is_empty() {
            return Ok(0);
        }

        let client = LineMessagingClient::new(org.channel_access_token.clone());

        match check_type {
            CheckType::PreWork => {
                let submitted = self
                    .submitted_driver_ids("pre_work_reports", "report_date", today, &drivers)
                    .await?;
                let missing = missing_recipients(&drivers, &submitted);
                Ok(self
                    .push_to_each(&client, &missing, |driver| {
                        format!(
                            "{}さん、業務前報告が未提出です。\n\n安全確認のため、早めの提出をお願いします。",
                            driver.name
                        )
                    })
                    .await)
            }
            CheckType::PostWork => {
                let submitted = self
                    .submitted_driver_ids("post_work_reports", "report_date", today, &drivers)
                    .await?;
                let missing = missing_recipients(&drivers, &submitted);
                Ok(self
                    .push_to_each(&client, &missing, |driver| {
                        format!(
                            "{}さん、業務後報告が未提出です。\n\n本日の業務後報告の提出をお願いします。",
                            driver.name
                        )
                    })
                    .await)
            }
            CheckType::MorningReminder => {
                let everyone: Vec<&Recipient> = drivers.iter().collect();
                Ok(self
                    .push_to_each(&client, &everyone, |driver| {
                        format!(
                            "おはようございます、{}さん。\n\n本日も安全運転でお願いします。\n業務前報告の提出をお願いします。",
                            driver.name
                        )
                    })
                    .await)
            }
            CheckType::AdminSummary => self.send_admin_summary(org, &client, &drivers, today).await,
        }
    }

    async fn send_admin_summary(
        &self,
        org: &MessagingOrg,
        client: &LineMessagingClient,
        drivers: &[Recipient],
        today: NaiveDate,
    ) -> AppResult<u32> {
        let pre_submitted = self
            .submitted_driver_ids("pre_work_reports", "report_date", today, drivers)
            .await?;
        let inspection_submitted = self
            .submitted_driver_ids("daily_inspections", "inspection_date", today, drivers)
            .await?;

        let summary = compose_admin_summary(
            &org.name,
            today,
            drivers,
            &pre_submitted,
            &inspection_submitted,
        );

        let admins = self.linked_admins(org.id).await?;
        if admins.is_empty() {
            tracing::debug!(org_id = %org.id, "no LINE-linked admins, skipping summary");
            return Ok(0);
        }

        let recipients: Vec<&Recipient> = admins.iter().collect();
        Ok(self
            .push_to_each(client, &recipients, |_| summary.clone())
            .await)
    }

    /// Push one message per recipient, skipping individual failures.
    async fn push_to_each(
        &self,
        client: &LineMessagingClient,
        recipients: &[&Recipient],
        message_for: impl Fn(&Recipient) -> String,
    ) -> u32 {
        let mut sent = 0;
        for recipient in recipients {
            match client
                .push_message(&recipient.line_user_id, LineMessage::text(message_for(recipient)))
                .await
            {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(
                        recipient = %mask_name(&recipient.name),
                        "push failed, skipping recipient: {}",
                        e
                    );
                }
            }
        }
        sent
    }

    // ========================================================================
    // Queries
    // ========================================================================

    async fn load_messaging_orgs(&self) -> AppResult<Vec<MessagingOrg>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, serde_json::Value)>(
            r#"
            SELECT id, name, line_channel_access_token, settings
            FROM organizations
            WHERE line_channel_access_token IS NOT NULL
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, channel_access_token, settings)| MessagingOrg {
                id,
                name,
                channel_access_token,
                settings: notification_settings_from(&settings),
            })
            .collect())
    }

    async fn linked_active_drivers(&self, organization_id: Uuid) -> AppResult<Vec<Recipient>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String)>(
            r#"
            SELECT id, name, line_user_id
            FROM drivers
            WHERE organization_id = $1 AND status = $2 AND line_user_id IS NOT NULL
            "#,
        )
        .bind(organization_id)
        .bind(DriverStatus::Active.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, line_user_id)| Recipient {
                id,
                name,
                line_user_id,
            })
            .collect())
    }

    async fn linked_admins(&self, organization_id: Uuid) -> AppResult<Vec<Recipient>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String)>(
            r#"
            SELECT id, name, line_user_id
            FROM admin_users
            WHERE organization_id = $1 AND line_user_id IS NOT NULL
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, line_user_id)| Recipient {
                id,
                name,
                line_user_id,
            })
            .collect())
    }

    /// Drivers with a submission row of the given type for `date`.
    ///
    /// Table and column names come from the fixed match arms above, never
    /// from request input.
    async fn submitted_driver_ids(
        &self,
        table: &str,
        date_column: &str,
        date: NaiveDate,
        roster: &[Recipient],
    ) -> AppResult<HashSet<Uuid>> {
        let driver_ids: Vec<Uuid> = roster.iter().map(|d| d.id).collect();
        let query = format!(
            "SELECT driver_id FROM {} WHERE {} = $1 AND driver_id = ANY($2)",
            table, date_column
        );
        let rows = sqlx::query_scalar::<_, Uuid>(&query)
            .bind(date)
            .bind(&driver_ids)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().collect())
    }
}

/// The organization's civil date. Japan has no daylight saving, so "today"
/// is the calendar date at fixed UTC+9.
pub fn today_jst() -> NaiveDate {
    (Utc::now() + Duration::hours(9)).date_naive()
}

/// The toggle governing a check type.
pub fn toggle_for(settings: &NotificationSettings, check_type: CheckType) -> &NotificationToggle {
    match check_type {
        CheckType::PreWork => &settings.pre_work_alert,
        CheckType::PostWork => &settings.post_work_alert,
        CheckType::AdminSummary => &settings.admin_summary,
        CheckType::MorningReminder => &settings.morning_reminder,
    }
}

/// Parse the `notification` key of an organization's settings blob; a
/// missing or malformed key means the defaults (all enabled).
pub fn notification_settings_from(settings: &serde_json::Value) -> NotificationSettings {
    settings
        .get("notification")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Active linked drivers without a submission row: roster minus submitters.
pub fn missing_recipients<'a>(
    roster: &'a [Recipient],
    submitted: &HashSet<Uuid>,
) -> Vec<&'a Recipient> {
    roster
        .iter()
        .filter(|driver| !submitted.contains(&driver.id))
        .collect()
}

/// Compose the daily admin summary text.
pub fn compose_admin_summary(
    org_name: &str,
    today: NaiveDate,
    drivers: &[Recipient],
    pre_submitted: &HashSet<Uuid>,
    inspection_submitted: &HashSet<Uuid>,
) -> String {
    let total = drivers.len();
    let pre_missing: Vec<&str> = missing_recipients(drivers, pre_submitted)
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    let inspection_missing: Vec<&str> = missing_recipients(drivers, inspection_submitted)
        .iter()
        .map(|d| d.name.as_str())
        .collect();

    let mut summary = format!("【{}】本日の提出状況（{}）\n\n", org_name, today);
    summary += &format!(
        "📋 業務前報告: {}/{}名\n",
        total - pre_missing.len(),
        total
    );
    if !pre_missing.is_empty() {
        summary += &format!("  未提出: {}\n", pre_missing.join("、"));
    }
    summary += &format!(
        "\n🔧 日常点検: {}/{}名\n",
        total - inspection_missing.len(),
        total
    );
    if !inspection_missing.is_empty() {
        summary += &format!("  未提出: {}\n", inspection_missing.join("、"));
    }

    if pre_missing.is_empty() && inspection_missing.is_empty() {
        summary += "\n✅ 全員提出済みです。";
    } else {
        summary += "\n⚠️ 未提出者がいます。確認をお願いします。";
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(id: Uuid, name: &str) -> Recipient {
        Recipient {
            id,
            name: name.to_string(),
            line_user_id: format!("U{}", id.simple()),
        }
    }

    #[test]
    fn test_missing_set_is_roster_minus_submitters() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let roster = vec![recipient(a, "A"), recipient(b, "B"), recipient(c, "C")];

        let submitted: HashSet<Uuid> = [a].into_iter().collect();
        let missing = missing_recipients(&roster, &submitted);

        let missing_ids: Vec<Uuid> = missing.iter().map(|d| d.id).collect();
        assert_eq!(missing_ids, vec![b, c]);
    }

    #[test]
    fn test_missing_set_empty_when_all_submitted() {
        let a = Uuid::new_v4();
        let roster = vec![recipient(a, "A")];
        let submitted: HashSet<Uuid> = [a].into_iter().collect();
        assert!(missing_recipients(&roster, &submitted).is_empty());
    }

    #[test]
    fn test_check_type_wire_names() {
        assert_eq!(
            serde_json::from_str::<CheckType>(r#""pre_work""#).unwrap(),
            CheckType::PreWork
        );
        assert_eq!(
            serde_json::from_str::<CheckType>(r#""admin_summary""#).unwrap(),
            CheckType::AdminSummary
        );
        assert!(serde_json::from_str::<CheckType>(r#""weekly""#).is_err());
    }

    #[test]
    fn test_toggle_selection() {
        let mut settings = NotificationSettings::default();
        settings.pre_work_alert.enabled = false;

        assert!(!toggle_for(&settings, CheckType::PreWork).enabled);
        assert!(toggle_for(&settings, CheckType::PostWork).enabled);
        assert!(toggle_for(&settings, CheckType::MorningReminder).enabled);
    }

    #[test]
    fn test_settings_parse_from_org_blob() {
        let blob = serde_json::json!({
            "notification": {
                "preWorkAlert": { "enabled": false, "time": "09:00" }
            },
            "theme": "green"
        });
        let settings = notification_settings_from(&blob);
        assert!(!settings.pre_work_alert.enabled);
        assert!(settings.admin_summary.enabled);
    }

    #[test]
    fn test_settings_default_when_key_missing() {
        let settings = notification_settings_from(&serde_json::json!({}));
        assert_eq!(settings, NotificationSettings::default());
    }

    #[test]
    fn test_admin_summary_all_submitted() {
        let a = Uuid::new_v4();
        let roster = vec![recipient(a, "佐藤 太郎")];
        let submitted: HashSet<Uuid> = [a].into_iter().collect();
        let date = NaiveDate::from_ymd_opt(2026, 2, 12).unwrap();

        let summary = compose_admin_summary("テスト運送", date, &roster, &submitted, &submitted);

        assert!(summary.contains("【テスト運送】"));
        assert!(summary.contains("2026-02-12"));
        assert!(summary.contains("業務前報告: 1/1名"));
        assert!(summary.contains("日常点検: 1/1名"));
        assert!(summary.contains("全員提出済み"));
        assert!(!summary.contains("未提出:"));
    }

    #[test]
    fn test_admin_summary_lists_missing_names() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let roster = vec![recipient(a, "佐藤 太郎"), recipient(b, "鈴木 花子")];
        let pre: HashSet<Uuid> = [a].into_iter().collect();
        let inspections: HashSet<Uuid> = HashSet::new();
        let date = NaiveDate::from_ymd_opt(2026, 2, 12).unwrap();

        let summary = compose_admin_summary("テスト運送", date, &roster, &pre, &inspections);

        assert!(summary.contains("業務前報告: 1/2名"));
        assert!(summary.contains("未提出: 鈴木 花子"));
        assert!(summary.contains("日常点検: 0/2名"));
        assert!(summary.contains("佐藤 太郎、鈴木 花子"));
        assert!(summary.contains("⚠️"));
    }
}
