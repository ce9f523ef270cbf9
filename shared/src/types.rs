//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Driver lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Active,
    Inactive,
    Suspended,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Active => "active",
            DriverStatus::Inactive => "inactive",
            DriverStatus::Suspended => "suspended",
        }
    }
}

/// Administrator role within an organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    OrgAdmin,
    Manager,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::OrgAdmin => "org_admin",
            AdminRole::Manager => "manager",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "org_admin" => Some(AdminRole::OrgAdmin),
            "manager" => Some(AdminRole::Manager),
            _ => None,
        }
    }
}

/// Daily shift status for a driver
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Working,
    DayOff,
    HalfAm,
    HalfPm,
    Absent,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Working => "working",
            ShiftStatus::DayOff => "day_off",
            ShiftStatus::HalfAm => "half_am",
            ShiftStatus::HalfPm => "half_pm",
            ShiftStatus::Absent => "absent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "working" => Some(ShiftStatus::Working),
            "day_off" => Some(ShiftStatus::DayOff),
            "half_am" => Some(ShiftStatus::HalfAm),
            "half_pm" => Some(ShiftStatus::HalfPm),
            "absent" => Some(ShiftStatus::Absent),
            _ => None,
        }
    }
}

/// Who recorded a shift entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftSubmitter {
    Driver,
    Admin,
    System,
}

impl ShiftSubmitter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftSubmitter::Driver => "driver",
            ShiftSubmitter::Admin => "admin",
            ShiftSubmitter::System => "system",
        }
    }
}

/// Channel a report was submitted through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmittedVia {
    Liff,
    Web,
    Manual,
}

impl SubmittedVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmittedVia::Liff => "liff",
            SubmittedVia::Web => "web",
            SubmittedVia::Manual => "manual",
        }
    }
}

/// Category of an emergency report from a driver
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyReportType {
    Absent,
    VehicleTrouble,
    Accident,
    Family,
    Other,
}

impl EmergencyReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyReportType::Absent => "absent",
            EmergencyReportType::VehicleTrouble => "vehicle_trouble",
            EmergencyReportType::Accident => "accident",
            EmergencyReportType::Family => "family",
            EmergencyReportType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "absent" => Some(EmergencyReportType::Absent),
            "vehicle_trouble" => Some(EmergencyReportType::VehicleTrouble),
            "accident" => Some(EmergencyReportType::Accident),
            "family" => Some(EmergencyReportType::Family),
            "other" => Some(EmergencyReportType::Other),
            _ => None,
        }
    }

    /// Japanese label shown in admin notifications
    pub fn label_ja(&self) -> &'static str {
        match self {
            EmergencyReportType::Absent => "体調不良・欠勤",
            EmergencyReportType::VehicleTrouble => "車両故障",
            EmergencyReportType::Accident => "事故",
            EmergencyReportType::Family => "家庭の事情",
            EmergencyReportType::Other => "その他",
        }
    }
}

/// Result of the legally mandated alcohol check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlcoholCheckResult {
    Negative,
    Positive,
}

impl AlcoholCheckResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlcoholCheckResult::Negative => "negative",
            AlcoholCheckResult::Positive => "positive",
        }
    }
}

/// Self-reported health condition at roll call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthCondition {
    Good,
    Fair,
    Poor,
}

impl HealthCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthCondition::Good => "good",
            HealthCondition::Fair => "fair",
            HealthCondition::Poor => "poor",
        }
    }
}

/// Self-reported fatigue level at roll call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FatigueLevel {
    None,
    Mild,
    Severe,
}

impl FatigueLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueLevel::None => "none",
            FatigueLevel::Mild => "mild",
            FatigueLevel::Severe => "severe",
        }
    }
}

/// Review status of an accident report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccidentStatus {
    Draft,
    Submitted,
    Reviewed,
}

impl AccidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccidentStatus::Draft => "draft",
            AccidentStatus::Submitted => "submitted",
            AccidentStatus::Reviewed => "reviewed",
        }
    }
}

/// A rest break recorded in a post-work report (stored as JSONB)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestPeriod {
    /// "HH:MM"
    pub start: String,
    /// "HH:MM"
    pub end: String,
    pub location: String,
}

/// A single notification toggle in an organization's settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationToggle {
    pub enabled: bool,
    /// Delivery time as "HH:MM" in the organization's civil timezone
    pub time: String,
}

impl NotificationToggle {
    pub fn new(enabled: bool, time: &str) -> Self {
        Self {
            enabled,
            time: time.to_string(),
        }
    }
}

/// Per-organization notification configuration, stored under the
/// `notification` key of `organizations.settings`.
///
/// Organizations that have never saved settings get the defaults below;
/// a missing key therefore means "enabled at the standard times".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub morning_reminder: NotificationToggle,
    pub pre_work_alert: NotificationToggle,
    pub post_work_alert: NotificationToggle,
    pub admin_summary: NotificationToggle,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            morning_reminder: NotificationToggle::new(true, "08:00"),
            pre_work_alert: NotificationToggle::new(true, "09:30"),
            post_work_alert: NotificationToggle::new(true, "19:00"),
            admin_summary: NotificationToggle::new(true, "10:00"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_status_round_trip() {
        for status in [
            ShiftStatus::Working,
            ShiftStatus::DayOff,
            ShiftStatus::HalfAm,
            ShiftStatus::HalfPm,
            ShiftStatus::Absent,
        ] {
            assert_eq!(ShiftStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ShiftStatus::parse("overtime"), None);
    }

    #[test]
    fn test_emergency_type_labels() {
        assert_eq!(EmergencyReportType::Absent.label_ja(), "体調不良・欠勤");
        assert_eq!(
            EmergencyReportType::parse("vehicle_trouble"),
            Some(EmergencyReportType::VehicleTrouble)
        );
        assert_eq!(EmergencyReportType::parse("breakdown"), None);
    }

    #[test]
    fn test_notification_settings_defaults() {
        let settings = NotificationSettings::default();
        assert!(settings.morning_reminder.enabled);
        assert_eq!(settings.morning_reminder.time, "08:00");
        assert_eq!(settings.pre_work_alert.time, "09:30");
        assert_eq!(settings.post_work_alert.time, "19:00");
        assert_eq!(settings.admin_summary.time, "10:00");
    }

    #[test]
    fn test_notification_settings_partial_json() {
        // A settings blob saved before a toggle existed still deserializes,
        // filling the missing toggles with defaults.
        let json = r#"{"preWorkAlert": {"enabled": false, "time": "09:00"}}"#;
        let settings: NotificationSettings = serde_json::from_str(json).unwrap();
        assert!(!settings.pre_work_alert.enabled);
        assert_eq!(settings.pre_work_alert.time, "09:00");
        assert!(settings.morning_reminder.enabled);
    }

    #[test]
    fn test_admin_role_parse() {
        assert_eq!(AdminRole::parse("org_admin"), Some(AdminRole::OrgAdmin));
        assert_eq!(AdminRole::parse("manager"), Some(AdminRole::Manager));
        assert_eq!(AdminRole::parse("superuser"), None);
    }
}
