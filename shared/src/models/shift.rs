//! Shift model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::ShiftStatus;

/// One day of a driver's shift calendar
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub shift_date: NaiveDate,
    pub status: ShiftStatus,
    pub note: Option<String>,
}
