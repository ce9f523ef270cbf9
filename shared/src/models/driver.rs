//! Driver model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A driver as seen by the linking and reporting subsystem.
///
/// This is the view resolved from a verified LINE identity: enough to
/// scope queries to the right organization and to prefill the LIFF forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub default_vehicle_id: Option<Uuid>,
}
