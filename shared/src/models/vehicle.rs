//! Vehicle model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vehicle summary shown to drivers when prefilling report forms
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub plate_number: String,
    pub maker: Option<String>,
    pub model: Option<String>,
}
