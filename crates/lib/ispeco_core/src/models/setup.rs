//! Camera installation records.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// Where and when a camera was installed. One per camera, removed with it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CameraSetup {
    pub camera_id: Uuid,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub zip_code: String,
    pub state_province: String,
    pub country: String,
    pub installed_on: NaiveDate,
    pub installed_at: NaiveTime,
    pub installation_notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated values for creating or replacing a setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupFields {
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub zip_code: String,
    pub state_province: String,
    pub country: String,
    pub installed_on: NaiveDate,
    pub installed_at: NaiveTime,
    pub installation_notes: String,
}
