use chrono::{DateTime, Utc};

use crate::eui::Eui;

/// Device domain entity. Owned by exactly one application, and through it
/// by exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub dev_eui: Eui,
    pub application_id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceInput {
    pub name: String,
    pub dev_eui: Eui,
    pub application_id: i64,
}

/// Input for updating a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDeviceInput {
    pub device_id: i64,
    pub name: String,
}
