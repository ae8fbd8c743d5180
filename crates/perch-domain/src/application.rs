use chrono::{DateTime, Utc};

/// Application domain entity. Owned by exactly one organization; the
/// service-profile name is denormalized onto the row for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub organization_id: i64,
    pub service_profile_id: String,
    pub service_profile_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateApplicationInput {
    pub name: String,
    pub description: String,
    pub organization_id: i64,
    pub service_profile_id: String,
    pub service_profile_name: String,
}

/// Input for updating an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateApplicationInput {
    pub application_id: i64,
    pub name: String,
    pub description: String,
    pub service_profile_id: String,
    pub service_profile_name: String,
}
