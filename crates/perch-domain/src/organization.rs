use chrono::{DateTime, Utc};

/// Organization domain entity. Visibility of every other inventory entity
/// is rooted in membership of an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrganizationInput {
    pub name: String,
}

/// Input for updating an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOrganizationInput {
    pub organization_id: i64,
    pub name: String,
}

/// Link between a user and an organization. The pair is unique; its
/// existence is what makes the organization's resources visible to the
/// user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Membership {
    pub organization_id: i64,
    pub user_id: i64,
}
