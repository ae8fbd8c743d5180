use chrono::{DateTime, Utc};

/// User domain entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserInput {
    pub username: String,
    pub is_admin: bool,
}

/// Identity a query runs on behalf of. Established by the surrounding
/// authentication layer and supplied on every call; this core performs no
/// credential verification of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn new(username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            is_admin,
        }
    }
}
