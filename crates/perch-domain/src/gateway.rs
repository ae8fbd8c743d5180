use chrono::{DateTime, Utc};

use crate::eui::Eui;

/// Gateway domain entity. Owned by exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    pub id: i64,
    pub name: String,
    pub mac: Eui,
    pub organization_id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGatewayInput {
    pub name: String,
    pub mac: Eui,
    pub organization_id: i64,
}

/// Input for updating a gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateGatewayInput {
    pub gateway_id: i64,
    pub name: String,
}
