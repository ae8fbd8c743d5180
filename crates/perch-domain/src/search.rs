use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::application::Application;
use crate::device::Device;
use crate::error::DomainError;
use crate::eui::Eui;
use crate::gateway::Gateway;
use crate::organization::Organization;
use crate::user::Principal;

/// The entity kinds the search and listing engine operates on.
///
/// Variants are declared in alphabetical order so that the derived `Ord`
/// matches the kind-name tie-break used when ranking search hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Application,
    Device,
    Gateway,
    Organization,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Application => "application",
            EntityKind::Device => "device",
            EntityKind::Gateway => "gateway",
            EntityKind::Organization => "organization",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" => Ok(EntityKind::Application),
            "device" => Ok(EntityKind::Device),
            "gateway" => Ok(EntityKind::Gateway),
            "organization" => Ok(EntityKind::Organization),
            other => Err(DomainError::InvalidArgument(format!(
                "unknown entity kind: {other}"
            ))),
        }
    }
}

/// One ranked row in a cross-entity search response. Each variant carries
/// only the fields that exist for its kind; the owning organization is
/// present on all of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchHit {
    Organization {
        score: f64,
        organization_id: i64,
        organization_name: String,
    },
    Application {
        score: f64,
        organization_id: i64,
        organization_name: String,
        application_id: i64,
        application_name: String,
    },
    Device {
        score: f64,
        organization_id: i64,
        organization_name: String,
        application_id: i64,
        application_name: String,
        device_eui: Eui,
        device_name: String,
    },
    Gateway {
        score: f64,
        organization_id: i64,
        organization_name: String,
        gateway_mac: Eui,
        gateway_name: String,
    },
}

impl SearchHit {
    pub fn kind(&self) -> EntityKind {
        match self {
            SearchHit::Organization { .. } => EntityKind::Organization,
            SearchHit::Application { .. } => EntityKind::Application,
            SearchHit::Device { .. } => EntityKind::Device,
            SearchHit::Gateway { .. } => EntityKind::Gateway,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            SearchHit::Organization { score, .. }
            | SearchHit::Application { score, .. }
            | SearchHit::Device { score, .. }
            | SearchHit::Gateway { score, .. } => *score,
        }
    }

    pub fn organization_id(&self) -> i64 {
        match self {
            SearchHit::Organization {
                organization_id, ..
            }
            | SearchHit::Application {
                organization_id, ..
            }
            | SearchHit::Device {
                organization_id, ..
            }
            | SearchHit::Gateway {
                organization_id, ..
            } => *organization_id,
        }
    }

    /// Per-kind unique key used as the final ranking tie-break, so that
    /// equal-score rows order deterministically and pagination never
    /// duplicates or skips rows across page boundaries.
    pub fn sort_key(&self) -> String {
        match self {
            SearchHit::Organization {
                organization_id, ..
            } => organization_id.to_string(),
            SearchHit::Application { application_id, .. } => application_id.to_string(),
            SearchHit::Device { device_eui, .. } => device_eui.to_hex(),
            SearchHit::Gateway { gateway_mac, .. } => gateway_mac.to_hex(),
        }
    }
}

/// Parameters of a cross-entity search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: i64,
    pub offset: i64,
}

/// Visibility and filter parameters shared by a listing and its count.
///
/// `list` and `count` take the same scope value, so the two can never
/// disagree on which rows are in play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListScope {
    pub principal: Principal,
    /// `None` lists across every organization the principal can see;
    /// `Some(id)` restricts to that organization.
    pub organization_id: Option<i64>,
    /// Case-insensitive substring filter on the entity name.
    pub name_filter: Option<String>,
}

impl ListScope {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            organization_id: None,
            name_filter: None,
        }
    }

    pub fn organization(mut self, organization_id: i64) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn name_filter(mut self, filter: impl Into<String>) -> Self {
        self.name_filter = Some(filter.into());
        self
    }
}

/// One page of same-kind items plus the total count the page was cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage<T> {
    pub items: Vec<T>,
    pub total_count: i64,
}

/// A listing item of any kind, returned by the kind-dispatching entry
/// points. A single page only ever holds one variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    Organization(Organization),
    Application(Application),
    Device(Device),
    Gateway(Gateway),
}

/// Escapes LIKE/ILIKE pattern metacharacters in user-supplied text so a
/// literal `%` or `_` in a query never acts as a wildcard.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
