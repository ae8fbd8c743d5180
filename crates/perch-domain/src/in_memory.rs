use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::application::{Application, CreateApplicationInput, UpdateApplicationInput};
use crate::device::{CreateDeviceInput, Device, UpdateDeviceInput};
use crate::error::{DomainError, DomainResult};
use crate::gateway::{CreateGatewayInput, Gateway, UpdateGatewayInput};
use crate::organization::{CreateOrganizationInput, Membership, Organization, UpdateOrganizationInput};
use crate::repository::{
    ApplicationRepository, DeviceRepository, GatewayRepository, OrganizationRepository,
    SearchRepository, UserRepository,
};
use crate::search::{ListScope, SearchHit};
use crate::similarity::similarity;
use crate::user::{CreateUserInput, Principal, User};

/// In-memory implementation of every inventory repository trait.
///
/// Carries the reference semantics of the search and listing engine: the
/// substring gate, trigram ranking, visibility predicate and tie-break here
/// match what the SQL engine produces, so engine behavior can be tested
/// without a database.
#[derive(Clone)]
pub struct InMemoryInventory {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    organizations: HashMap<i64, Organization>,
    applications: HashMap<i64, Application>,
    devices: HashMap<i64, Device>,
    gateways: HashMap<i64, Gateway>,
    users: HashMap<i64, User>,
    memberships: HashSet<Membership>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn org_visible(&self, principal: &Principal, organization_id: i64) -> bool {
        if principal.is_admin {
            return true;
        }
        self.users
            .values()
            .find(|u| u.username == principal.username)
            .is_some_and(|u| {
                self.memberships.contains(&Membership {
                    organization_id,
                    user_id: u.id,
                })
            })
    }

    fn scope_allows(&self, scope: &ListScope, organization_id: i64, name: &str) -> bool {
        self.org_visible(&scope.principal, organization_id)
            && scope.organization_id.is_none_or(|id| id == organization_id)
            && scope
                .name_filter
                .as_deref()
                .is_none_or(|f| contains_ci(name, f))
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Tables::default())),
        }
    }
}

impl Default for InMemoryInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchRepository for InMemoryInventory {
    async fn global_search(
        &self,
        principal: &Principal,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<SearchHit>> {
        let tables = self.inner.read().await;
        let mut hits = Vec::new();

        // Substring containment is the inclusion gate; the similarity
        // score only orders what the gate lets through.
        for org in tables.organizations.values() {
            if !tables.org_visible(principal, org.id) || !contains_ci(&org.name, query) {
                continue;
            }
            hits.push(SearchHit::Organization {
                score: similarity(&org.name, query),
                organization_id: org.id,
                organization_name: org.name.clone(),
            });
        }

        for app in tables.applications.values() {
            let Some(org) = tables.organizations.get(&app.organization_id) else {
                continue;
            };
            if !tables.org_visible(principal, org.id) || !contains_ci(&app.name, query) {
                continue;
            }
            hits.push(SearchHit::Application {
                score: similarity(&app.name, query),
                organization_id: org.id,
                organization_name: org.name.clone(),
                application_id: app.id,
                application_name: app.name.clone(),
            });
        }

        for device in tables.devices.values() {
            let Some(app) = tables.applications.get(&device.application_id) else {
                continue;
            };
            let Some(org) = tables.organizations.get(&app.organization_id) else {
                continue;
            };
            let hex = device.dev_eui.to_hex();
            if !tables.org_visible(principal, org.id)
                || !(contains_ci(&device.name, query) || contains_ci(&hex, query))
            {
                continue;
            }
            hits.push(SearchHit::Device {
                score: similarity(&device.name, query).max(similarity(&hex, query)),
                organization_id: org.id,
                organization_name: org.name.clone(),
                application_id: app.id,
                application_name: app.name.clone(),
                device_eui: device.dev_eui,
                device_name: device.name.clone(),
            });
        }

        for gateway in tables.gateways.values() {
            let Some(org) = tables.organizations.get(&gateway.organization_id) else {
                continue;
            };
            let hex = gateway.mac.to_hex();
            if !tables.org_visible(principal, org.id)
                || !(contains_ci(&gateway.name, query) || contains_ci(&hex, query))
            {
                continue;
            }
            hits.push(SearchHit::Gateway {
                score: similarity(&gateway.name, query).max(similarity(&hex, query)),
                organization_id: org.id,
                organization_name: org.name.clone(),
                gateway_mac: gateway.mac,
                gateway_name: gateway.name.clone(),
            });
        }

        // Score descending, then kind name, then the per-kind sort key, so
        // equal scores page deterministically.
        hits.sort_by(|a, b| {
            b.score()
                .total_cmp(&a.score())
                .then_with(|| a.kind().cmp(&b.kind()))
                .then_with(|| a.sort_key().cmp(&b.sort_key()))
        });

        Ok(paginate(hits, limit, offset))
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryInventory {
    async fn create_organization(
        &self,
        input: CreateOrganizationInput,
    ) -> DomainResult<Organization> {
        let mut tables = self.inner.write().await;
        if tables.organizations.values().any(|o| o.name == input.name) {
            return Err(DomainError::OrganizationAlreadyExists(input.name));
        }

        let now = Utc::now();
        let organization = Organization {
            id: tables.next_id(),
            name: input.name,
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }

    async fn get_organization(&self, organization_id: i64) -> DomainResult<Option<Organization>> {
        let tables = self.inner.read().await;
        Ok(tables.organizations.get(&organization_id).cloned())
    }

    async fn update_organization(
        &self,
        input: UpdateOrganizationInput,
    ) -> DomainResult<Organization> {
        let mut tables = self.inner.write().await;
        let organization = tables
            .organizations
            .get_mut(&input.organization_id)
            .ok_or(DomainError::OrganizationNotFound(input.organization_id))?;
        organization.name = input.name;
        organization.updated_at = Some(Utc::now());
        Ok(organization.clone())
    }

    async fn delete_organization(&self, organization_id: i64) -> DomainResult<()> {
        let mut tables = self.inner.write().await;
        if tables.organizations.remove(&organization_id).is_none() {
            return Err(DomainError::OrganizationNotFound(organization_id));
        }

        // Mirror the schema's ON DELETE CASCADE.
        let app_ids: HashSet<i64> = tables
            .applications
            .values()
            .filter(|a| a.organization_id == organization_id)
            .map(|a| a.id)
            .collect();
        tables
            .applications
            .retain(|_, a| a.organization_id != organization_id);
        tables
            .devices
            .retain(|_, d| !app_ids.contains(&d.application_id));
        tables
            .gateways
            .retain(|_, g| g.organization_id != organization_id);
        tables
            .memberships
            .retain(|m| m.organization_id != organization_id);
        Ok(())
    }

    async fn list_organizations(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Organization>> {
        let tables = self.inner.read().await;
        Ok(paginate(matching_organizations(&tables, scope), limit, offset))
    }

    async fn count_organizations(&self, scope: &ListScope) -> DomainResult<i64> {
        let tables = self.inner.read().await;
        Ok(matching_organizations(&tables, scope).len() as i64)
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryInventory {
    async fn create_application(&self, input: CreateApplicationInput) -> DomainResult<Application> {
        let mut tables = self.inner.write().await;
        if !tables.organizations.contains_key(&input.organization_id) {
            return Err(DomainError::InvalidArgument(format!(
                "organization {} does not exist",
                input.organization_id
            )));
        }
        // Application names are unique within their organization.
        if tables
            .applications
            .values()
            .any(|a| a.organization_id == input.organization_id && a.name == input.name)
        {
            return Err(DomainError::ApplicationAlreadyExists(input.name));
        }

        let now = Utc::now();
        let application = Application {
            id: tables.next_id(),
            name: input.name,
            description: input.description,
            organization_id: input.organization_id,
            service_profile_id: input.service_profile_id,
            service_profile_name: input.service_profile_name,
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn get_application(&self, application_id: i64) -> DomainResult<Option<Application>> {
        let tables = self.inner.read().await;
        Ok(tables.applications.get(&application_id).cloned())
    }

    async fn update_application(&self, input: UpdateApplicationInput) -> DomainResult<Application> {
        let mut tables = self.inner.write().await;
        let application = tables
            .applications
            .get_mut(&input.application_id)
            .ok_or(DomainError::ApplicationNotFound(input.application_id))?;
        application.name = input.name;
        application.description = input.description;
        application.service_profile_id = input.service_profile_id;
        application.service_profile_name = input.service_profile_name;
        application.updated_at = Some(Utc::now());
        Ok(application.clone())
    }

    async fn delete_application(&self, application_id: i64) -> DomainResult<()> {
        let mut tables = self.inner.write().await;
        if tables.applications.remove(&application_id).is_none() {
            return Err(DomainError::ApplicationNotFound(application_id));
        }
        tables
            .devices
            .retain(|_, d| d.application_id != application_id);
        Ok(())
    }

    async fn list_applications(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Application>> {
        let tables = self.inner.read().await;
        Ok(paginate(matching_applications(&tables, scope), limit, offset))
    }

    async fn count_applications(&self, scope: &ListScope) -> DomainResult<i64> {
        let tables = self.inner.read().await;
        Ok(matching_applications(&tables, scope).len() as i64)
    }
}

#[async_trait]
impl DeviceRepository for InMemoryInventory {
    async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<Device> {
        let mut tables = self.inner.write().await;
        if !tables.applications.contains_key(&input.application_id) {
            return Err(DomainError::InvalidArgument(format!(
                "application {} does not exist",
                input.application_id
            )));
        }
        if tables.devices.values().any(|d| d.dev_eui == input.dev_eui) {
            return Err(DomainError::DeviceAlreadyExists(input.dev_eui.to_hex()));
        }

        let now = Utc::now();
        let device = Device {
            id: tables.next_id(),
            name: input.name,
            dev_eui: input.dev_eui,
            application_id: input.application_id,
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables.devices.insert(device.id, device.clone());
        Ok(device)
    }

    async fn get_device(&self, device_id: i64) -> DomainResult<Option<Device>> {
        let tables = self.inner.read().await;
        Ok(tables.devices.get(&device_id).cloned())
    }

    async fn update_device(&self, input: UpdateDeviceInput) -> DomainResult<Device> {
        let mut tables = self.inner.write().await;
        let device = tables
            .devices
            .get_mut(&input.device_id)
            .ok_or(DomainError::DeviceNotFound(input.device_id))?;
        device.name = input.name;
        device.updated_at = Some(Utc::now());
        Ok(device.clone())
    }

    async fn delete_device(&self, device_id: i64) -> DomainResult<()> {
        let mut tables = self.inner.write().await;
        if tables.devices.remove(&device_id).is_none() {
            return Err(DomainError::DeviceNotFound(device_id));
        }
        Ok(())
    }

    async fn list_devices(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Device>> {
        let tables = self.inner.read().await;
        Ok(paginate(matching_devices(&tables, scope), limit, offset))
    }

    async fn count_devices(&self, scope: &ListScope) -> DomainResult<i64> {
        let tables = self.inner.read().await;
        Ok(matching_devices(&tables, scope).len() as i64)
    }
}

#[async_trait]
impl GatewayRepository for InMemoryInventory {
    async fn create_gateway(&self, input: CreateGatewayInput) -> DomainResult<Gateway> {
        let mut tables = self.inner.write().await;
        if !tables.organizations.contains_key(&input.organization_id) {
            return Err(DomainError::InvalidArgument(format!(
                "organization {} does not exist",
                input.organization_id
            )));
        }
        if tables.gateways.values().any(|g| g.mac == input.mac) {
            return Err(DomainError::GatewayAlreadyExists(input.mac.to_hex()));
        }

        let now = Utc::now();
        let gateway = Gateway {
            id: tables.next_id(),
            name: input.name,
            mac: input.mac,
            organization_id: input.organization_id,
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables.gateways.insert(gateway.id, gateway.clone());
        Ok(gateway)
    }

    async fn get_gateway(&self, gateway_id: i64) -> DomainResult<Option<Gateway>> {
        let tables = self.inner.read().await;
        Ok(tables.gateways.get(&gateway_id).cloned())
    }

    async fn update_gateway(&self, input: UpdateGatewayInput) -> DomainResult<Gateway> {
        let mut tables = self.inner.write().await;
        let gateway = tables
            .gateways
            .get_mut(&input.gateway_id)
            .ok_or(DomainError::GatewayNotFound(input.gateway_id))?;
        gateway.name = input.name;
        gateway.updated_at = Some(Utc::now());
        Ok(gateway.clone())
    }

    async fn delete_gateway(&self, gateway_id: i64) -> DomainResult<()> {
        let mut tables = self.inner.write().await;
        if tables.gateways.remove(&gateway_id).is_none() {
            return Err(DomainError::GatewayNotFound(gateway_id));
        }
        Ok(())
    }

    async fn list_gateways(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Gateway>> {
        let tables = self.inner.read().await;
        Ok(paginate(matching_gateways(&tables, scope), limit, offset))
    }

    async fn count_gateways(&self, scope: &ListScope) -> DomainResult<i64> {
        let tables = self.inner.read().await;
        Ok(matching_gateways(&tables, scope).len() as i64)
    }
}

#[async_trait]
impl UserRepository for InMemoryInventory {
    async fn create_user(&self, input: CreateUserInput) -> DomainResult<User> {
        let mut tables = self.inner.write().await;
        if tables.users.values().any(|u| u.username == input.username) {
            return Err(DomainError::UserAlreadyExists(input.username));
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            username: input.username,
            is_admin: input.is_admin,
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn add_membership(&self, organization_id: i64, user_id: i64) -> DomainResult<()> {
        let mut tables = self.inner.write().await;
        if !tables.organizations.contains_key(&organization_id) {
            return Err(DomainError::InvalidArgument(format!(
                "organization {organization_id} does not exist"
            )));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(DomainError::InvalidArgument(format!(
                "user {user_id} does not exist"
            )));
        }
        if !tables.memberships.insert(Membership {
            organization_id,
            user_id,
        }) {
            return Err(DomainError::MembershipAlreadyExists {
                organization_id,
                user_id,
            });
        }
        Ok(())
    }

    async fn remove_membership(&self, organization_id: i64, user_id: i64) -> DomainResult<()> {
        let mut tables = self.inner.write().await;
        if !tables.memberships.remove(&Membership {
            organization_id,
            user_id,
        }) {
            return Err(DomainError::MembershipNotFound {
                organization_id,
                user_id,
            });
        }
        Ok(())
    }
}

// List and count share these helpers, so both always evaluate the same
// visibility and filter predicate.

fn matching_organizations(tables: &Tables, scope: &ListScope) -> Vec<Organization> {
    let mut items: Vec<Organization> = tables
        .organizations
        .values()
        .filter(|o| tables.scope_allows(scope, o.id, &o.name))
        .cloned()
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    items
}

fn matching_applications(tables: &Tables, scope: &ListScope) -> Vec<Application> {
    let mut items: Vec<Application> = tables
        .applications
        .values()
        .filter(|a| tables.scope_allows(scope, a.organization_id, &a.name))
        .cloned()
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    items
}

fn matching_devices(tables: &Tables, scope: &ListScope) -> Vec<Device> {
    let mut items: Vec<Device> = tables
        .devices
        .values()
        .filter(|d| {
            tables
                .applications
                .get(&d.application_id)
                .is_some_and(|a| tables.scope_allows(scope, a.organization_id, &d.name))
        })
        .cloned()
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    items
}

fn matching_gateways(tables: &Tables, scope: &ListScope) -> Vec<Gateway> {
    let mut items: Vec<Gateway> = tables
        .gateways
        .values()
        .filter(|g| tables.scope_allows(scope, g.organization_id, &g.name))
        .cloned()
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    items
}
