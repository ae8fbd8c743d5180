use async_trait::async_trait;

use crate::application::{Application, CreateApplicationInput, UpdateApplicationInput};
use crate::device::{CreateDeviceInput, Device, UpdateDeviceInput};
use crate::error::DomainResult;
use crate::gateway::{CreateGatewayInput, Gateway, UpdateGatewayInput};
use crate::organization::{CreateOrganizationInput, Organization, UpdateOrganizationInput};
use crate::search::{ListScope, SearchHit};
use crate::user::{CreateUserInput, Principal, User};

/// Cross-entity ranked search over the whole inventory.
///
/// Implementations must apply the visibility predicate and the substring
/// gate before merging, rank by similarity score descending, break ties by
/// kind name then per-kind sort key, and paginate over the merged set.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchRepository: Send + Sync {
    async fn global_search(
        &self,
        principal: &Principal,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<SearchHit>>;
}

/// Repository trait for organization storage operations.
/// Infrastructure (e.g. perch-postgres) implements this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn create_organization(&self, input: CreateOrganizationInput)
        -> DomainResult<Organization>;

    async fn get_organization(&self, organization_id: i64) -> DomainResult<Option<Organization>>;

    async fn update_organization(&self, input: UpdateOrganizationInput)
        -> DomainResult<Organization>;

    async fn delete_organization(&self, organization_id: i64) -> DomainResult<()>;

    /// List organizations visible under the scope, ordered by name then id.
    async fn list_organizations(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Organization>>;

    /// Count the rows `list_organizations` paginates over, under the same
    /// scope predicate.
    async fn count_organizations(&self, scope: &ListScope) -> DomainResult<i64>;
}

/// Repository trait for application storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn create_application(&self, input: CreateApplicationInput) -> DomainResult<Application>;

    async fn get_application(&self, application_id: i64) -> DomainResult<Option<Application>>;

    async fn update_application(&self, input: UpdateApplicationInput) -> DomainResult<Application>;

    async fn delete_application(&self, application_id: i64) -> DomainResult<()>;

    async fn list_applications(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Application>>;

    async fn count_applications(&self, scope: &ListScope) -> DomainResult<i64>;
}

/// Repository trait for device storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<Device>;

    async fn get_device(&self, device_id: i64) -> DomainResult<Option<Device>>;

    async fn update_device(&self, input: UpdateDeviceInput) -> DomainResult<Device>;

    async fn delete_device(&self, device_id: i64) -> DomainResult<()>;

    async fn list_devices(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Device>>;

    async fn count_devices(&self, scope: &ListScope) -> DomainResult<i64>;
}

/// Repository trait for gateway storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayRepository: Send + Sync {
    async fn create_gateway(&self, input: CreateGatewayInput) -> DomainResult<Gateway>;

    async fn get_gateway(&self, gateway_id: i64) -> DomainResult<Option<Gateway>>;

    async fn update_gateway(&self, input: UpdateGatewayInput) -> DomainResult<Gateway>;

    async fn delete_gateway(&self, gateway_id: i64) -> DomainResult<()>;

    async fn list_gateways(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Gateway>>;

    async fn count_gateways(&self, scope: &ListScope) -> DomainResult<i64>;
}

/// Repository trait for user and membership storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, input: CreateUserInput) -> DomainResult<User>;

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>>;

    async fn add_membership(&self, organization_id: i64, user_id: i64) -> DomainResult<()>;

    async fn remove_membership(&self, organization_id: i64, user_id: i64) -> DomainResult<()>;
}
