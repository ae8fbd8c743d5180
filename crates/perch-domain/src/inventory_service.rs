use std::sync::Arc;

use tracing::debug;

use crate::application::Application;
use crate::device::Device;
use crate::error::{DomainError, DomainResult};
use crate::gateway::Gateway;
use crate::organization::Organization;
use crate::repository::{
    ApplicationRepository, DeviceRepository, GatewayRepository, OrganizationRepository,
};
use crate::search::{EntityKind, ListItem, ListScope, ListingPage};

/// Domain service for scoped, paginated listings with matching counts.
///
/// A listing and its total count always run under the same `ListScope`, so
/// the count is exactly the cardinality of the set the page was cut from.
pub struct InventoryService {
    organizations: Arc<dyn OrganizationRepository>,
    applications: Arc<dyn ApplicationRepository>,
    devices: Arc<dyn DeviceRepository>,
    gateways: Arc<dyn GatewayRepository>,
}

impl InventoryService {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        applications: Arc<dyn ApplicationRepository>,
        devices: Arc<dyn DeviceRepository>,
        gateways: Arc<dyn GatewayRepository>,
    ) -> Self {
        Self {
            organizations,
            applications,
            devices,
            gateways,
        }
    }

    fn check_page(limit: i64, offset: i64) -> DomainResult<()> {
        if limit < 0 {
            return Err(DomainError::InvalidArgument(format!(
                "limit must be non-negative, got {limit}"
            )));
        }
        if offset < 0 {
            return Err(DomainError::InvalidArgument(format!(
                "offset must be non-negative, got {offset}"
            )));
        }
        Ok(())
    }

    /// List entities of the given kind under the scope. Dispatches to the
    /// typed per-kind method and wraps the items in `ListItem`.
    pub async fn list(
        &self,
        kind: EntityKind,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<ListingPage<ListItem>> {
        let page = match kind {
            EntityKind::Organization => {
                let page = self.list_organizations(scope, limit, offset).await?;
                ListingPage {
                    items: page.items.into_iter().map(ListItem::Organization).collect(),
                    total_count: page.total_count,
                }
            }
            EntityKind::Application => {
                let page = self.list_applications(scope, limit, offset).await?;
                ListingPage {
                    items: page.items.into_iter().map(ListItem::Application).collect(),
                    total_count: page.total_count,
                }
            }
            EntityKind::Device => {
                let page = self.list_devices(scope, limit, offset).await?;
                ListingPage {
                    items: page.items.into_iter().map(ListItem::Device).collect(),
                    total_count: page.total_count,
                }
            }
            EntityKind::Gateway => {
                let page = self.list_gateways(scope, limit, offset).await?;
                ListingPage {
                    items: page.items.into_iter().map(ListItem::Gateway).collect(),
                    total_count: page.total_count,
                }
            }
        };
        Ok(page)
    }

    /// Count entities of the given kind under the scope, with the exact
    /// predicate `list` applies.
    pub async fn count(&self, kind: EntityKind, scope: &ListScope) -> DomainResult<i64> {
        match kind {
            EntityKind::Organization => self.organizations.count_organizations(scope).await,
            EntityKind::Application => self.applications.count_applications(scope).await,
            EntityKind::Device => self.devices.count_devices(scope).await,
            EntityKind::Gateway => self.gateways.count_gateways(scope).await,
        }
    }

    pub async fn list_organizations(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<ListingPage<Organization>> {
        Self::check_page(limit, offset)?;
        debug!(username = %scope.principal.username, limit, offset, "Listing organizations");

        let items = self
            .organizations
            .list_organizations(scope, limit, offset)
            .await?;
        let total_count = self.organizations.count_organizations(scope).await?;
        Ok(ListingPage { items, total_count })
    }

    pub async fn list_applications(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<ListingPage<Application>> {
        Self::check_page(limit, offset)?;
        debug!(username = %scope.principal.username, limit, offset, "Listing applications");

        let items = self
            .applications
            .list_applications(scope, limit, offset)
            .await?;
        let total_count = self.applications.count_applications(scope).await?;
        Ok(ListingPage { items, total_count })
    }

    pub async fn list_devices(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<ListingPage<Device>> {
        Self::check_page(limit, offset)?;
        debug!(username = %scope.principal.username, limit, offset, "Listing devices");

        let items = self.devices.list_devices(scope, limit, offset).await?;
        let total_count = self.devices.count_devices(scope).await?;
        Ok(ListingPage { items, total_count })
    }

    pub async fn list_gateways(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<ListingPage<Gateway>> {
        Self::check_page(limit, offset)?;
        debug!(username = %scope.principal.username, limit, offset, "Listing gateways");

        let items = self.gateways.list_gateways(scope, limit, offset).await?;
        let total_count = self.gateways.count_gateways(scope).await?;
        Ok(ListingPage { items, total_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        MockApplicationRepository, MockDeviceRepository, MockGatewayRepository,
        MockOrganizationRepository,
    };
    use crate::user::Principal;

    fn service_with_app_repo(mock_apps: MockApplicationRepository) -> InventoryService {
        InventoryService::new(
            Arc::new(MockOrganizationRepository::new()),
            Arc::new(mock_apps),
            Arc::new(MockDeviceRepository::new()),
            Arc::new(MockGatewayRepository::new()),
        )
    }

    fn sample_application() -> Application {
        Application {
            id: 5,
            name: "weather-app".to_string(),
            description: "weather sensors".to_string(),
            organization_id: 1,
            service_profile_id: "sp-1".to_string(),
            service_profile_name: "default".to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_list_applications_pairs_items_with_count() {
        let mut mock_apps = MockApplicationRepository::new();
        mock_apps
            .expect_list_applications()
            .withf(|scope, limit, offset| {
                scope.principal.username == "alice"
                    && scope.organization_id.is_none()
                    && *limit == 10
                    && *offset == 0
            })
            .times(1)
            .return_once(|_, _, _| Ok(vec![sample_application()]));
        mock_apps
            .expect_count_applications()
            .times(1)
            .return_once(|_| Ok(1));

        let service = service_with_app_repo(mock_apps);
        let scope = ListScope::new(Principal::new("alice", false));

        let page = service.list_applications(&scope, 10, 0).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "weather-app");
    }

    #[tokio::test]
    async fn test_list_dispatches_on_kind() {
        let mut mock_apps = MockApplicationRepository::new();
        mock_apps
            .expect_list_applications()
            .times(1)
            .return_once(|_, _, _| Ok(vec![sample_application()]));
        mock_apps
            .expect_count_applications()
            .times(1)
            .return_once(|_| Ok(1));

        let service = service_with_app_repo(mock_apps);
        let scope = ListScope::new(Principal::new("alice", false));

        let page = service
            .list(EntityKind::Application, &scope, 10, 0)
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert!(matches!(page.items[0], ListItem::Application(_)));
    }

    #[tokio::test]
    async fn test_list_rejects_negative_paging() {
        let service = service_with_app_repo(MockApplicationRepository::new());
        let scope = ListScope::new(Principal::new("alice", false));

        let result = service.list(EntityKind::Application, &scope, -1, 0).await;
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));

        let result = service.list(EntityKind::Application, &scope, 10, -1).await;
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_count_uses_scope_predicate() {
        let mut mock_gateways = MockGatewayRepository::new();
        mock_gateways
            .expect_count_gateways()
            .withf(|scope| scope.organization_id == Some(2))
            .times(1)
            .return_once(|_| Ok(3));

        let service = InventoryService::new(
            Arc::new(MockOrganizationRepository::new()),
            Arc::new(MockApplicationRepository::new()),
            Arc::new(MockDeviceRepository::new()),
            Arc::new(mock_gateways),
        );
        let scope = ListScope::new(Principal::new("bob", true)).organization(2);

        let count = service.count(EntityKind::Gateway, &scope).await.unwrap();
        assert_eq!(count, 3);
    }
}
