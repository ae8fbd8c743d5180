use std::sync::Arc;

use tracing::{debug, info};

use crate::application::{Application, CreateApplicationInput, UpdateApplicationInput};
use crate::device::{CreateDeviceInput, Device, UpdateDeviceInput};
use crate::error::{DomainError, DomainResult};
use crate::gateway::{CreateGatewayInput, Gateway, UpdateGatewayInput};
use crate::organization::{CreateOrganizationInput, Organization, UpdateOrganizationInput};
use crate::repository::{
    ApplicationRepository, DeviceRepository, GatewayRepository, OrganizationRepository,
    UserRepository,
};
use crate::user::{CreateUserInput, User};

/// Domain service for inventory CRUD. Verifies the owning entity exists
/// before creating a child, and turns missing rows into NotFound errors.
pub struct ProvisioningService {
    organizations: Arc<dyn OrganizationRepository>,
    applications: Arc<dyn ApplicationRepository>,
    devices: Arc<dyn DeviceRepository>,
    gateways: Arc<dyn GatewayRepository>,
    users: Arc<dyn UserRepository>,
}

impl ProvisioningService {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        applications: Arc<dyn ApplicationRepository>,
        devices: Arc<dyn DeviceRepository>,
        gateways: Arc<dyn GatewayRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            organizations,
            applications,
            devices,
            gateways,
            users,
        }
    }

    pub async fn create_organization(
        &self,
        input: CreateOrganizationInput,
    ) -> DomainResult<Organization> {
        if input.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "organization name cannot be empty".to_string(),
            ));
        }

        debug!(name = %input.name, "Creating organization");
        let organization = self.organizations.create_organization(input).await?;
        info!(organization_id = organization.id, "Organization created");
        Ok(organization)
    }

    pub async fn get_organization(&self, organization_id: i64) -> DomainResult<Organization> {
        self.organizations
            .get_organization(organization_id)
            .await?
            .ok_or(DomainError::OrganizationNotFound(organization_id))
    }

    pub async fn update_organization(
        &self,
        input: UpdateOrganizationInput,
    ) -> DomainResult<Organization> {
        if input.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "organization name cannot be empty".to_string(),
            ));
        }
        self.organizations.update_organization(input).await
    }

    pub async fn delete_organization(&self, organization_id: i64) -> DomainResult<()> {
        self.organizations
            .delete_organization(organization_id)
            .await?;
        info!(organization_id, "Organization deleted");
        Ok(())
    }

    pub async fn create_application(
        &self,
        input: CreateApplicationInput,
    ) -> DomainResult<Application> {
        if input.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "application name cannot be empty".to_string(),
            ));
        }

        // Owning organization must exist before the application does.
        self.get_organization(input.organization_id).await?;

        debug!(name = %input.name, organization_id = input.organization_id, "Creating application");
        let application = self.applications.create_application(input).await?;
        info!(application_id = application.id, "Application created");
        Ok(application)
    }

    pub async fn get_application(&self, application_id: i64) -> DomainResult<Application> {
        self.applications
            .get_application(application_id)
            .await?
            .ok_or(DomainError::ApplicationNotFound(application_id))
    }

    pub async fn update_application(
        &self,
        input: UpdateApplicationInput,
    ) -> DomainResult<Application> {
        if input.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "application name cannot be empty".to_string(),
            ));
        }
        self.applications.update_application(input).await
    }

    pub async fn delete_application(&self, application_id: i64) -> DomainResult<()> {
        self.applications.delete_application(application_id).await?;
        info!(application_id, "Application deleted");
        Ok(())
    }

    pub async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<Device> {
        if input.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "device name cannot be empty".to_string(),
            ));
        }

        self.get_application(input.application_id).await?;

        debug!(dev_eui = %input.dev_eui, application_id = input.application_id, "Creating device");
        let device = self.devices.create_device(input).await?;
        info!(device_id = device.id, dev_eui = %device.dev_eui, "Device created");
        Ok(device)
    }

    pub async fn get_device(&self, device_id: i64) -> DomainResult<Device> {
        self.devices
            .get_device(device_id)
            .await?
            .ok_or(DomainError::DeviceNotFound(device_id))
    }

    pub async fn update_device(&self, input: UpdateDeviceInput) -> DomainResult<Device> {
        if input.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "device name cannot be empty".to_string(),
            ));
        }
        self.devices.update_device(input).await
    }

    pub async fn delete_device(&self, device_id: i64) -> DomainResult<()> {
        self.devices.delete_device(device_id).await?;
        info!(device_id, "Device deleted");
        Ok(())
    }

    pub async fn create_gateway(&self, input: CreateGatewayInput) -> DomainResult<Gateway> {
        if input.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "gateway name cannot be empty".to_string(),
            ));
        }

        self.get_organization(input.organization_id).await?;

        debug!(mac = %input.mac, organization_id = input.organization_id, "Creating gateway");
        let gateway = self.gateways.create_gateway(input).await?;
        info!(gateway_id = gateway.id, mac = %gateway.mac, "Gateway created");
        Ok(gateway)
    }

    pub async fn get_gateway(&self, gateway_id: i64) -> DomainResult<Gateway> {
        self.gateways
            .get_gateway(gateway_id)
            .await?
            .ok_or(DomainError::GatewayNotFound(gateway_id))
    }

    pub async fn update_gateway(&self, input: UpdateGatewayInput) -> DomainResult<Gateway> {
        if input.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "gateway name cannot be empty".to_string(),
            ));
        }
        self.gateways.update_gateway(input).await
    }

    pub async fn delete_gateway(&self, gateway_id: i64) -> DomainResult<()> {
        self.gateways.delete_gateway(gateway_id).await?;
        info!(gateway_id, "Gateway deleted");
        Ok(())
    }

    pub async fn create_user(&self, input: CreateUserInput) -> DomainResult<User> {
        if input.username.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "username cannot be empty".to_string(),
            ));
        }

        debug!(username = %input.username, "Creating user");
        let user = self.users.create_user(input).await?;
        info!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn add_membership(&self, organization_id: i64, user_id: i64) -> DomainResult<()> {
        self.get_organization(organization_id).await?;
        self.users.add_membership(organization_id, user_id).await?;
        info!(organization_id, user_id, "Membership added");
        Ok(())
    }

    pub async fn remove_membership(&self, organization_id: i64, user_id: i64) -> DomainResult<()> {
        self.users
            .remove_membership(organization_id, user_id)
            .await?;
        info!(organization_id, user_id, "Membership removed");
        Ok(())
    }
}
