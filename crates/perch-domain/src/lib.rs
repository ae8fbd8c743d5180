pub mod application;
pub mod device;
pub mod error;
pub mod eui;
pub mod gateway;
pub mod in_memory;
pub mod inventory_service;
pub mod organization;
pub mod provisioning_service;
pub mod repository;
pub mod search;
pub mod search_service;
pub mod similarity;
pub mod user;

pub use application::*;
pub use device::*;
pub use error::{DomainError, DomainResult};
pub use eui::Eui;
pub use gateway::*;
pub use in_memory::InMemoryInventory;
pub use inventory_service::InventoryService;
pub use organization::*;
pub use provisioning_service::ProvisioningService;
pub use repository::{
    ApplicationRepository, DeviceRepository, GatewayRepository, OrganizationRepository,
    SearchRepository, UserRepository,
};
pub use search::*;
pub use search_service::SearchService;
pub use similarity::similarity;
pub use user::*;
