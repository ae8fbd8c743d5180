mod application_repository;
mod client;
mod config;
mod device_repository;
mod errors;
mod gateway_repository;
mod organization_repository;
mod schema;
mod search_repository;
mod user_repository;

pub use application_repository::PostgresApplicationRepository;
pub use client::PostgresClient;
pub use config::PostgresConfig;
pub use device_repository::PostgresDeviceRepository;
pub use gateway_repository::PostgresGatewayRepository;
pub use organization_repository::PostgresOrganizationRepository;
pub use schema::apply_schema;
pub use search_repository::PostgresSearchRepository;
pub use user_repository::PostgresUserRepository;
