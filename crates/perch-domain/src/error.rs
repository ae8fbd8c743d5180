use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Closed error taxonomy for the inventory core.
///
/// Every store failure is mapped into one of these variants at the
/// infrastructure boundary; driver error types never cross it.
#[derive(Error, Debug)]
pub enum DomainError {
    /// The store could not be reached or a query failed at the engine
    /// level. Retryable from the caller's point of view.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] anyhow::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller withdrew the request before the store finished.
    #[error("Request cancelled")]
    Cancelled,

    #[error("Organization not found: {0}")]
    OrganizationNotFound(i64),

    #[error("Organization already exists: {0}")]
    OrganizationAlreadyExists(String),

    #[error("Application not found: {0}")]
    ApplicationNotFound(i64),

    #[error("Application already exists: {0}")]
    ApplicationAlreadyExists(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(i64),

    #[error("Device already exists: {0}")]
    DeviceAlreadyExists(String),

    #[error("Gateway not found: {0}")]
    GatewayNotFound(i64),

    #[error("Gateway already exists: {0}")]
    GatewayAlreadyExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Membership already exists: user {user_id} in organization {organization_id}")]
    MembershipAlreadyExists { organization_id: i64, user_id: i64 },

    #[error("Membership not found: user {user_id} in organization {organization_id}")]
    MembershipNotFound { organization_id: i64, user_id: i64 },
}
