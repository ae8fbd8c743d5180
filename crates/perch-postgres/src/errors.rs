use perch_domain::DomainError;
use tokio_postgres::error::SqlState;

/// Maps a driver error into the domain taxonomy. The error kind is always
/// preserved so callers can tell "try again" (StoreUnavailable) from
/// "abandon" (Cancelled) from "fix the request" (InvalidArgument).
pub(crate) fn map_query_error(err: tokio_postgres::Error) -> DomainError {
    if let Some(db_err) = err.as_db_error() {
        if db_err.code() == &SqlState::QUERY_CANCELED {
            return DomainError::Cancelled;
        }
        if db_err.code() == &SqlState::FOREIGN_KEY_VIOLATION {
            return DomainError::InvalidArgument(db_err.message().to_string());
        }
    }
    DomainError::StoreUnavailable(err.into())
}

/// Unique violations carry entity context only the call site has, so they
/// are checked there and mapped to the matching AlreadyExists variant.
pub(crate) fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.as_db_error()
        .map(|db_err| db_err.code() == &SqlState::UNIQUE_VIOLATION)
        .unwrap_or(false)
}
