use perch_domain::{DomainError, DomainResult};

use crate::client::PostgresClient;
use crate::errors::map_query_error;

/// Inventory schema, applied statement by statement. pg_trgm provides the
/// `similarity()` function the search query ranks with.
const SCHEMA: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS pg_trgm",
    r#"CREATE TABLE IF NOT EXISTS "user" (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )"#,
    "CREATE TABLE IF NOT EXISTS organization (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    r#"CREATE TABLE IF NOT EXISTS organization_user (
        organization_id BIGINT NOT NULL REFERENCES organization (id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL REFERENCES "user" (id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (organization_id, user_id)
    )"#,
    "CREATE TABLE IF NOT EXISTS application (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        organization_id BIGINT NOT NULL REFERENCES organization (id) ON DELETE CASCADE,
        service_profile_id TEXT NOT NULL DEFAULT '',
        service_profile_name TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        UNIQUE (organization_id, name)
    )",
    "CREATE TABLE IF NOT EXISTS device (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        dev_eui BYTEA NOT NULL UNIQUE,
        application_id BIGINT NOT NULL REFERENCES application (id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS gateway (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        mac BYTEA NOT NULL UNIQUE,
        organization_id BIGINT NOT NULL REFERENCES organization (id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
];

/// Applies the inventory schema. Idempotent; used by integration tests and
/// local bootstrap.
pub async fn apply_schema(client: &PostgresClient) -> DomainResult<()> {
    let conn = client
        .get_connection()
        .await
        .map_err(DomainError::StoreUnavailable)?;

    for statement in SCHEMA {
        conn.execute(*statement, &[])
            .await
            .map_err(map_query_error)?;
    }
    Ok(())
}
