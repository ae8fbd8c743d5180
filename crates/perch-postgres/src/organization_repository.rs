use async_trait::async_trait;
use chrono::Utc;
use tokio_postgres::Row;
use tracing::{debug, info};

use perch_domain::{
    escape_like, CreateOrganizationInput, DomainError, DomainResult, ListScope, Organization,
    OrganizationRepository, UpdateOrganizationInput,
};

use crate::client::PostgresClient;
use crate::errors::{is_unique_violation, map_query_error};

/// PostgreSQL implementation of OrganizationRepository
#[derive(Clone)]
pub struct PostgresOrganizationRepository {
    client: PostgresClient,
}

impl PostgresOrganizationRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

fn organization_from_row(row: &Row) -> Organization {
    Organization {
        id: row.get(0),
        name: row.get(1),
        created_at: Some(row.get(2)),
        updated_at: Some(row.get(3)),
    }
}

// Visibility and filter predicates are one WHERE shape shared verbatim by
// the listing and the count, so the two can never diverge.
const LIST_WHERE: &str = r#"
    ($1 OR EXISTS (
        SELECT 1
        FROM organization_user ou
        INNER JOIN "user" u
            ON u.id = ou.user_id
        WHERE ou.organization_id = o.id AND u.username = $2))
    AND ($3::bigint IS NULL OR o.id = $3)
    AND ($4::text IS NULL OR o.name ILIKE $4)"#;

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn create_organization(
        &self,
        input: CreateOrganizationInput,
    ) -> DomainResult<Organization> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let result = conn
            .query_one(
                "INSERT INTO organization (name, created_at, updated_at)
                 VALUES ($1, $2, $2)
                 RETURNING id",
                &[&input.name, &now],
            )
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(DomainError::OrganizationAlreadyExists(input.name));
            }
            Err(e) => return Err(map_query_error(e)),
        };

        let organization = Organization {
            id: row.get(0),
            name: input.name,
            created_at: Some(now),
            updated_at: Some(now),
        };
        info!(organization_id = organization.id, "Organization created in database");
        Ok(organization)
    }

    async fn get_organization(&self, organization_id: i64) -> DomainResult<Option<Organization>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let row = conn
            .query_opt(
                "SELECT id, name, created_at, updated_at
                 FROM organization
                 WHERE id = $1",
                &[&organization_id],
            )
            .await
            .map_err(map_query_error)?;

        Ok(row.as_ref().map(organization_from_row))
    }

    async fn update_organization(
        &self,
        input: UpdateOrganizationInput,
    ) -> DomainResult<Organization> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let result = conn
            .query_opt(
                "UPDATE organization
                 SET name = $2, updated_at = $3
                 WHERE id = $1
                 RETURNING id, name, created_at, updated_at",
                &[&input.organization_id, &input.name, &now],
            )
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(DomainError::OrganizationAlreadyExists(input.name));
            }
            Err(e) => return Err(map_query_error(e)),
        };

        match row {
            Some(row) => {
                info!(organization_id = input.organization_id, "Organization updated in database");
                Ok(organization_from_row(&row))
            }
            None => Err(DomainError::OrganizationNotFound(input.organization_id)),
        }
    }

    async fn delete_organization(&self, organization_id: i64) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let rows_affected = conn
            .execute("DELETE FROM organization WHERE id = $1", &[&organization_id])
            .await
            .map_err(map_query_error)?;

        if rows_affected == 0 {
            return Err(DomainError::OrganizationNotFound(organization_id));
        }

        info!(organization_id, "Organization deleted from database");
        Ok(())
    }

    async fn list_organizations(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Organization>> {
        debug!(username = %scope.principal.username, "Listing organizations from database");

        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let pattern = scope
            .name_filter
            .as_deref()
            .map(|f| format!("%{}%", escape_like(f)));
        let query = format!(
            "SELECT o.id, o.name, o.created_at, o.updated_at
             FROM organization o
             WHERE {LIST_WHERE}
             ORDER BY o.name, o.id
             LIMIT $5 OFFSET $6"
        );

        let rows = conn
            .query(
                &query,
                &[
                    &scope.principal.is_admin,
                    &scope.principal.username,
                    &scope.organization_id,
                    &pattern,
                    &limit,
                    &offset,
                ],
            )
            .await
            .map_err(map_query_error)?;

        Ok(rows.iter().map(organization_from_row).collect())
    }

    async fn count_organizations(&self, scope: &ListScope) -> DomainResult<i64> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let pattern = scope
            .name_filter
            .as_deref()
            .map(|f| format!("%{}%", escape_like(f)));
        let query = format!(
            "SELECT COUNT(*)
             FROM organization o
             WHERE {LIST_WHERE}"
        );

        let row = conn
            .query_one(
                &query,
                &[
                    &scope.principal.is_admin,
                    &scope.principal.username,
                    &scope.organization_id,
                    &pattern,
                ],
            )
            .await
            .map_err(map_query_error)?;

        Ok(row.get(0))
    }
}
