use async_trait::async_trait;
use chrono::Utc;
use tokio_postgres::Row;
use tracing::{debug, info};

use perch_domain::{
    escape_like, Application, ApplicationRepository, CreateApplicationInput, DomainError,
    DomainResult, ListScope, UpdateApplicationInput,
};

use crate::client::PostgresClient;
use crate::errors::{is_unique_violation, map_query_error};

/// PostgreSQL implementation of ApplicationRepository
#[derive(Clone)]
pub struct PostgresApplicationRepository {
    client: PostgresClient,
}

impl PostgresApplicationRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

const COLUMNS: &str = "a.id, a.name, a.description, a.organization_id, a.service_profile_id, \
                       a.service_profile_name, a.created_at, a.updated_at";

fn application_from_row(row: &Row) -> Application {
    Application {
        id: row.get(0),
        name: row.get(1),
        description: row.get(2),
        organization_id: row.get(3),
        service_profile_id: row.get(4),
        service_profile_name: row.get(5),
        created_at: Some(row.get(6)),
        updated_at: Some(row.get(7)),
    }
}

const LIST_WHERE: &str = r#"
    ($1 OR EXISTS (
        SELECT 1
        FROM organization_user ou
        INNER JOIN "user" u
            ON u.id = ou.user_id
        WHERE ou.organization_id = a.organization_id AND u.username = $2))
    AND ($3::bigint IS NULL OR a.organization_id = $3)
    AND ($4::text IS NULL OR a.name ILIKE $4)"#;

#[async_trait]
impl ApplicationRepository for PostgresApplicationRepository {
    async fn create_application(&self, input: CreateApplicationInput) -> DomainResult<Application> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let result = conn
            .query_one(
                "INSERT INTO application
                     (name, description, organization_id, service_profile_id, service_profile_name, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $6)
                 RETURNING id",
                &[
                    &input.name,
                    &input.description,
                    &input.organization_id,
                    &input.service_profile_id,
                    &input.service_profile_name,
                    &now,
                ],
            )
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(DomainError::ApplicationAlreadyExists(input.name));
            }
            Err(e) => return Err(map_query_error(e)),
        };

        let application = Application {
            id: row.get(0),
            name: input.name,
            description: input.description,
            organization_id: input.organization_id,
            service_profile_id: input.service_profile_id,
            service_profile_name: input.service_profile_name,
            created_at: Some(now),
            updated_at: Some(now),
        };
        info!(application_id = application.id, "Application created in database");
        Ok(application)
    }

    async fn get_application(&self, application_id: i64) -> DomainResult<Option<Application>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let query = format!("SELECT {COLUMNS} FROM application a WHERE a.id = $1");
        let row = conn
            .query_opt(&query, &[&application_id])
            .await
            .map_err(map_query_error)?;

        Ok(row.as_ref().map(application_from_row))
    }

    async fn update_application(&self, input: UpdateApplicationInput) -> DomainResult<Application> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let result = conn
            .query_opt(
                "UPDATE application
                 SET name = $2, description = $3, service_profile_id = $4,
                     service_profile_name = $5, updated_at = $6
                 WHERE id = $1
                 RETURNING id, name, description, organization_id, service_profile_id,
                           service_profile_name, created_at, updated_at",
                &[
                    &input.application_id,
                    &input.name,
                    &input.description,
                    &input.service_profile_id,
                    &input.service_profile_name,
                    &now,
                ],
            )
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(DomainError::ApplicationAlreadyExists(input.name));
            }
            Err(e) => return Err(map_query_error(e)),
        };

        match row {
            Some(row) => {
                info!(application_id = input.application_id, "Application updated in database");
                Ok(application_from_row(&row))
            }
            None => Err(DomainError::ApplicationNotFound(input.application_id)),
        }
    }

    async fn delete_application(&self, application_id: i64) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let rows_affected = conn
            .execute("DELETE FROM application WHERE id = $1", &[&application_id])
            .await
            .map_err(map_query_error)?;

        if rows_affected == 0 {
            return Err(DomainError::ApplicationNotFound(application_id));
        }

        info!(application_id, "Application deleted from database");
        Ok(())
    }

    async fn list_applications(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Application>> {
        debug!(username = %scope.principal.username, "Listing applications from database");

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
            "SELECT {COLUMNS}
             FROM application a
             WHERE {LIST_WHERE}
             ORDER BY a.name, a.id
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

        Ok(rows.iter().map(application_from_row).collect())
    }

    async fn count_applications(&self, scope: &ListScope) -> DomainResult<i64> {
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
             FROM application a
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
