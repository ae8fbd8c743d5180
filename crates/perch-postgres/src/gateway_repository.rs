use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tokio_postgres::Row;
use tracing::{debug, info};

use perch_domain::{
    escape_like, CreateGatewayInput, DomainError, DomainResult, Eui, Gateway, GatewayRepository,
    ListScope, UpdateGatewayInput,
};

use crate::client::PostgresClient;
use crate::errors::{is_unique_violation, map_query_error};

/// PostgreSQL implementation of GatewayRepository
#[derive(Clone)]
pub struct PostgresGatewayRepository {
    client: PostgresClient,
}

impl PostgresGatewayRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

const COLUMNS: &str = "g.id, g.name, g.mac, g.organization_id, g.created_at, g.updated_at";

fn gateway_from_row(row: &Row) -> DomainResult<Gateway> {
    let mac_bytes: Vec<u8> = row.get(2);
    Ok(Gateway {
        id: row.get(0),
        name: row.get(1),
        mac: Eui::from_slice(&mac_bytes)
            .map_err(|_| DomainError::StoreUnavailable(anyhow!("stored MAC is not 8 bytes")))?,
        organization_id: row.get(3),
        created_at: Some(row.get(4)),
        updated_at: Some(row.get(5)),
    })
}

const LIST_WHERE: &str = r#"
    ($1 OR EXISTS (
        SELECT 1
        FROM organization_user ou
        INNER JOIN "user" u
            ON u.id = ou.user_id
        WHERE ou.organization_id = g.organization_id AND u.username = $2))
    AND ($3::bigint IS NULL OR g.organization_id = $3)
    AND ($4::text IS NULL OR g.name ILIKE $4)"#;

#[async_trait]
impl GatewayRepository for PostgresGatewayRepository {
    async fn create_gateway(&self, input: CreateGatewayInput) -> DomainResult<Gateway> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let mac_bytes = input.mac.as_bytes().to_vec();
        let result = conn
            .query_one(
                "INSERT INTO gateway (name, mac, organization_id, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $4)
                 RETURNING id",
                &[&input.name, &mac_bytes, &input.organization_id, &now],
            )
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(DomainError::GatewayAlreadyExists(input.mac.to_hex()));
            }
            Err(e) => return Err(map_query_error(e)),
        };

        let gateway = Gateway {
            id: row.get(0),
            name: input.name,
            mac: input.mac,
            organization_id: input.organization_id,
            created_at: Some(now),
            updated_at: Some(now),
        };
        info!(gateway_id = gateway.id, mac = %gateway.mac, "Gateway created in database");
        Ok(gateway)
    }

    async fn get_gateway(&self, gateway_id: i64) -> DomainResult<Option<Gateway>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let query = format!("SELECT {COLUMNS} FROM gateway g WHERE g.id = $1");
        let row = conn
            .query_opt(&query, &[&gateway_id])
            .await
            .map_err(map_query_error)?;

        row.as_ref().map(gateway_from_row).transpose()
    }

    async fn update_gateway(&self, input: UpdateGatewayInput) -> DomainResult<Gateway> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let row = conn
            .query_opt(
                "UPDATE gateway
                 SET name = $2, updated_at = $3
                 WHERE id = $1
                 RETURNING id, name, mac, organization_id, created_at, updated_at",
                &[&input.gateway_id, &input.name, &now],
            )
            .await
            .map_err(map_query_error)?;

        match row {
            Some(row) => {
                info!(gateway_id = input.gateway_id, "Gateway updated in database");
                gateway_from_row(&row)
            }
            None => Err(DomainError::GatewayNotFound(input.gateway_id)),
        }
    }

    async fn delete_gateway(&self, gateway_id: i64) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let rows_affected = conn
            .execute("DELETE FROM gateway WHERE id = $1", &[&gateway_id])
            .await
            .map_err(map_query_error)?;

        if rows_affected == 0 {
            return Err(DomainError::GatewayNotFound(gateway_id));
        }

        info!(gateway_id, "Gateway deleted from database");
        Ok(())
    }

    async fn list_gateways(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Gateway>> {
        debug!(username = %scope.principal.username, "Listing gateways from database");

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
             FROM gateway g
             WHERE {LIST_WHERE}
             ORDER BY g.name, g.id
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

        rows.iter().map(gateway_from_row).collect()
    }

    async fn count_gateways(&self, scope: &ListScope) -> DomainResult<i64> {
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
             FROM gateway g
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
