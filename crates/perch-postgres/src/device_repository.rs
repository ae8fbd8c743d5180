use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tokio_postgres::Row;
use tracing::{debug, info};

use perch_domain::{
    escape_like, CreateDeviceInput, Device, DeviceRepository, DomainError, DomainResult, Eui,
    ListScope, UpdateDeviceInput,
};

use crate::client::PostgresClient;
use crate::errors::{is_unique_violation, map_query_error};

/// PostgreSQL implementation of DeviceRepository
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

const COLUMNS: &str = "d.id, d.name, d.dev_eui, d.application_id, d.created_at, d.updated_at";

fn device_from_row(row: &Row) -> DomainResult<Device> {
    let eui_bytes: Vec<u8> = row.get(2);
    Ok(Device {
        id: row.get(0),
        name: row.get(1),
        dev_eui: Eui::from_slice(&eui_bytes)
            .map_err(|_| DomainError::StoreUnavailable(anyhow!("stored EUI is not 8 bytes")))?,
        application_id: row.get(3),
        created_at: Some(row.get(4)),
        updated_at: Some(row.get(5)),
    })
}

// Device visibility resolves transitively through the owning application's
// organization.
const LIST_WHERE: &str = r#"
    ($1 OR EXISTS (
        SELECT 1
        FROM organization_user ou
        INNER JOIN "user" u
            ON u.id = ou.user_id
        WHERE ou.organization_id = a.organization_id AND u.username = $2))
    AND ($3::bigint IS NULL OR a.organization_id = $3)
    AND ($4::text IS NULL OR d.name ILIKE $4)"#;

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let eui_bytes = input.dev_eui.as_bytes().to_vec();
        let result = conn
            .query_one(
                "INSERT INTO device (name, dev_eui, application_id, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $4)
                 RETURNING id",
                &[&input.name, &eui_bytes, &input.application_id, &now],
            )
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(DomainError::DeviceAlreadyExists(input.dev_eui.to_hex()));
            }
            Err(e) => return Err(map_query_error(e)),
        };

        let device = Device {
            id: row.get(0),
            name: input.name,
            dev_eui: input.dev_eui,
            application_id: input.application_id,
            created_at: Some(now),
            updated_at: Some(now),
        };
        info!(device_id = device.id, dev_eui = %device.dev_eui, "Device created in database");
        Ok(device)
    }

    async fn get_device(&self, device_id: i64) -> DomainResult<Option<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let query = format!("SELECT {COLUMNS} FROM device d WHERE d.id = $1");
        let row = conn
            .query_opt(&query, &[&device_id])
            .await
            .map_err(map_query_error)?;

        row.as_ref().map(device_from_row).transpose()
    }

    async fn update_device(&self, input: UpdateDeviceInput) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let row = conn
            .query_opt(
                "UPDATE device
                 SET name = $2, updated_at = $3
                 WHERE id = $1
                 RETURNING id, name, dev_eui, application_id, created_at, updated_at",
                &[&input.device_id, &input.name, &now],
            )
            .await
            .map_err(map_query_error)?;

        match row {
            Some(row) => {
                info!(device_id = input.device_id, "Device updated in database");
                device_from_row(&row)
            }
            None => Err(DomainError::DeviceNotFound(input.device_id)),
        }
    }

    async fn delete_device(&self, device_id: i64) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let rows_affected = conn
            .execute("DELETE FROM device WHERE id = $1", &[&device_id])
            .await
            .map_err(map_query_error)?;

        if rows_affected == 0 {
            return Err(DomainError::DeviceNotFound(device_id));
        }

        info!(device_id, "Device deleted from database");
        Ok(())
    }

    async fn list_devices(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Device>> {
        debug!(username = %scope.principal.username, "Listing devices from database");

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
             FROM device d
             INNER JOIN application a
                 ON a.id = d.application_id
             WHERE {LIST_WHERE}
             ORDER BY d.name, d.id
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

        rows.iter().map(device_from_row).collect()
    }

    async fn count_devices(&self, scope: &ListScope) -> DomainResult<i64> {
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
             FROM device d
             INNER JOIN application a
                 ON a.id = d.application_id
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
