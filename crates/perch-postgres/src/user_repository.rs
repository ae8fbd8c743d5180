use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use perch_domain::{CreateUserInput, DomainError, DomainResult, User, UserRepository};

use crate::client::PostgresClient;
use crate::errors::{is_unique_violation, map_query_error};

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PostgresUserRepository {
    client: PostgresClient,
}

impl PostgresUserRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_user(&self, input: CreateUserInput) -> DomainResult<User> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let result = conn
            .query_one(
                r#"INSERT INTO "user" (username, is_admin, created_at, updated_at)
                   VALUES ($1, $2, $3, $3)
                   RETURNING id"#,
                &[&input.username, &input.is_admin, &now],
            )
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(DomainError::UserAlreadyExists(input.username));
            }
            Err(e) => return Err(map_query_error(e)),
        };

        let user = User {
            id: row.get(0),
            username: input.username,
            is_admin: input.is_admin,
            created_at: Some(now),
            updated_at: Some(now),
        };
        info!(user_id = user.id, username = %user.username, "User created in database");
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let row = conn
            .query_opt(
                r#"SELECT id, username, is_admin, created_at, updated_at
                   FROM "user"
                   WHERE username = $1"#,
                &[&username],
            )
            .await
            .map_err(map_query_error)?;

        Ok(row.map(|row| User {
            id: row.get(0),
            username: row.get(1),
            is_admin: row.get(2),
            created_at: Some(row.get(3)),
            updated_at: Some(row.get(4)),
        }))
    }

    async fn add_membership(&self, organization_id: i64, user_id: i64) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let now = Utc::now();
        let result = conn
            .execute(
                "INSERT INTO organization_user (organization_id, user_id, created_at)
                 VALUES ($1, $2, $3)",
                &[&organization_id, &user_id, &now],
            )
            .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(DomainError::MembershipAlreadyExists {
                    organization_id,
                    user_id,
                });
            }
            return Err(map_query_error(e));
        }

        info!(organization_id, user_id, "Membership added in database");
        Ok(())
    }

    async fn remove_membership(&self, organization_id: i64, user_id: i64) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let rows_affected = conn
            .execute(
                "DELETE FROM organization_user
                 WHERE organization_id = $1 AND user_id = $2",
                &[&organization_id, &user_id],
            )
            .await
            .map_err(map_query_error)?;

        if rows_affected == 0 {
            return Err(DomainError::MembershipNotFound {
                organization_id,
                user_id,
            });
        }

        info!(organization_id, user_id, "Membership removed from database");
        Ok(())
    }
}
