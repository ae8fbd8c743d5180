use anyhow::anyhow;
use async_trait::async_trait;
use tokio_postgres::Row;
use tracing::debug;

use perch_domain::{
    escape_like, DomainError, DomainResult, Eui, Principal, SearchHit, SearchRepository,
};

use crate::client::PostgresClient;
use crate::errors::map_query_error;

/// One query ranks and merges all four entity kinds: similarity() orders,
/// the escaped ILIKE gate decides inclusion, the EXISTS subquery applies
/// visibility, and ORDER BY score/kind/sort_key makes pagination over the
/// merged set deterministic.
const GLOBAL_SEARCH_QUERY: &str = r#"
    SELECT
        'device'::text AS kind,
        GREATEST(similarity(d.name, $1), similarity(encode(d.dev_eui, 'hex'), $1))::double precision AS score,
        encode(d.dev_eui, 'hex') AS sort_key,
        o.id AS organization_id,
        o.name AS organization_name,
        a.id::bigint AS application_id,
        a.name::text AS application_name,
        d.dev_eui::bytea AS device_dev_eui,
        d.name::text AS device_name,
        NULL::bytea AS gateway_mac,
        NULL::text AS gateway_name
    FROM device d
    INNER JOIN application a
        ON a.id = d.application_id
    INNER JOIN organization o
        ON o.id = a.organization_id
    WHERE
        ($3 OR EXISTS (
            SELECT 1
            FROM organization_user ou
            INNER JOIN "user" u
                ON u.id = ou.user_id
            WHERE ou.organization_id = o.id AND u.username = $4))
        AND (d.name ILIKE $2 OR encode(d.dev_eui, 'hex') ILIKE $2)
    UNION
    SELECT
        'gateway'::text AS kind,
        GREATEST(similarity(g.name, $1), similarity(encode(g.mac, 'hex'), $1))::double precision AS score,
        encode(g.mac, 'hex') AS sort_key,
        o.id AS organization_id,
        o.name AS organization_name,
        NULL::bigint AS application_id,
        NULL::text AS application_name,
        NULL::bytea AS device_dev_eui,
        NULL::text AS device_name,
        g.mac::bytea AS gateway_mac,
        g.name::text AS gateway_name
    FROM gateway g
    INNER JOIN organization o
        ON o.id = g.organization_id
    WHERE
        ($3 OR EXISTS (
            SELECT 1
            FROM organization_user ou
            INNER JOIN "user" u
                ON u.id = ou.user_id
            WHERE ou.organization_id = o.id AND u.username = $4))
        AND (g.name ILIKE $2 OR encode(g.mac, 'hex') ILIKE $2)
    UNION
    SELECT
        'organization'::text AS kind,
        similarity(o.name, $1)::double precision AS score,
        o.id::text AS sort_key,
        o.id AS organization_id,
        o.name AS organization_name,
        NULL::bigint AS application_id,
        NULL::text AS application_name,
        NULL::bytea AS device_dev_eui,
        NULL::text AS device_name,
        NULL::bytea AS gateway_mac,
        NULL::text AS gateway_name
    FROM organization o
    WHERE
        ($3 OR EXISTS (
            SELECT 1
            FROM organization_user ou
            INNER JOIN "user" u
                ON u.id = ou.user_id
            WHERE ou.organization_id = o.id AND u.username = $4))
        AND o.name ILIKE $2
    UNION
    SELECT
        'application'::text AS kind,
        similarity(a.name, $1)::double precision AS score,
        a.id::text AS sort_key,
        o.id AS organization_id,
        o.name AS organization_name,
        a.id::bigint AS application_id,
        a.name::text AS application_name,
        NULL::bytea AS device_dev_eui,
        NULL::text AS device_name,
        NULL::bytea AS gateway_mac,
        NULL::text AS gateway_name
    FROM application a
    INNER JOIN organization o
        ON o.id = a.organization_id
    WHERE
        ($3 OR EXISTS (
            SELECT 1
            FROM organization_user ou
            INNER JOIN "user" u
                ON u.id = ou.user_id
            WHERE ou.organization_id = o.id AND u.username = $4))
        AND a.name ILIKE $2
    ORDER BY
        score DESC,
        kind,
        sort_key
    LIMIT $5
    OFFSET $6"#;

/// PostgreSQL implementation of the cross-entity search contract
#[derive(Clone)]
pub struct PostgresSearchRepository {
    client: PostgresClient,
}

impl PostgresSearchRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchRepository for PostgresSearchRepository {
    async fn global_search(
        &self,
        principal: &Principal,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<SearchHit>> {
        debug!(username = %principal.username, query = %query, "Running global search query");

        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::StoreUnavailable)?;

        let pattern = format!("%{}%", escape_like(query));
        let rows = conn
            .query(
                GLOBAL_SEARCH_QUERY,
                &[
                    &query,
                    &pattern,
                    &principal.is_admin,
                    &principal.username,
                    &limit,
                    &offset,
                ],
            )
            .await
            .map_err(map_query_error)?;

        rows.iter().map(hit_from_row).collect()
    }
}

fn hit_from_row(row: &Row) -> DomainResult<SearchHit> {
    let kind: String = row.get(0);
    let score: f64 = row.get(1);
    let organization_id: i64 = row.get(3);
    let organization_name: String = row.get(4);

    match kind.as_str() {
        "organization" => Ok(SearchHit::Organization {
            score,
            organization_id,
            organization_name,
        }),
        "application" => Ok(SearchHit::Application {
            score,
            organization_id,
            organization_name,
            application_id: require(row.get(5), "application_id")?,
            application_name: require(row.get(6), "application_name")?,
        }),
        "device" => Ok(SearchHit::Device {
            score,
            organization_id,
            organization_name,
            application_id: require(row.get(5), "application_id")?,
            application_name: require(row.get(6), "application_name")?,
            device_eui: eui_from_bytes(require(row.get(7), "device_dev_eui")?)?,
            device_name: require(row.get(8), "device_name")?,
        }),
        "gateway" => Ok(SearchHit::Gateway {
            score,
            organization_id,
            organization_name,
            gateway_mac: eui_from_bytes(require(row.get(9), "gateway_mac")?)?,
            gateway_name: require(row.get(10), "gateway_name")?,
        }),
        other => Err(DomainError::StoreUnavailable(anyhow!(
            "unexpected search result kind: {other}"
        ))),
    }
}

fn require<T>(value: Option<T>, column: &str) -> DomainResult<T> {
    value.ok_or_else(|| {
        DomainError::StoreUnavailable(anyhow!("search row is missing column {column}"))
    })
}

fn eui_from_bytes(bytes: Vec<u8>) -> DomainResult<Eui> {
    Eui::from_slice(&bytes)
        .map_err(|_| DomainError::StoreUnavailable(anyhow!("stored EUI is not 8 bytes")))
}
