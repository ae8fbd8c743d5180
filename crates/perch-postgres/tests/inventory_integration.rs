#![cfg(feature = "integration-tests")]

use std::time::Duration;

use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

use perch_domain::{
    CreateApplicationInput, CreateDeviceInput, CreateGatewayInput, CreateOrganizationInput,
    CreateUserInput, ApplicationRepository, DeviceRepository, DomainError, GatewayRepository,
    ListScope, OrganizationRepository, Principal, SearchHit, SearchRepository, UserRepository,
};
use perch_postgres::{
    apply_schema, PostgresApplicationRepository, PostgresClient, PostgresConfig,
    PostgresDeviceRepository, PostgresGatewayRepository, PostgresOrganizationRepository,
    PostgresSearchRepository, PostgresUserRepository,
};

async fn setup_test_db() -> (ContainerAsync<GenericImage>, PostgresClient) {
    let postgres = GenericImage::new("postgres", "16-alpine")
        .with_wait_for(testcontainers::core::WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_exposed_port(5432.into())
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .start()
        .await
        .unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let config = PostgresConfig {
        host: host.to_string(),
        port,
        database: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        max_pool_size: 5,
    };
    let client = PostgresClient::new(&config).expect("Failed to create client");

    // The container reports readiness once during initdb and once for
    // real; retry until the server actually accepts connections.
    for attempt in 0.. {
        match client.ping().await {
            Ok(()) => break,
            Err(_) if attempt < 30 => tokio::time::sleep(Duration::from_millis(500)).await,
            Err(e) => panic!("database never became ready: {e}"),
        }
    }

    apply_schema(&client).await.expect("Schema apply failed");

    (postgres, client)
}

struct Fixture {
    org_a: i64,
    org_b: i64,
}

/// Org A: member alice, application "weather-app", device
/// "weather-station-1", gateway "gateway1". Org B: gateway "gw-alpha", no
/// members.
async fn seed(client: &PostgresClient) -> Fixture {
    let orgs = PostgresOrganizationRepository::new(client.clone());
    let users = PostgresUserRepository::new(client.clone());
    let apps = PostgresApplicationRepository::new(client.clone());
    let devices = PostgresDeviceRepository::new(client.clone());
    let gateways = PostgresGatewayRepository::new(client.clone());

    let org_a = orgs
        .create_organization(CreateOrganizationInput {
            name: "org-a".to_string(),
        })
        .await
        .unwrap()
        .id;
    let org_b = orgs
        .create_organization(CreateOrganizationInput {
            name: "org-b".to_string(),
        })
        .await
        .unwrap()
        .id;

    let alice = users
        .create_user(CreateUserInput {
            username: "alice".to_string(),
            is_admin: false,
        })
        .await
        .unwrap();
    users.add_membership(org_a, alice.id).await.unwrap();

    let weather_app = apps
        .create_application(CreateApplicationInput {
            name: "weather-app".to_string(),
            description: "weather sensors".to_string(),
            organization_id: org_a,
            service_profile_id: "sp-1".to_string(),
            service_profile_name: "default".to_string(),
        })
        .await
        .unwrap();

    devices
        .create_device(CreateDeviceInput {
            name: "weather-station-1".to_string(),
            dev_eui: "0102030405060708".parse().unwrap(),
            application_id: weather_app.id,
        })
        .await
        .unwrap();

    gateways
        .create_gateway(CreateGatewayInput {
            name: "gateway1".to_string(),
            mac: "aabbccdd00112233".parse().unwrap(),
            organization_id: org_a,
        })
        .await
        .unwrap();
    gateways
        .create_gateway(CreateGatewayInput {
            name: "gw-alpha".to_string(),
            mac: "ffeeddccbbaa9988".parse().unwrap(),
            organization_id: org_b,
        })
        .await
        .unwrap();

    Fixture { org_a, org_b }
}

#[tokio::test]
async fn test_global_search_visibility_and_ranking() {
    let (_container, client) = setup_test_db().await;
    let fixture = seed(&client).await;
    let search = PostgresSearchRepository::new(client.clone());

    // Member search stays inside her organizations.
    let alice = Principal::new("alice", false);
    let hits = search.global_search(&alice, "weather", 10, 0).await.unwrap();
    assert_eq!(hits.len(), 2);
    for hit in &hits {
        assert_eq!(hit.organization_id(), fixture.org_a);
    }
    for pair in hits.windows(2) {
        assert!(pair[0].score() >= pair[1].score());
    }

    // Admin search needs no membership rows at all.
    let bob = Principal::new("bob", true);
    let hits = search.global_search(&bob, "gw-alpha", 10, 0).await.unwrap();
    assert_eq!(hits.len(), 1);
    match &hits[0] {
        SearchHit::Gateway {
            organization_id,
            gateway_name,
            score,
            ..
        } => {
            assert_eq!(*organization_id, fixture.org_b);
            assert_eq!(gateway_name, "gw-alpha");
            assert!(*score > 0.0);
        }
        other => panic!("expected gateway hit, got {other:?}"),
    }

    // Case-insensitive gate.
    let hits = search.global_search(&alice, "GATEWAY1", 10, 0).await.unwrap();
    assert_eq!(hits.len(), 1);

    // Hardware identifier hex is searchable.
    let hits = search
        .global_search(&alice, "0102030405060708", 10, 0)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(matches!(hits[0], SearchHit::Device { .. }));
}

#[tokio::test]
async fn test_global_search_pagination_composes() {
    let (_container, client) = setup_test_db().await;
    seed(&client).await;
    let search = PostgresSearchRepository::new(client.clone());
    let bob = Principal::new("bob", true);

    // Empty query puts every row at the similarity floor; pages must still
    // compose exactly thanks to the kind/sort_key tie-break.
    let all = search.global_search(&bob, "", 100, 0).await.unwrap();
    assert_eq!(all.len(), 6);

    let first = search.global_search(&bob, "", 3, 0).await.unwrap();
    let second = search.global_search(&bob, "", 3, 3).await.unwrap();
    let mut paged = first;
    paged.extend(second);
    assert_eq!(paged, all);
}

#[tokio::test]
async fn test_scoped_listing_and_count_agree() {
    let (_container, client) = setup_test_db().await;
    let fixture = seed(&client).await;
    let gateways = PostgresGatewayRepository::new(client.clone());
    let apps = PostgresApplicationRepository::new(client.clone());

    // Non-admin, no restriction: union of alice's organizations.
    let scope = ListScope::new(Principal::new("alice", false));
    let items = gateways.list_gateways(&scope, 10, 0).await.unwrap();
    let count = gateways.count_gateways(&scope).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(count, 1);
    assert_eq!(items[0].name, "gateway1");

    // Non-admin, foreign organization: nothing.
    let scope = ListScope::new(Principal::new("alice", false)).organization(fixture.org_b);
    assert!(gateways.list_gateways(&scope, 10, 0).await.unwrap().is_empty());
    assert_eq!(gateways.count_gateways(&scope).await.unwrap(), 0);

    // Admin, no restriction and admin, specific organization.
    let scope = ListScope::new(Principal::new("bob", true));
    assert_eq!(gateways.count_gateways(&scope).await.unwrap(), 2);
    let scope = ListScope::new(Principal::new("bob", true)).organization(fixture.org_b);
    let items = gateways.list_gateways(&scope, 10, 0).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "gw-alpha");

    // Substring filter is case-insensitive and applies to both sides.
    let scope = ListScope::new(Principal::new("alice", false)).name_filter("WEATHER");
    let items = apps.list_applications(&scope, 10, 0).await.unwrap();
    let count = apps.count_applications(&scope).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(count, 1);

    // A literal % in the filter must not act as a wildcard.
    let scope = ListScope::new(Principal::new("bob", true)).name_filter("%");
    assert_eq!(apps.count_applications(&scope).await.unwrap(), 0);
}

#[tokio::test]
async fn test_error_mapping_at_the_boundary() {
    let (_container, client) = setup_test_db().await;
    let fixture = seed(&client).await;
    let orgs = PostgresOrganizationRepository::new(client.clone());
    let apps = PostgresApplicationRepository::new(client.clone());
    let devices = PostgresDeviceRepository::new(client.clone());

    // Unique violation surfaces as AlreadyExists.
    let result = orgs
        .create_organization(CreateOrganizationInput {
            name: "org-a".to_string(),
        })
        .await;
    assert!(matches!(
        result,
        Err(DomainError::OrganizationAlreadyExists(_))
    ));

    // A second application under the same name and organization trips the
    // per-organization unique constraint.
    let result = apps
        .create_application(CreateApplicationInput {
            name: "weather-app".to_string(),
            description: String::new(),
            organization_id: fixture.org_a,
            service_profile_id: String::new(),
            service_profile_name: String::new(),
        })
        .await;
    assert!(matches!(
        result,
        Err(DomainError::ApplicationAlreadyExists(_))
    ));

    // Foreign-key violation surfaces as InvalidArgument.
    let result = apps
        .create_application(CreateApplicationInput {
            name: "orphan".to_string(),
            description: String::new(),
            organization_id: 424242,
            service_profile_id: String::new(),
            service_profile_name: String::new(),
        })
        .await;
    assert!(matches!(result, Err(DomainError::InvalidArgument(_))));

    // Missing rows surface as NotFound.
    let result = devices.delete_device(424242).await;
    assert!(matches!(result, Err(DomainError::DeviceNotFound(424242))));
}
