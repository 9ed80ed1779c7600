// Area resolution and cache refresh against a wiremock hub.
//
// The socket endpoint points at a closed port, so every registry starts
// from its REST tier.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lumos_api::{Area, Device, EntityRegistration, HubClient, TransportConfig};
use lumos_core::{AreaCache, Resolver};

// ── Helpers ─────────────────────────────────────────────────────────

fn closed_socket_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Url::parse(&format!("ws://127.0.0.1:{port}/api/websocket")).unwrap()
}

fn hub_for(server: &MockServer) -> HubClient {
    HubClient::new(
        Url::parse(&server.uri()).unwrap(),
        SecretString::from("test-token".to_string()),
        &TransportConfig::with_timeout(Duration::from_secs(2)),
    )
    .unwrap()
    .with_websocket_url(closed_socket_url())
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

async fn mount_registries(server: &MockServer, times: u64) {
    mount_json(
        server,
        "/api/config/area_registry",
        json!([
            { "area_id": "kitchen", "name": "Kitchen" },
            { "area_id": "office", "name": "Office" }
        ]),
        times,
    )
    .await;
    mount_json(
        server,
        "/api/config/device_registry",
        json!([
            { "id": "dev1", "area_id": "kitchen", "name": "Hue Bridge" },
            { "id": "dev2", "area_id": null }
        ]),
        times,
    )
    .await;
    mount_json(
        server,
        "/api/config/entity_registry",
        json!([
            { "entity_id": "light.a", "device_id": "dev1", "area_id": null },
            { "entity_id": "light.b", "device_id": "dev1", "area_id": "office" },
            { "entity_id": "switch.c", "device_id": "dev2", "area_id": null }
        ]),
        times,
    )
    .await;
}

// ── Resolution ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_rest_areas_use_second_candidate_after_403() {
    let server = MockServer::start().await;
    let hub = hub_for(&server);

    Mock::given(method("GET"))
        .and(path("/api/config/area_registry"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    mount_json(&server, "/api/areas", json!([{ "area_id": "a1", "name": "Kitchen" }]), 1).await;
    mount_json(&server, "/api/states", json!([]), 0).await;

    let areas = Resolver::new(&hub).resolve::<Area>().await.unwrap();
    assert_eq!(areas, vec![Area::new("a1", "Kitchen")]);
}

#[tokio::test]
async fn test_undecodable_rest_body_advances() {
    let server = MockServer::start().await;
    let hub = hub_for(&server);

    Mock::given(method("GET"))
        .and(path("/api/config/area_registry"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;
    mount_json(&server, "/api/areas", json!([{ "area_id": "a2", "name": "Hall" }]), 1).await;

    let areas = Resolver::new(&hub).resolve::<Area>().await.unwrap();
    assert_eq!(areas, vec![Area::new("a2", "Hall")]);
}

#[tokio::test]
async fn test_missing_device_registry_is_empty_not_error() {
    let server = MockServer::start().await;
    let hub = hub_for(&server);
    mount_status(&server, "/api/config/device_registry", 404).await;

    let devices = Resolver::new(&hub).resolve::<Device>().await.unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_heuristic_fallback_reads_light_and_switch_names() {
    let server = MockServer::start().await;
    let hub = hub_for(&server);

    mount_status(&server, "/api/config/area_registry", 404).await;
    mount_status(&server, "/api/areas", 404).await;
    mount_status(&server, "/api/config/entity_registry", 404).await;
    mount_status(&server, "/api/config/device_registry", 404).await;
    mount_json(
        &server,
        "/api/states",
        json!([
            { "entity_id": "light.lr_lamp", "state": "on",
              "attributes": { "friendly_name": "Living Room Lamp 1" } },
            { "entity_id": "switch.relay", "state": "off",
              "attributes": { "friendly_name": "Sonoff Switch 1" } },
            { "entity_id": "sensor.garage_temp", "state": "12",
              "attributes": { "friendly_name": "Garage Temperature Probe" } }
        ]),
        2,
    )
    .await;

    let cache = AreaCache::new(Duration::from_secs(300));
    cache.ensure_fresh(&hub).await;

    assert_eq!(
        cache.lookup_area("light.lr_lamp").await,
        Some(Area::new("living_room", "Living Room"))
    );
    assert_eq!(cache.lookup_area("switch.relay").await, None);
    // Sensors are never consulted by the heuristic.
    assert_eq!(cache.lookup_area("sensor.garage_temp").await, None);
}

// ── Cache ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_twice_within_ttl_hits_hub_once() {
    let server = MockServer::start().await;
    let hub = hub_for(&server);
    mount_registries(&server, 1).await;

    let cache = AreaCache::new(Duration::from_secs(300));
    cache.ensure_fresh(&hub).await;
    let first = cache.refreshed_at().await.unwrap();
    cache.ensure_fresh(&hub).await;

    assert_eq!(cache.refreshed_at().await, Some(first));
    // Expectations (exactly one call per registry) are verified on drop.
}

#[tokio::test]
async fn test_expired_cache_refreshes_again() {
    let server = MockServer::start().await;
    let hub = hub_for(&server);
    mount_registries(&server, 2).await;

    let cache = AreaCache::new(Duration::ZERO);
    cache.ensure_fresh(&hub).await;
    cache.ensure_fresh(&hub).await;
}

#[tokio::test]
async fn test_lookup_through_device_and_direct_precedence() {
    let server = MockServer::start().await;
    let hub = hub_for(&server);
    mount_registries(&server, 1).await;

    let cache = AreaCache::new(Duration::from_secs(300));
    cache.ensure_fresh(&hub).await;

    assert_eq!(
        cache.lookup_area("light.a").await,
        Some(Area::new("kitchen", "Kitchen"))
    );
    assert_eq!(
        cache.lookup_area("light.b").await,
        Some(Area::new("office", "Office"))
    );
    // dev2 has no area, so switch.c stays unmapped.
    assert_eq!(cache.lookup_area("switch.c").await, None);
}

#[tokio::test]
async fn test_unreachable_registries_degrade_to_empty() {
    let server = MockServer::start().await;
    let hub = hub_for(&server);

    mount_status(&server, "/api/config/area_registry", 500).await;
    mount_status(&server, "/api/areas", 500).await;
    mount_status(&server, "/api/config/device_registry", 500).await;
    mount_status(&server, "/api/config/entity_registry", 500).await;
    mount_status(&server, "/api/states", 500).await;

    let cache = AreaCache::new(Duration::from_secs(300));
    cache.ensure_fresh(&hub).await;

    assert!(cache.refreshed_at().await.is_some());
    assert_eq!(cache.lookup_area("light.a").await, None);
}

#[tokio::test]
async fn test_empty_entity_registry_is_accepted() {
    let server = MockServer::start().await;
    let hub = hub_for(&server);
    mount_json(&server, "/api/config/entity_registry", json!([]), 1).await;
    mount_json(&server, "/api/states", json!([]), 0).await;

    let regs = Resolver::new(&hub)
        .resolve::<EntityRegistration>()
        .await
        .unwrap();
    assert!(regs.is_empty());
}
