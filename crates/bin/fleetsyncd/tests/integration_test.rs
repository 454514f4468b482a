//! End-to-end smoke tests for the full fleetsyncd stack.
//!
//! Each test spins up the complete application (in-memory `SQLite`, real
//! store, real registry and broadcaster, real axum router) and exercises the
//! HTTP layer via `tower::ServiceExt::oneshot`, without binding a TCP port.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use fleetsync_adapter_http_axum::router;
use fleetsync_adapter_http_axum::state::AppState;
use fleetsync_adapter_simulator::{MutationSimulator, SimulatorConfig};
use fleetsync_adapter_storage_sqlite_sqlx::{Config, SqliteDeviceStore};
use fleetsync_app::broadcaster::{BroadcastMode, BroadcasterConfig, RealtimeBroadcaster};
use fleetsync_app::services::device_registry::DeviceRegistry;
use fleetsync_domain::device::DeviceType;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

struct Stack {
    registry: Arc<DeviceRegistry<SqliteDeviceStore>>,
    broadcaster: Arc<RealtimeBroadcaster<SqliteDeviceStore>>,
}

impl Stack {
    /// Build a fully-wired stack backed by an in-memory `SQLite` database.
    async fn new(mode: BroadcastMode) -> Self {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .expect("in-memory database should initialise");
        let store = db.device_store();

        let registry = Arc::new(DeviceRegistry::new(store.clone()));
        let broadcaster = Arc::new(RealtimeBroadcaster::new(
            Arc::clone(&registry),
            store,
            BroadcasterConfig {
                mode,
                seed: Some(11),
                ..BroadcasterConfig::default()
            },
        ));
        Self {
            registry,
            broadcaster,
        }
    }

    fn app(&self) -> axum::Router {
        router::build(AppState::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.broadcaster),
        ))
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

fn test_car() -> Value {
    json!({
        "type": "car",
        "name": "Test Car",
        "sensors": [{ "name": "Battery Level", "value": "90%" }]
    })
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let stack = Stack::new(BroadcastMode::Bypass).await;
    let resp = stack
        .app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Device CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_create_then_fetch_device() {
    let stack = Stack::new(BroadcastMode::Bypass).await;

    let (status, body) = stack.send("POST", "/api/devices", Some(test_car())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["type"], "car");
    assert_eq!(body["data"]["name"], "Test Car");
    assert_eq!(body["data"]["sensors"][0]["value"], "90%");
    assert_eq!(body["data"]["createdAt"], body["data"]["updatedAt"]);

    let id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, body) = stack.send("GET", &format!("/api/devices/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, body) = stack.send("GET", "/api/devices", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn should_reject_invalid_type_and_persist_nothing() {
    let stack = Stack::new(BroadcastMode::Bypass).await;

    let (status, body) = stack
        .send(
            "POST",
            "/api/devices",
            Some(json!({ "type": "spaceship", "name": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid device type");

    let (_, body) = stack.send("GET", "/api/devices", None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn should_return_conflict_for_duplicate_name() {
    let stack = Stack::new(BroadcastMode::Bypass).await;
    stack.send("POST", "/api/devices", Some(test_car())).await;

    let (status, body) = stack.send("POST", "/api/devices", Some(test_car())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");

    let (_, body) = stack.send("GET", "/api/devices", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn should_distinguish_malformed_id_from_missing_device() {
    let stack = Stack::new(BroadcastMode::Bypass).await;

    let (status, body) = stack
        .send("PUT", "/api/devices/invalid-id", Some(test_car()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid device ID format: invalid-id");

    let (status, _) = stack
        .send(
            "PUT",
            "/api/devices/6f1c2a4e-9b7d-4c1e-8a3f-2d5e6b7c8d9e",
            Some(test_car()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_apply_partial_update() {
    let stack = Stack::new(BroadcastMode::Bypass).await;
    let (_, created) = stack.send("POST", "/api/devices", Some(test_car())).await;
    let id = created["data"]["id"].as_str().unwrap();

    let (status, body) = stack
        .send(
            "PUT",
            &format!("/api/devices/{id}"),
            Some(json!({ "name": "Updated Car" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Updated Car");
    assert_eq!(body["data"]["type"], "car");
    assert_eq!(body["data"]["sensors"], created["data"]["sensors"]);
    assert_eq!(body["data"]["createdAt"], created["data"]["createdAt"]);
}

#[tokio::test]
async fn should_delete_once_then_return_not_found() {
    let stack = Stack::new(BroadcastMode::Bypass).await;
    let (_, created) = stack.send("POST", "/api/devices", Some(test_car())).await;
    let uri = format!("/api/devices/{}", created["data"]["id"].as_str().unwrap());

    let (status, body) = stack.send("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Device deleted successfully");
    assert_eq!(body["data"]["name"], "Test Car");

    let (status, _) = stack.send("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Background actors against the durable store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_expose_simulated_devices_through_api() {
    let stack = Stack::new(BroadcastMode::Bypass).await;
    let simulator = MutationSimulator::new(
        Arc::clone(&stack.registry),
        SimulatorConfig {
            seed: Some(5),
            ..SimulatorConfig::default()
        },
    );

    let spawned = simulator.spawn_once().await.unwrap().unwrap();
    simulator.mutate_once().await.unwrap();

    let (_, body) = stack
        .send("GET", &format!("/api/devices/{}", spawned.id), None)
        .await;
    let device_type: DeviceType = serde_json::from_value(body["data"]["type"].clone()).unwrap();
    assert_eq!(device_type, spawned.device_type);
    assert_eq!(
        body["data"]["sensors"].as_array().unwrap().len(),
        spawned.device_type.sensor_kinds().len()
    );

    simulator.retire_once().await.unwrap();
    let (_, body) = stack.send("GET", "/api/devices", None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn should_broadcast_sqlite_backed_snapshot_in_both_modes() {
    for mode in [BroadcastMode::Bypass, BroadcastMode::Strict] {
        let stack = Stack::new(mode).await;
        stack.send("POST", "/api/devices", Some(test_car())).await;
        let mut subscription = stack.broadcaster.subscribe();

        let sampled = stack.broadcaster.sample_once().await.unwrap().unwrap();

        let pushed: Value = serde_json::from_str(&subscription.receiver.recv().await.unwrap()).unwrap();
        assert_eq!(pushed["id"], sampled.id.to_string());
        assert_eq!(pushed["name"], "Test Car");

        let (_, body) = stack
            .send("GET", &format!("/api/devices/{}", sampled.id), None)
            .await;
        assert_eq!(body["data"]["sensors"], pushed["sensors"]);
    }
}
