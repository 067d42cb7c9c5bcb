//! ---
//! devreg_section: "15-testing-qa-runbook"
//! devreg_subsection: "integration-tests"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "End-to-end registry flows across store, service and REST API."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use std::path::Path;
use std::sync::Arc;

use devreg_api::{spawn_api_server, ApiServer, ApiState};
use devreg_core::{RegistryService, TopologyNode};
use devreg_persistence::{verify_snapshot, FileDeviceStore, PersistenceMetrics};
use prometheus::Registry;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tempfile::tempdir;

fn start(path: &Path) -> ApiServer {
    let registry = Arc::new(Registry::new());
    let metrics = PersistenceMetrics::new(registry.clone()).unwrap();
    let store = FileDeviceStore::open_with_metrics(path, Some(metrics)).unwrap();
    let state = ApiState::new(RegistryService::new(Arc::new(store)))
        .with_metrics_registry(registry)
        .unwrap();
    spawn_api_server(Arc::new(state), "127.0.0.1:0".parse().unwrap()).unwrap()
}

async fn forest(client: &Client, base: &str) -> Vec<TopologyNode> {
    client
        .get(format!("{base}/devices/topology"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn campus_network_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("devices.cbor");
    let client = Client::new();

    let server = start(&path);
    let base = format!("http://{}", server.addr());
    let devices = [
        json!({"deviceType": "GATEWAY", "macAddress": "gw-a"}),
        json!({"deviceType": "SWITCH", "macAddress": "sw-1", "uplinkMacAddress": "gw-a"}),
        json!({"deviceType": "SWITCH", "macAddress": "sw-2", "uplinkMacAddress": "gw-a"}),
        json!({"deviceType": "ACCESS_POINT", "macAddress": "ap-1", "uplinkMacAddress": "sw-1"}),
        json!({"deviceType": "ACCESS_POINT", "macAddress": "ap-2", "uplinkMacAddress": "sw-2"}),
        json!({"deviceType": "GATEWAY", "macAddress": "gw-b"}),
    ];
    for body in &devices {
        let response = client
            .post(format!("{base}/devices"))
            .json(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let before = forest(&client, &base).await;
    assert_eq!(before.len(), 2);
    assert_eq!(before[0].mac_address, "gw-a");
    assert_eq!(before[0].node_count(), 5);
    assert_eq!(before[0].depth(), 3);
    let switches: Vec<_> = before[0]
        .children
        .iter()
        .map(|node| node.mac_address.as_str())
        .collect();
    assert_eq!(switches, ["sw-1", "sw-2"]);

    let metrics = client
        .get(format!("{base}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("devreg_snapshots_written_total 6"));
    assert!(metrics.contains(r#"devreg_http_requests_total{route="register",status="200"} 6"#));
    server.shutdown().await.unwrap();

    assert!(verify_snapshot(&path));

    let server = start(&path);
    let base = format!("http://{}", server.addr());
    assert_eq!(forest(&client, &base).await, before);

    let listed: Vec<serde_json::Value> = client
        .get(format!("{base}/devices"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let macs: Vec<_> = listed
        .iter()
        .map(|device| device["macAddress"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(macs, ["gw-a", "gw-b", "sw-1", "sw-2", "ap-1", "ap-2"]);

    let response = client
        .post(format!("{base}/devices"))
        .json(&json!({"deviceType": "SWITCH", "macAddress": "sw-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    server.shutdown().await.unwrap();
}
