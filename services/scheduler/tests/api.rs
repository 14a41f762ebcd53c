//! HTTP API tests.
//!
//! Builds the router exactly as the binary does, with a live scheduler
//! worker behind it, and drives it with `tower::ServiceExt::oneshot`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use fleet_id::GroupKey;
use fleet_reconcile::ReconciliationEngine;
use fleet_scheduler::{
    api,
    config::TaskConfig,
    factory::TaskTemplate,
    gateway::ChannelGateway,
    scheduler::{seed_registry, Scheduler, SchedulerWorker},
    state::AppState,
    store::StateStore,
};
use fleet_testing::{acceptable_offer, unacceptable_offer};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch, Mutex};
use tower::ServiceExt;

const GROUP: &str = "http://es-a:9200";
const GROUP_PATH: &str = "http%3A%2F%2Fes-a%3A9200";

struct Harness {
    app: Router,
    _shutdown: watch::Sender<bool>,
}

fn harness_with_store(store: StateStore, requirements: BTreeMap<GroupKey, u32>) -> Harness {
    let registry = Arc::new(Mutex::new(seed_registry(&store, &requirements).unwrap()));
    let store = Arc::new(Mutex::new(store));

    let (events_tx, events_rx) = mpsc::channel(16);
    let (gateway, commands_rx) = ChannelGateway::channel(64);
    let scheduler = Scheduler::new(
        registry.clone(),
        store.clone(),
        ReconciliationEngine::default(),
        gateway,
        TaskTemplate::new("fleet", TaskConfig::default()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(SchedulerWorker::new(scheduler, events_rx).run(shutdown_rx));

    Harness {
        app: api::create_router(AppState::new(registry, store, events_tx, commands_rx)),
        _shutdown: shutdown_tx,
    }
}

fn harness(requirements: &[(&str, u32)]) -> Harness {
    let requirements = requirements
        .iter()
        .map(|(group, desired)| (GroupKey::parse(group).unwrap(), *desired))
        .collect();
    harness_with_store(StateStore::open_in_memory().unwrap(), requirements)
}

impl Harness {
    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post_event(&self, event: Value) -> StatusCode {
        self.request(Method::POST, "/v1/driver/events", Some(event))
            .await
            .0
    }

    /// Poll the command outbox until `n` commands have arrived.
    async fn wait_for_commands(&self, n: usize) -> Vec<Value> {
        let mut commands = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);

        while commands.len() < n {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {n} commands, got {commands:?}"
            );
            let (status, body) = self.request(Method::GET, "/v1/driver/commands", None).await;
            assert_eq!(status, StatusCode::OK);
            commands.extend(body["commands"].as_array().unwrap().iter().cloned());
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        commands
    }
}

fn offers_event(offers: Vec<fleet_events::Offer>) -> Value {
    json!({ "type": "offers_received", "offers": offers })
}

#[tokio::test]
async fn test_health_endpoints() {
    let h = harness(&[]);

    let (status, body) = h.request(Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "fleet-scheduler");

    let (status, _) = h.request(Method::GET, "/livez", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_ready_after_registration() {
    let h = harness(&[]);

    let (status, body) = h.request(Method::GET, "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["components"]["framework"]["status"], "unavailable");

    let accepted = h
        .post_event(json!({
            "type": "registered",
            "framework_id": "fw-0001",
            "master": { "ip": "10.0.0.1", "port": 5050 }
        }))
        .await;
    assert_eq!(accepted, StatusCode::ACCEPTED);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let (status, body) = h.request(Method::GET, "/readyz", None).await;
        if status == StatusCode::OK {
            assert_eq!(body["components"]["framework"]["message"], "fw-0001");
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "never became ready");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_list_groups() {
    let h = harness(&[(GROUP, 2), ("http://es-b:9200", 0)]);

    let (status, body) = h.request(Method::GET, "/v1/groups", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_running"], 0);

    let groups = body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["group"], GROUP);
    assert_eq!(groups[0]["desired"], 2);
    assert_eq!(groups[0]["delta"], 2);
    assert_eq!(groups[1]["delta"], 0);
}

#[tokio::test]
async fn test_set_desired_creates_group() {
    let h = harness(&[]);

    let (status, body) = h
        .request(
            Method::PUT,
            &format!("/v1/groups/{GROUP_PATH}"),
            Some(json!({ "desired": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["group"], GROUP);
    assert_eq!(body["desired"], 3);
    assert_eq!(body["running"], 0);

    let (status, body) = h
        .request(Method::GET, &format!("/v1/groups/{GROUP_PATH}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delta"], 3);
}

#[tokio::test]
async fn test_unknown_group_is_not_found() {
    let h = harness(&[]);

    let (status, body) = h
        .request(Method::GET, &format!("/v1/groups/{GROUP_PATH}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "group_not_found");

    let (status, _) = h
        .request(Method::DELETE, &format!("/v1/groups/{GROUP_PATH}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_offers_drive_launches_and_declines() {
    let h = harness(&[(GROUP, 1)]);

    let status = h
        .post_event(offers_event(vec![
            unacceptable_offer("bad"),
            acceptable_offer("o-0"),
            acceptable_offer("o-1"),
        ]))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let commands = h.wait_for_commands(3).await;
    assert_eq!(commands[0]["type"], "decline");
    assert_eq!(commands[0]["offer_id"], "bad");
    assert_eq!(commands[1]["type"], "launch");
    assert_eq!(commands[1]["offer_id"], "o-0");
    assert_eq!(commands[1]["refuse_seconds"], 1.0);
    assert_eq!(commands[1]["task"]["group"], GROUP);
    assert_eq!(
        commands[1]["task"]["container"]["port_mappings"][0]["host_port"],
        31000
    );
    assert_eq!(commands[2]["type"], "decline");
    assert_eq!(commands[2]["offer_id"], "o-1");

    let (_, body) = h.request(Method::GET, "/v1/groups", None).await;
    assert_eq!(body["total_running"], 1);
    assert_eq!(body["groups"][0]["tasks"][0], commands[1]["task"]["task_id"]);
}

#[tokio::test]
async fn test_drain_group_kills_on_next_batch() {
    let h = harness(&[(GROUP, 1)]);

    h.post_event(offers_event(vec![acceptable_offer("o-0")]))
        .await;
    let launched = h.wait_for_commands(1).await;
    let task_id = launched[0]["task"]["task_id"].clone();

    let (status, body) = h
        .request(Method::DELETE, &format!("/v1/groups/{GROUP_PATH}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["desired"], 0);
    assert_eq!(body["delta"], -1);

    h.post_event(offers_event(vec![])).await;
    let commands = h.wait_for_commands(1).await;
    assert_eq!(commands[0]["type"], "kill");
    assert_eq!(commands[0]["task_id"], task_id);
}

#[tokio::test]
async fn test_terminal_status_frees_slot() {
    let h = harness(&[(GROUP, 1)]);

    h.post_event(offers_event(vec![acceptable_offer("o-0")]))
        .await;
    let launched = h.wait_for_commands(1).await;
    let task_id = launched[0]["task"]["task_id"].clone();

    h.post_event(json!({ "type": "status_update", "task_id": task_id, "state": "failed" }))
        .await;
    h.post_event(offers_event(vec![acceptable_offer("o-1")]))
        .await;

    let commands = h.wait_for_commands(1).await;
    assert_eq!(commands[0]["type"], "launch");
    assert_eq!(commands[0]["offer_id"], "o-1");
    assert_ne!(commands[0]["task"]["task_id"], task_id);
}

#[tokio::test]
async fn test_malformed_events_rejected() {
    let h = harness(&[]);

    let (status, body) = h
        .request(
            Method::POST,
            "/v1/driver/events",
            Some(json!({ "type": "resource_offers" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unknown_event_type");

    let (status, body) = h
        .request(
            Method::POST,
            "/v1/driver/events",
            Some(json!({ "type": "offer_rescinded" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_event");
}

#[tokio::test]
async fn test_desired_counts_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
        let h = harness_with_store(StateStore::open(&path).unwrap(), BTreeMap::new());
        let (status, _) = h
            .request(
                Method::PUT,
                &format!("/v1/groups/{GROUP_PATH}"),
                Some(json!({ "desired": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let h = harness_with_store(StateStore::open(&path).unwrap(), BTreeMap::new());
    let (_, body) = h
        .request(Method::GET, &format!("/v1/groups/{GROUP_PATH}"), None)
        .await;
    assert_eq!(body["desired"], 2);
}
