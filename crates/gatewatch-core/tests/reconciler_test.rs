#![allow(clippy::unwrap_used)]
// Integration tests for the managed reconcile path, with wiremock
// standing in for the router daemon.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gatewatch_api::RouterClient;
use gatewatch_core::process::MonitorSupervisor;
use gatewatch_core::store::keys;
use gatewatch_core::{
    CoreError, MemoryStore, Mode, NetworkInfo, RouterConfig, Signal, SignalBus, StateStore,
    TopologyReconciler,
};

// ── Fixtures ────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingSupervisor {
    restarts: StdMutex<Vec<Vec<String>>>,
}

impl RecordingSupervisor {
    fn restart_count(&self) -> usize {
        self.restarts.lock().unwrap().len()
    }
}

#[async_trait]
impl MonitorSupervisor for RecordingSupervisor {
    async fn restart_monitoring(&self, interfaces: &[String]) -> Result<(), CoreError> {
        self.restarts.lock().unwrap().push(interfaces.to_vec());
        Ok(())
    }
}

fn active_config() -> serde_json::Value {
    json!({
        "interface": { "phy": { "eth0": { "enabled": true } } },
        "routing": { "global": { "default": { "viaIntf": "eth0" } } }
    })
}

fn interfaces_body() -> serde_json::Value {
    json!({
        "eth0": {
            "config": { "meta": { "name": "eth0", "uuid": "u-wan", "type": "wan" } },
            "state": {
                "mac": "20:6d:31:aa:bb:cc",
                "ip4": "192.168.1.2/24",
                "gateway": "192.168.1.1",
                "dns": ["192.168.1.1"],
                "carrier": 1
            }
        },
        "br0": {
            "config": { "meta": { "name": "br0", "uuid": "u-lan", "type": "lan" } },
            "state": { "ip4": "192.168.218.1/24", "carrier": 1 }
        }
    })
}

async fn mount_daemon(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/config/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_config()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/config/interfaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(interfaces_body()))
        .mount(server)
        .await;
}

struct Harness {
    _server: MockServer,
    store: Arc<MemoryStore>,
    bus: SignalBus,
    supervisor: Arc<RecordingSupervisor>,
    reconciler: TopologyReconciler,
}

async fn harness(mode: &str) -> Harness {
    let server = MockServer::start().await;
    mount_daemon(&server).await;

    let store = Arc::new(MemoryStore::new());
    store.set(keys::MODE, mode).await.unwrap();

    let bus = SignalBus::new();
    let supervisor = Arc::new(RecordingSupervisor::default());
    let client = RouterClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
    );
    let reconciler = TopologyReconciler::builder(Arc::clone(&store) as Arc<dyn StateStore>, bus.clone())
        .router_client(client)
        .supervisor(Arc::clone(&supervisor) as Arc<dyn MonitorSupervisor>)
        .build();

    Harness {
        _server: server,
        store,
        bus,
        supervisor,
        reconciler,
    }
}

// ── Reconcile ───────────────────────────────────────────────────────

#[tokio::test]
async fn reconcile_publishes_full_topology() {
    let h = harness("auto_spoof").await;
    h.reconciler.reconcile().await.unwrap();

    let snapshot = h.reconciler.snapshot();
    assert_eq!(snapshot.by_name.len(), 2);
    assert_eq!(snapshot.mode, Mode::AutoSpoof);
    assert_eq!(snapshot.default_wan.as_deref(), Some("eth0"));
    assert_eq!(snapshot.wans, vec!["eth0".to_owned()]);
    // auto_spoof monitors both sides
    assert_eq!(snapshot.monitoring, vec!["br0".to_owned(), "eth0".to_owned()]);

    // both lookup directions resolve to the same interface
    let by_name = h.reconciler.interface_by_name("eth0").unwrap();
    let by_uuid = h.reconciler.interface_by_uuid("u-wan").unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_uuid));

    // published rows decode back to the projection
    let rows = h.store.hgetall(keys::NETWORK_INFO).await.unwrap();
    let eth0: NetworkInfo = serde_json::from_str(&rows["eth0"]).unwrap();
    assert_eq!(eth0.ip_address.as_deref(), Some("192.168.1.2"));
    assert_eq!(eth0.gateway.as_deref(), Some("192.168.1.1"));
    let uuid_rows = h.store.hgetall(keys::NETWORK_UUID).await.unwrap();
    assert!(uuid_rows.contains_key("u-wan"));
    assert!(uuid_rows.contains_key("u-lan"));
}

#[tokio::test]
async fn repeated_reconciles_are_idempotent() {
    let h = harness("auto_spoof").await;
    h.reconciler.reconcile().await.unwrap();
    let first = h.reconciler.snapshot();
    h.reconciler.reconcile().await.unwrap();
    let second = h.reconciler.snapshot();

    assert_eq!(first.monitoring, second.monitoring);
    assert_eq!(first.network_info, second.network_info);

    // unchanged config enters history exactly once
    let history = h
        .store
        .zrevrange(&keys::config_history(&Mode::AutoSpoof), 0, 10)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);

    // monitor bounced on the first reconcile only
    assert_eq!(h.supervisor.restart_count(), 1);
}

#[tokio::test]
async fn router_mode_monitors_lan_only() {
    let h = harness("router").await;
    h.reconciler.reconcile().await.unwrap();

    assert_eq!(
        h.reconciler.monitoring_interfaces(),
        vec!["br0".to_owned()]
    );
}

#[tokio::test]
async fn unknown_mode_monitors_nothing() {
    let h = harness("bridge").await;
    h.reconciler.reconcile().await.unwrap();

    assert!(h.reconciler.monitoring_interfaces().is_empty());
    // snapshot is still fully published
    assert_eq!(h.reconciler.snapshot().by_name.len(), 2);
}

#[tokio::test]
async fn reconcile_emits_network_info_updated() {
    let h = harness("auto_spoof").await;
    let mut rx = h.bus.subscribe();

    h.reconciler.reconcile().await.unwrap();
    assert_eq!(rx.recv().await.unwrap(), Signal::NetworkInfoUpdated);
}

#[tokio::test]
async fn daemon_failure_is_fatal_and_leaves_no_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/active"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let client = RouterClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
    );
    let reconciler = TopologyReconciler::builder(store as Arc<dyn StateStore>, SignalBus::new())
        .router_client(client)
        .build();

    let err = reconciler.reconcile().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(!reconciler.is_ready());
    assert!(reconciler.snapshot().by_name.is_empty());
}

// ── Config push ─────────────────────────────────────────────────────

#[tokio::test]
async fn set_config_publishes_signal_without_inline_reconcile() {
    let server = MockServer::start().await;
    let config = json!({ "interface": { "phy": {} } });

    Mock::given(method("POST"))
        .and(path("/config/set"))
        .and(body_json(&config))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "applied": true })))
        .expect(1)
        .mount(&server)
        .await;
    // no reads: a config push must not reconcile inline
    Mock::given(method("GET"))
        .and(path("/config/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_config()))
        .expect(0)
        .mount(&server)
        .await;

    let bus = SignalBus::new();
    let mut rx = bus.subscribe();
    let client = RouterClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
    );
    let reconciler =
        TopologyReconciler::builder(Arc::new(MemoryStore::new()) as Arc<dyn StateStore>, bus)
            .router_client(client)
            .build();

    let impact = reconciler
        .set_config(&RouterConfig::new(config))
        .await
        .unwrap();
    assert!(!impact.service_restart);
    assert!(!impact.system_restart);
    assert_eq!(rx.recv().await.unwrap(), Signal::NetworkChanged);
}

#[tokio::test]
async fn apply_last_config_replays_the_newest_snapshot() {
    let h = harness("auto_spoof").await;
    h.reconciler.reconcile().await.unwrap();

    // the replayed body is exactly the config the daemon served
    Mock::given(method("POST"))
        .and(path("/config/set"))
        .and(body_json(active_config()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "applied": true })))
        .expect(1)
        .mount(&h._server)
        .await;

    h.reconciler
        .apply_last_config_for_mode(&Mode::AutoSpoof)
        .await
        .unwrap();
}

#[tokio::test]
async fn apply_last_config_with_empty_history_errors() {
    let h = harness("router").await;

    let err = h
        .reconciler
        .apply_last_config_for_mode(&Mode::Router)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NoConfigHistory(_)));
}
