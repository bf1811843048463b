// ── Topology reconciler ──
//
// Converges the control plane's view of the network with the router
// daemon: fetches config and interfaces, republishes the flattened
// per-interface records, derives the default WAN and the monitoring
// set, and bounces the monitor when that set changes. Deployments
// without a daemon get a synthesized single-interface topology from the
// discovery probe instead.
//
// Reconciles are serialized; readers see immutable snapshots swapped in
// atomically, never a half-updated map.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use gatewatch_api::RouterClient;

use crate::debounce::DebounceScheduler;
use crate::error::CoreError;
use crate::history::ConfigHistoryLedger;
use crate::model::{
    Interface, InterfaceConfig, InterfaceMeta, InterfaceState, InterfaceType, Mode, NetworkInfo,
    RouterConfig,
};
use crate::process::{InterfaceDiscovery, MonitorSupervisor};
use crate::signal::{Signal, SignalBus};
use crate::store::{StateStore, keys};

/// Quiet window between a reload trigger and the reconcile it causes.
pub const RELOAD_QUIET_WINDOW: Duration = Duration::from_secs(3);

// Placeholder uuid rows published on unmanaged deployments, where no
// daemon hands out real interface uuids. Consumers key on these.
const STUB_UUID_PRIMARY: &str = "00000000-0000-0000-0000-000000000000";
const STUB_UUID_ALIAS: &str = "11111111-1111-1111-1111-111111111111";

/// Immutable view of the network produced by one reconcile.
#[derive(Debug, Clone)]
pub struct TopologySnapshot {
    /// Interfaces keyed by name. Shares `Arc`s with `by_uuid`.
    pub by_name: HashMap<String, Arc<Interface>>,
    pub by_uuid: HashMap<String, Arc<Interface>>,
    /// The published projection, as persisted to the store.
    pub network_info: HashMap<String, NetworkInfo>,
    /// Interface names under monitoring, sorted.
    pub monitoring: Vec<String>,
    /// WAN interface names, sorted.
    pub wans: Vec<String>,
    pub default_wan: Option<String>,
    pub mode: Mode,
    /// The raw daemon config this snapshot was derived from
    /// (`None` on unmanaged deployments).
    pub router_config: Option<RouterConfig>,
}

impl Default for TopologySnapshot {
    fn default() -> Self {
        Self {
            by_name: HashMap::new(),
            by_uuid: HashMap::new(),
            network_info: HashMap::new(),
            monitoring: Vec::new(),
            wans: Vec::new(),
            default_wan: None,
            mode: Mode::Unknown(String::new()),
            router_config: None,
        }
    }
}

/// Restart requirements reported for an accepted config push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartImpact {
    pub service_restart: bool,
    pub system_restart: bool,
}

struct Inner {
    client: Option<RouterClient>,
    discovery: Option<Arc<dyn InterfaceDiscovery>>,
    supervisor: Option<Arc<dyn MonitorSupervisor>>,
    store: Arc<dyn StateStore>,
    bus: SignalBus,
    history: ConfigHistoryLedger,
    reload: DebounceScheduler,
    /// Serializes reconciles; snapshot readers never wait on this.
    reconcile_lock: Mutex<()>,
    snapshot: ArcSwap<TopologySnapshot>,
    reconciled_once: AtomicBool,
    ready_tx: watch::Sender<bool>,
}

/// The network-topology reconciler.
///
/// Cheaply cloneable via `Arc`. Construct with [`TopologyReconciler::builder`],
/// attaching a [`RouterClient`] for managed deployments or an
/// [`InterfaceDiscovery`] probe for unmanaged ones.
#[derive(Clone)]
pub struct TopologyReconciler {
    inner: Arc<Inner>,
}

/// Builder for [`TopologyReconciler`].
pub struct TopologyReconcilerBuilder {
    store: Arc<dyn StateStore>,
    bus: SignalBus,
    client: Option<RouterClient>,
    discovery: Option<Arc<dyn InterfaceDiscovery>>,
    supervisor: Option<Arc<dyn MonitorSupervisor>>,
    quiet: Duration,
}

impl TopologyReconcilerBuilder {
    /// Attach the router daemon client (managed deployment).
    #[must_use]
    pub fn router_client(mut self, client: RouterClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Attach the discovery probe (unmanaged deployment).
    #[must_use]
    pub fn discovery(mut self, discovery: Arc<dyn InterfaceDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Attach the monitor supervisor to bounce on monitoring-set changes.
    #[must_use]
    pub fn supervisor(mut self, supervisor: Arc<dyn MonitorSupervisor>) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    /// Override the reload debounce quiet window.
    #[must_use]
    pub fn reload_quiet(mut self, quiet: Duration) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn build(self) -> TopologyReconciler {
        let (ready_tx, _) = watch::channel(false);
        TopologyReconciler {
            inner: Arc::new(Inner {
                client: self.client,
                discovery: self.discovery,
                supervisor: self.supervisor,
                history: ConfigHistoryLedger::new(Arc::clone(&self.store)),
                store: self.store,
                bus: self.bus,
                reload: DebounceScheduler::new(self.quiet),
                reconcile_lock: Mutex::new(()),
                snapshot: ArcSwap::from_pointee(TopologySnapshot::default()),
                reconciled_once: AtomicBool::new(false),
                ready_tx,
            }),
        }
    }
}

impl TopologyReconciler {
    pub fn builder(store: Arc<dyn StateStore>, bus: SignalBus) -> TopologyReconcilerBuilder {
        TopologyReconcilerBuilder {
            store,
            bus,
            client: None,
            discovery: None,
            supervisor: None,
            quiet: RELOAD_QUIET_WINDOW,
        }
    }

    /// Whether this deployment has a router daemon.
    pub fn is_managed(&self) -> bool {
        self.inner.client.is_some()
    }

    // ── Reconcile ────────────────────────────────────────────────────

    /// Run one full reconcile and swap in the resulting snapshot.
    ///
    /// Managed: fetch config and interfaces from the daemon, append the
    /// config to history if it changed, republish network info, derive
    /// the default WAN and the monitoring set. Unmanaged: synthesize a
    /// single-interface topology from the discovery probe.
    ///
    /// Errors here are fatal ([`CoreError::is_fatal`]) — without a fetch
    /// the control plane has no usable interface map.
    pub async fn reconcile(&self) -> Result<(), CoreError> {
        let _guard = self.inner.reconcile_lock.lock().await;
        match &self.inner.client {
            Some(client) => self.reconcile_managed(client).await,
            None => self.reconcile_unmanaged().await,
        }
    }

    async fn reconcile_managed(&self, client: &RouterClient) -> Result<(), CoreError> {
        let config = RouterConfig::new(client.active_config().await?);
        let mode = Mode::from_store_value(self.inner.store.get(keys::MODE).await?);

        // only a genuinely new config enters the history
        let last = self.inner.history.load_last(&mode).await?;
        if last.as_ref().map(|snap| &snap.config) != Some(&config) {
            info!(%mode, "router config changed, appending to history");
            self.inner
                .history
                .append(&mode, &config, Utc::now().timestamp())
                .await?;
        }

        let raw = client.interfaces().await?;
        let mut by_name = HashMap::new();
        let mut by_uuid = HashMap::new();
        for (name, value) in raw {
            let intf: Interface = match serde_json::from_value(value) {
                Ok(intf) => intf,
                Err(e) => {
                    warn!(name, error = %e, "skipping undecodable interface");
                    continue;
                }
            };
            let intf = Arc::new(intf);
            if !intf.uuid().is_empty() {
                by_uuid.insert(intf.uuid().to_owned(), Arc::clone(&intf));
            }
            by_name.insert(name, intf);
        }

        let mut network_info = HashMap::new();
        for (name, intf) in &by_name {
            network_info.insert(name.clone(), NetworkInfo::project(name, intf));
        }
        self.publish_network_info(&network_info).await?;

        let mut wans: Vec<String> = by_name
            .iter()
            .filter(|(_, intf)| intf.kind() == InterfaceType::Wan)
            .map(|(name, _)| name.clone())
            .collect();
        wans.sort();

        let default_wan = config.default_wan().map(str::to_owned);
        if default_wan.is_none() && !wans.is_empty() {
            error!("default WAN interface not found in router config");
        }

        let mut monitoring: Vec<String> = by_name
            .iter()
            .filter(|(_, intf)| mode.monitors(intf.kind()))
            .map(|(name, _)| name.clone())
            .collect();
        monitoring.sort();

        self.finish_reconcile(TopologySnapshot {
            by_name,
            by_uuid,
            network_info,
            monitoring,
            wans,
            default_wan,
            mode,
            router_config: Some(config),
        })
        .await;
        Ok(())
    }

    /// Unmanaged deployments have no daemon to ask; the active ethernet
    /// interface and its `:0` alias make up the whole topology.
    async fn reconcile_unmanaged(&self) -> Result<(), CoreError> {
        let discovery = self
            .inner
            .discovery
            .as_ref()
            .ok_or(CoreError::NoActiveInterface)?;

        let name = discovery.active_interface().await?;
        let discovered = discovery.discover().await?;
        let probed = discovered
            .into_iter()
            .find(|info| info.name == name)
            .ok_or(CoreError::NoActiveInterface)?;

        let intf = Arc::new(Self::synthesize_interface(&name, &probed));
        let alias = format!("{name}:0");

        let mut info = NetworkInfo::project(&name, &intf);
        info.uuid = STUB_UUID_PRIMARY.to_owned();
        let mut alias_info = info.clone();
        alias_info.name.clone_from(&alias);
        alias_info.uuid = STUB_UUID_ALIAS.to_owned();

        let network_info = HashMap::from([
            (name.clone(), info),
            (alias.clone(), alias_info),
        ]);
        self.publish_network_info(&network_info).await?;

        let by_uuid = HashMap::from([(intf.uuid().to_owned(), Arc::clone(&intf))]);
        let by_name = HashMap::from([(name.clone(), intf)]);

        self.finish_reconcile(TopologySnapshot {
            by_name,
            by_uuid,
            network_info,
            monitoring: vec![name.clone(), alias],
            wans: vec![name.clone()],
            default_wan: Some(name),
            mode: Mode::from_store_value(self.inner.store.get(keys::MODE).await?),
            router_config: None,
        })
        .await;
        Ok(())
    }

    fn synthesize_interface(name: &str, probed: &NetworkInfo) -> Interface {
        // only v4 resolvers make sense for the synthesized record
        let dns = probed.dns.as_ref().map(|servers| {
            servers
                .iter()
                .filter(|d| d.parse::<std::net::Ipv4Addr>().is_ok())
                .cloned()
                .collect::<Vec<_>>()
        });

        Interface {
            config: InterfaceConfig {
                meta: InterfaceMeta {
                    name: Some(name.to_owned()),
                    uuid: Uuid::new_v4().to_string(),
                    kind: InterfaceType::Wan,
                },
                gateway: probed.gateway.clone(),
                gateway6: probed.gateway6.clone(),
                nameservers: dns.clone(),
                rest: HashMap::new(),
            },
            state: InterfaceState {
                mac: probed.mac_address.clone(),
                ip4: probed.subnet.clone(),
                ip6: probed.ip6_subnets.clone(),
                gateway: probed.gateway.clone(),
                gateway6: probed.gateway6.clone(),
                dns,
                carrier: Some(i64::from(probed.carrier)),
            },
        }
    }

    /// Rebuild both store hashes from scratch and announce the update.
    async fn publish_network_info(
        &self,
        network_info: &HashMap<String, NetworkInfo>,
    ) -> Result<(), CoreError> {
        let store = &self.inner.store;
        store.del(keys::NETWORK_INFO).await?;
        store.del(keys::NETWORK_UUID).await?;

        for (name, info) in network_info {
            let row = serde_json::to_string(info)?;
            store.hset(keys::NETWORK_INFO, name, &row).await?;
            if !info.uuid.is_empty() {
                store.hset(keys::NETWORK_UUID, &info.uuid, &row).await?;
            }
        }

        self.inner.bus.publish(Signal::NetworkInfoUpdated);
        Ok(())
    }

    async fn finish_reconcile(&self, next: TopologySnapshot) {
        let prev = self.inner.snapshot.load_full();
        let first = !self.inner.reconciled_once.swap(true, Ordering::SeqCst);
        let changed = prev.monitoring != next.monitoring;
        let monitoring = next.monitoring.clone();

        self.inner.snapshot.store(Arc::new(next));
        // send_replace: the value must stick even with no subscriber yet
        self.inner.ready_tx.send_replace(true);

        if first || changed {
            info!(?monitoring, "monitoring set changed, restarting monitor");
            if let Some(supervisor) = &self.inner.supervisor {
                // the next reconcile retries; a dead monitor must not
                // block topology updates
                if let Err(e) = supervisor.restart_monitoring(&monitoring).await {
                    warn!(error = %e, "failed to restart monitoring");
                }
            }
        }
    }

    // ── Reload scheduling ────────────────────────────────────────────

    /// Arm a debounced reconcile; a burst of triggers converges once.
    pub fn schedule_reload(&self) {
        let this = self.clone();
        self.inner.reload.schedule(move || async move {
            if let Err(e) = this.reconcile().await {
                if e.is_fatal() {
                    error!(error = %e, "reconcile failed, topology is stale");
                } else {
                    warn!(error = %e, "reconcile failed");
                }
            }
        });
    }

    /// Listen on the signal bus and schedule a reload for every signal
    /// that implies the network may have changed.
    pub fn spawn_signal_listener(&self) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        let mut rx = self.inner.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(Signal::ConfigApplied | Signal::NetworkChanged) => this.schedule_reload(),
                    Ok(Signal::NetworkInfoUpdated) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "signal listener lagged, scheduling reload");
                        this.schedule_reload();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    // ── Config push ──────────────────────────────────────────────────

    /// Push a configuration to the router daemon.
    ///
    /// Publishes [`Signal::NetworkChanged`] on acceptance; convergence
    /// happens through the debounced reload, never inline.
    pub async fn set_config(&self, config: &RouterConfig) -> Result<RestartImpact, CoreError> {
        let client = self.inner.client.as_ref().ok_or(CoreError::NotManaged)?;

        client.set_config(config.as_value()).await?;
        let impact = Self::check_config(config);
        self.inner.bus.publish(Signal::NetworkChanged);
        Ok(impact)
    }

    /// Re-push the most recent accepted configuration for a mode.
    ///
    /// Only modes with config-push semantics qualify; an empty history
    /// is an error, not a silent no-op.
    pub async fn apply_last_config_for_mode(&self, mode: &Mode) -> Result<RestartImpact, CoreError> {
        match mode {
            Mode::AutoSpoof | Mode::Router => {
                let snap = self
                    .inner
                    .history
                    .load_last(mode)
                    .await?
                    .ok_or_else(|| CoreError::NoConfigHistory(mode.to_string()))?;
                self.set_config(&snap.config).await
            }
            other => Err(CoreError::UnsupportedMode(other.to_string())),
        }
    }

    fn check_config(_config: &RouterConfig) -> RestartImpact {
        // the daemon applies config changes in place today
        RestartImpact::default()
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<TopologySnapshot> {
        self.inner.snapshot.load_full()
    }

    pub fn interface_by_name(&self, name: &str) -> Option<Arc<Interface>> {
        self.inner.snapshot.load().by_name.get(name).cloned()
    }

    pub fn interface_by_uuid(&self, uuid: &str) -> Option<Arc<Interface>> {
        self.inner.snapshot.load().by_uuid.get(uuid).cloned()
    }

    pub fn monitoring_interfaces(&self) -> Vec<String> {
        self.inner.snapshot.load().monitoring.clone()
    }

    pub fn wan_names(&self) -> Vec<String> {
        self.inner.snapshot.load().wans.clone()
    }

    pub fn default_wan(&self) -> Option<String> {
        self.inner.snapshot.load().default_wan.clone()
    }

    pub fn network_info(&self, name: &str) -> Option<NetworkInfo> {
        self.inner.snapshot.load().network_info.get(name).cloned()
    }

    /// The raw daemon config the current snapshot was derived from.
    pub fn router_config(&self) -> Option<RouterConfig> {
        self.inner.snapshot.load().router_config.clone()
    }

    /// Whether at least one reconcile has completed.
    pub fn is_ready(&self) -> bool {
        self.inner.reconciled_once.load(Ordering::SeqCst)
    }

    /// Wait until the first reconcile has published a snapshot.
    pub async fn wait_until_ready(&self) {
        let mut rx = self.inner.ready_tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::advance;

    struct FakeDiscovery {
        infos: Vec<NetworkInfo>,
        probes: AtomicUsize,
    }

    impl FakeDiscovery {
        fn new(infos: Vec<NetworkInfo>) -> Self {
            Self {
                infos,
                probes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InterfaceDiscovery for FakeDiscovery {
        async fn active_interface(&self) -> Result<String, CoreError> {
            self.infos
                .first()
                .map(|info| info.name.clone())
                .ok_or(CoreError::NoActiveInterface)
        }

        async fn discover(&self) -> Result<Vec<NetworkInfo>, CoreError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(self.infos.clone())
        }
    }

    #[derive(Default)]
    struct RecordingSupervisor {
        restarts: StdMutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl MonitorSupervisor for RecordingSupervisor {
        async fn restart_monitoring(&self, interfaces: &[String]) -> Result<(), CoreError> {
            self.restarts.lock().unwrap().push(interfaces.to_vec());
            Ok(())
        }
    }

    fn probed_eth0() -> NetworkInfo {
        NetworkInfo {
            name: "eth0".into(),
            uuid: String::new(),
            mac_address: Some("20:6d:31:01:2b:43".into()),
            ip_address: Some("192.168.1.2".into()),
            subnet: Some("192.168.1.2/24".into()),
            netmask: Some("255.255.255.0".into()),
            gateway_ip: Some("192.168.1.1".into()),
            gateway: Some("192.168.1.1".into()),
            ip6_addresses: None,
            ip6_subnets: None,
            ip6_masks: None,
            gateway6: None,
            dns: Some(vec!["192.168.1.1".into(), "2001:db8::53".into()]),
            carrier: true,
            conn_type: "Wired".into(),
            kind: InterfaceType::Wan,
        }
    }

    fn unmanaged_reconciler(
        store: Arc<MemoryStore>,
        supervisor: Arc<RecordingSupervisor>,
    ) -> TopologyReconciler {
        TopologyReconciler::builder(store, SignalBus::new())
            .discovery(Arc::new(FakeDiscovery::new(vec![probed_eth0()])))
            .supervisor(supervisor)
            .build()
    }

    #[tokio::test]
    async fn unmanaged_reconcile_synthesizes_alias_topology() {
        let store = Arc::new(MemoryStore::new());
        let supervisor = Arc::new(RecordingSupervisor::default());
        let reconciler = unmanaged_reconciler(Arc::clone(&store), Arc::clone(&supervisor));

        assert!(!reconciler.is_ready());
        reconciler.reconcile().await.unwrap();
        assert!(reconciler.is_ready());

        assert_eq!(
            reconciler.monitoring_interfaces(),
            vec!["eth0".to_owned(), "eth0:0".to_owned()]
        );
        assert_eq!(reconciler.default_wan().as_deref(), Some("eth0"));

        // both hash rows published, keyed by the placeholder uuids
        let by_uuid = store.hgetall(keys::NETWORK_UUID).await.unwrap();
        assert!(by_uuid.contains_key(STUB_UUID_PRIMARY));
        assert!(by_uuid.contains_key(STUB_UUID_ALIAS));

        let by_name = store.hgetall(keys::NETWORK_INFO).await.unwrap();
        let row: NetworkInfo = serde_json::from_str(&by_name["eth0"]).unwrap();
        assert_eq!(row.ip_address.as_deref(), Some("192.168.1.2"));
        // v6 resolvers are filtered out of the synthesized record
        assert_eq!(row.dns.unwrap(), vec!["192.168.1.1"]);
    }

    #[tokio::test]
    async fn monitor_restarts_on_first_reconcile_only() {
        let store = Arc::new(MemoryStore::new());
        let supervisor = Arc::new(RecordingSupervisor::default());
        let reconciler = unmanaged_reconciler(store, Arc::clone(&supervisor));

        reconciler.reconcile().await.unwrap();
        reconciler.reconcile().await.unwrap();

        let restarts = supervisor.restarts.lock().unwrap();
        assert_eq!(restarts.len(), 1);
        assert_eq!(restarts[0], vec!["eth0".to_owned(), "eth0:0".to_owned()]);
    }

    #[tokio::test]
    async fn reconcile_without_client_or_discovery_is_fatal() {
        let reconciler =
            TopologyReconciler::builder(Arc::new(MemoryStore::new()), SignalBus::new()).build();

        let err = reconciler.reconcile().await.unwrap_err();
        assert!(matches!(err, CoreError::NoActiveInterface));
        assert!(err.is_fatal());
        assert!(!reconciler.is_ready());
    }

    #[tokio::test]
    async fn set_config_requires_a_daemon() {
        let store = Arc::new(MemoryStore::new());
        let supervisor = Arc::new(RecordingSupervisor::default());
        let reconciler = unmanaged_reconciler(store, supervisor);

        let cfg = RouterConfig::new(serde_json::json!({ "interface": {} }));
        let err = reconciler.set_config(&cfg).await.unwrap_err();
        assert!(matches!(err, CoreError::NotManaged));
    }

    #[tokio::test]
    async fn apply_last_config_rejects_non_push_modes() {
        let store = Arc::new(MemoryStore::new());
        let supervisor = Arc::new(RecordingSupervisor::default());
        let reconciler = unmanaged_reconciler(store, supervisor);

        let err = reconciler
            .apply_last_config_for_mode(&Mode::Dhcp)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedMode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn signals_converge_through_one_debounced_reconcile() {
        let store = Arc::new(MemoryStore::new());
        let bus = SignalBus::new();
        let discovery = Arc::new(FakeDiscovery::new(vec![probed_eth0()]));
        let reconciler = TopologyReconciler::builder(store, bus.clone())
            .discovery(Arc::clone(&discovery) as Arc<dyn InterfaceDiscovery>)
            .build();
        let listener = reconciler.spawn_signal_listener();

        for _ in 0..5 {
            bus.publish(Signal::NetworkChanged);
            advance(Duration::from_millis(100)).await;
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
        }
        assert_eq!(discovery.probes.load(Ordering::SeqCst), 0);

        advance(Duration::from_secs(4)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        assert_eq!(discovery.probes.load(Ordering::SeqCst), 1);
        assert!(reconciler.is_ready());
        listener.abort();
    }

    #[tokio::test]
    async fn wait_until_ready_unblocks_after_first_reconcile() {
        let store = Arc::new(MemoryStore::new());
        let supervisor = Arc::new(RecordingSupervisor::default());
        let reconciler = unmanaged_reconciler(store, supervisor);

        let waiter = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.wait_until_ready().await })
        };

        reconciler.reconcile().await.unwrap();
        waiter.await.unwrap();
        assert!(reconciler.is_ready());
    }
}
