// ── Spoof lifecycle manager ──
//
// Owns the instance registry, the global enable switch, and the
// debounced restart of the OS-level interception processes. Any registry
// mutation funnels into the same debounce scheduler, so a burst of
// changes bounces the processes exactly once, and the reconciler's
// restart signals are ordinary events in the same serialized stream.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::debounce::DebounceScheduler;
use crate::error::CoreError;
use crate::model::{AddressFamily, SpoofInstance, SpoofSelector};
use crate::process::InterceptionBackend;
use crate::spoof::registry::SpoofInstanceRegistry;
use crate::store::{StateStore, keys};

/// Quiet window before the interception processes are bounced.
pub const RESTART_QUIET_WINDOW: Duration = Duration::from_secs(3);

/// Grace period before a demoted device leaves `unmonitored_hosts`.
pub const DEMOTION_GRACE: Duration = Duration::from_secs(8);

/// A device row for membership resync: MAC plus its store-held record.
#[derive(Debug, Clone)]
pub struct ActiveDevice {
    pub mac: String,
}

impl From<&str> for ActiveDevice {
    fn from(mac: &str) -> Self {
        Self { mac: mac.to_owned() }
    }
}

impl From<String> for ActiveDevice {
    fn from(mac: String) -> Self {
        Self { mac }
    }
}

struct SpoofState {
    registry: SpoofInstanceRegistry,
    /// The global switch: instances only run while this is on.
    enabled: bool,
}

struct Inner {
    state: Mutex<SpoofState>,
    backend: Arc<dyn InterceptionBackend>,
    store: Arc<dyn StateStore>,
    restart: DebounceScheduler,
    demotion_grace: Duration,
}

/// Lifecycle manager for traffic-interception instances.
///
/// Cheaply cloneable via `Arc`. Registry and switch live behind one
/// mutex: register/deregister/start/stop sequences read-modify-write the
/// map across suspension points and must serialize.
#[derive(Clone)]
pub struct SpoofLifecycleManager {
    inner: Arc<Inner>,
}

impl SpoofLifecycleManager {
    pub fn new(backend: Arc<dyn InterceptionBackend>, store: Arc<dyn StateStore>) -> Self {
        Self::with_timing(backend, store, RESTART_QUIET_WINDOW, DEMOTION_GRACE)
    }

    pub fn with_timing(
        backend: Arc<dyn InterceptionBackend>,
        store: Arc<dyn StateStore>,
        restart_quiet: Duration,
        demotion_grace: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SpoofState {
                    registry: SpoofInstanceRegistry::new(),
                    enabled: false,
                }),
                backend,
                store,
                restart: DebounceScheduler::new(restart_quiet),
                demotion_grace,
            }),
        }
    }

    /// Whether the global switch is on.
    pub async fn is_enabled(&self) -> bool {
        self.inner.state.lock().await.enabled
    }

    /// Snapshot of the registered instances.
    pub async fn instances(&self) -> Vec<SpoofInstance> {
        self.inner.state.lock().await.registry.snapshot()
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register an interception binding for (interface, family, peer).
    ///
    /// Malformed addresses are logged and skipped. Re-registering an
    /// identical descriptor is a no-op; a changed descriptor stops the
    /// old instance before the new one starts and schedules a restart.
    pub async fn register(
        &self,
        interface: &str,
        peer_ip: &str,
        self_ip: &str,
        family: AddressFamily,
    ) -> Result<(), CoreError> {
        let Some((peer, own)) = Self::parse_pair(peer_ip, self_ip, family) else {
            return Ok(());
        };

        let incoming = SpoofInstance::new(interface, peer, own, family);
        let mut state = self.inner.state.lock().await;

        let displaced = match state.registry.get(&incoming.key) {
            None => None,
            Some(existing) if existing.same_descriptor(&incoming) => {
                // idempotent no-op
                return Ok(());
            }
            Some(existing) => Some(existing.clone()),
        };

        if let Some(ref old) = displaced {
            // the old binding must be fully stopped before its
            // replacement starts
            self.stop_instance(old).await;
        }

        let key = incoming.key.clone();
        state.registry.insert(incoming.clone());
        if state.enabled {
            let running = self.start_instance(&incoming).await;
            state.registry.mark_running(&key, running);
        }

        if displaced.is_some() {
            drop(state);
            self.schedule_restart();
        }
        Ok(())
    }

    /// Stop and remove every instance the selector matches, clear that
    /// interface's membership sets, and schedule a restart.
    pub async fn deregister(&self, selector: &SpoofSelector) -> Result<(), CoreError> {
        let removed = {
            let mut state = self.inner.state.lock().await;
            state.registry.remove_matching(selector)
        };
        if removed.is_empty() {
            return Ok(());
        }

        for instance in &removed {
            self.stop_instance(instance).await;
        }
        self.clear_interface_membership(&selector.interface).await?;
        self.schedule_restart();
        Ok(())
    }

    // ── Global switch ────────────────────────────────────────────────

    /// Flip the switch on and start every registered instance.
    /// No-op when already started.
    pub async fn start_all(&self) -> Result<(), CoreError> {
        let mut state = self.inner.state.lock().await;
        if state.enabled {
            return Ok(());
        }

        info!("starting traffic interception");

        // all membership sets are rebuilt from scratch after startup
        self.clear_global_membership().await?;

        if let Err(e) = self.inner.backend.cleanup_instance_configs().await {
            warn!(error = %e, "failed to clean up stale instance configs");
        }

        let instances = state.registry.snapshot();
        for instance in instances {
            let running = self.start_instance(&instance).await;
            state.registry.mark_running(&instance.key, running);
        }

        state.enabled = true;
        drop(state);
        self.schedule_restart();
        Ok(())
    }

    /// Flip the switch off and stop every registered instance
    /// (best-effort; a failed stop does not block the rest).
    pub async fn stop_all(&self) -> Result<(), CoreError> {
        let mut state = self.inner.state.lock().await;
        state.enabled = false;

        let instances = state.registry.snapshot();
        for instance in instances {
            self.stop_instance(&instance).await;
            state.registry.mark_running(&instance.key, false);
        }

        drop(state);
        self.schedule_restart();
        Ok(())
    }

    // ── Debounced process restart ────────────────────────────────────

    /// Schedule the debounced bounce of the OS-level processes: stop
    /// both families unconditionally, then start both iff the switch is
    /// on. The families share one supervision unit and are always
    /// restarted together, whichever one changed.
    pub fn schedule_restart(&self) {
        let this = self.clone();
        self.inner.restart.schedule(move || async move {
            let backend = &this.inner.backend;

            // stop first so no process keeps running with partial state
            for family in [AddressFamily::V4, AddressFamily::V6] {
                let _ = backend.stop_service(family).await;
            }

            if this.inner.state.lock().await.enabled {
                for family in [AddressFamily::V4, AddressFamily::V6] {
                    if let Err(e) = backend.start_service(family).await {
                        warn!(%family, error = %e, "failed to start interception service");
                    }
                }
            }
        });
    }

    // ── Membership resync ────────────────────────────────────────────

    /// Full resync of per-device monitored/unmonitored membership.
    ///
    /// Clears all membership sets, then files each active device under
    /// exactly one of monitored / unmonitored per its manual-override
    /// flag. A demoted device stays in `unmonitored_hosts` only for a
    /// grace period; `unmonitored_hosts_all` keeps it permanently.
    pub async fn resync_membership(&self, active_devices: &[ActiveDevice]) -> Result<(), CoreError> {
        info!(devices = active_devices.len(), "resyncing spoof membership");

        self.clear_global_membership().await?;
        for device in active_devices {
            self.resync_device(device).await?;
        }
        Ok(())
    }

    async fn resync_device(&self, device: &ActiveDevice) -> Result<(), CoreError> {
        let store = &self.inner.store;
        let record = store.hgetall(&keys::host_record(&device.mac)).await?;

        let Some(ip) = record.get("ipv4Addr").cloned() else {
            warn!(mac = %device.mac, "active device has no v4 address, skipping");
            return Ok(());
        };
        let monitored = record.get("manualSpoof").map(String::as_str) == Some("1");

        if monitored {
            store.sadd(keys::MONITORED_HOSTS, &ip).await?;
            store.srem(keys::UNMONITORED_HOSTS, &ip).await?;
            store.srem(keys::UNMONITORED_HOSTS_ALL, &ip).await?;
        } else {
            store.srem(keys::MONITORED_HOSTS, &ip).await?;
            store.sadd(keys::UNMONITORED_HOSTS, &ip).await?;
            store.sadd(keys::UNMONITORED_HOSTS_ALL, &ip).await?;

            // grace window so rapidly-flapping devices do not churn
            // downstream consumers of the unmonitored set
            let store = Arc::clone(&self.inner.store);
            let grace = self.inner.demotion_grace;
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                if let Err(e) = store.srem(keys::UNMONITORED_HOSTS, &ip).await {
                    warn!(error = %e, "failed to expire demoted host");
                }
            });
        }
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Add a v6 address straight to the monitored set. Errors on a
    /// malformed address; v4 addresses are covered by instance
    /// registration and need no direct entry.
    pub async fn direct_spoof(&self, ip: &str) -> Result<(), CoreError> {
        match ip.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => {
                self.inner.store.sadd(keys::MONITORED_HOSTS6, ip).await?;
                Ok(())
            }
            Ok(IpAddr::V4(_)) => Ok(()),
            Err(_) => Err(CoreError::InvalidAddress(ip.to_owned())),
        }
    }

    /// Liveness of the interception process.
    pub async fn is_process_running(&self) -> bool {
        self.inner.backend.service_running(AddressFamily::V4).await
    }

    /// Whether an address is actively spoofed: the process must be alive
    /// and the address in the monitored set.
    pub async fn is_spoofed(&self, ip: &str) -> Result<bool, CoreError> {
        if !self.is_process_running().await {
            warn!("interception service is not running (yet)");
            return Ok(false);
        }
        Ok(self.inner.store.sismember(keys::MONITORED_HOSTS, ip).await?)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    async fn start_instance(&self, instance: &SpoofInstance) -> bool {
        match self.inner.backend.start_instance(instance).await {
            Ok(()) => true,
            Err(e) => {
                // no retry beyond the next debounce cycle
                warn!(key = %instance.key, error = %e, "failed to start spoof instance");
                false
            }
        }
    }

    async fn stop_instance(&self, instance: &SpoofInstance) {
        if let Err(e) = self.inner.backend.stop_instance(instance).await {
            warn!(key = %instance.key, error = %e, "failed to stop spoof instance");
        }
    }

    async fn clear_global_membership(&self) -> Result<(), CoreError> {
        let store = &self.inner.store;
        for key in [
            keys::MONITORED_HOSTS,
            keys::UNMONITORED_HOSTS,
            keys::UNMONITORED_HOSTS_ALL,
            keys::MONITORED_HOSTS6,
            keys::UNMONITORED_HOSTS6,
        ] {
            store.del(key).await?;
        }
        Ok(())
    }

    async fn clear_interface_membership(&self, interface: &str) -> Result<(), CoreError> {
        let store = &self.inner.store;
        store.del(&keys::monitored_hosts_intf(interface)).await?;
        store.del(&keys::unmonitored_hosts_intf(interface)).await?;
        store.del(&keys::monitored_hosts6_intf(interface)).await?;
        Ok(())
    }

    fn parse_pair(peer_ip: &str, self_ip: &str, family: AddressFamily) -> Option<(IpAddr, IpAddr)> {
        let peer: IpAddr = match peer_ip.parse() {
            Ok(ip) => ip,
            Err(_) => {
                warn!(peer_ip, "malformed peer address, skipping registration");
                return None;
            }
        };
        let own: IpAddr = match self_ip.parse() {
            Ok(ip) => ip,
            Err(_) => {
                warn!(self_ip, "malformed self address, skipping registration");
                return None;
            }
        };
        if AddressFamily::of(peer) != family || AddressFamily::of(own) != family {
            warn!(peer_ip, self_ip, %family, "address family mismatch, skipping registration");
            return None;
        }
        Some((peer, own))
    }
}
