//! Gateway control plane: network topology reconciliation and spoof
//! lifecycle management.
//!
//! The control plane keeps three things converged:
//!
//! - the **topology** — the interface map fetched from the router daemon
//!   (or synthesized via discovery on unmanaged deployments), flattened
//!   into per-interface records and published through the state store
//!   ([`TopologyReconciler`]);
//! - the **config history** — a per-mode, time-ordered ledger of accepted
//!   router configurations ([`ConfigHistoryLedger`]);
//! - the **interception layer** — ARP/NDP spoof instances and the
//!   OS-level processes that execute them ([`SpoofLifecycleManager`]).
//!
//! Components communicate through a typed [`SignalBus`] and converge via
//! debounced reloads rather than inline cascades: pushing a config
//! publishes a signal, the reconciler picks it up after a quiet window,
//! and a burst of changes collapses into one reconcile.

pub mod debounce;
pub mod error;
pub mod history;
pub mod model;
pub mod process;
pub mod signal;
pub mod spoof;
pub mod store;
pub mod topology;

pub use debounce::DebounceScheduler;
pub use error::CoreError;
pub use history::{ConfigHistoryLedger, ConfigSnapshot};
pub use model::{
    AddressFamily, Interface, InterfaceType, Mode, NetworkInfo, RouterConfig, SpoofInstance,
    SpoofKey, SpoofSelector,
};
pub use process::{InterceptionBackend, InterfaceDiscovery, MonitorSupervisor, SystemdInterception};
pub use signal::{Signal, SignalBus};
pub use spoof::{ActiveDevice, SpoofInstanceRegistry, SpoofLifecycleManager};
pub use store::{MemoryStore, StateStore, StoreError};
pub use topology::{RestartImpact, TopologyReconciler, TopologySnapshot};
