// ── External process collaborators ──
//
// The interception mechanism itself is an opaque pair of OS services
// (one per address family) driven through the service manager; the
// monitoring supervisor and the discovery probe are likewise external.
// Each is a trait here so the control plane stays testable without a
// live system underneath.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{AddressFamily, NetworkInfo, SpoofInstance};

/// Control surface for the OS-level interception processes.
///
/// Instance operations manage per-binding config the service consumes;
/// service operations bounce the processes themselves.
#[async_trait]
pub trait InterceptionBackend: Send + Sync {
    async fn start_instance(&self, instance: &SpoofInstance) -> Result<(), CoreError>;
    async fn stop_instance(&self, instance: &SpoofInstance) -> Result<(), CoreError>;
    /// Remove all per-instance config left over from previous runs.
    async fn cleanup_instance_configs(&self) -> Result<(), CoreError>;

    async fn stop_service(&self, family: AddressFamily) -> Result<(), CoreError>;
    async fn start_service(&self, family: AddressFamily) -> Result<(), CoreError>;
    /// Process-presence liveness query.
    async fn service_running(&self, family: AddressFamily) -> bool;
}

/// Receiver of the reconciler's "monitored set changed, restart" signal.
#[async_trait]
pub trait MonitorSupervisor: Send + Sync {
    async fn restart_monitoring(&self, interfaces: &[String]) -> Result<(), CoreError>;
}

/// Active-interface discovery probe, used on deployments without a
/// router daemon.
#[async_trait]
pub trait InterfaceDiscovery: Send + Sync {
    /// The interface to monitor (errors if no ethernet is usable).
    async fn active_interface(&self) -> Result<String, CoreError>;
    /// Probe the network and report discovered interface info.
    async fn discover(&self) -> Result<Vec<NetworkInfo>, CoreError>;
}

// ── systemd-backed implementation ───────────────────────────────────

/// Drives the interception services through systemd and writes
/// per-instance binding files into the directory the services read at
/// startup.
pub struct SystemdInterception {
    v4_unit: String,
    v6_unit: String,
    config_dir: PathBuf,
}

impl SystemdInterception {
    pub fn new(v4_unit: impl Into<String>, v6_unit: impl Into<String>, config_dir: PathBuf) -> Self {
        Self {
            v4_unit: v4_unit.into(),
            v6_unit: v6_unit.into(),
            config_dir,
        }
    }

    fn unit(&self, family: AddressFamily) -> &str {
        match family {
            AddressFamily::V4 => &self.v4_unit,
            AddressFamily::V6 => &self.v6_unit,
        }
    }

    fn instance_config_path(&self, instance: &SpoofInstance) -> PathBuf {
        self.config_dir.join(format!("{}.rc", instance.key))
    }

    async fn run(program: &str, args: &[&str]) -> Result<(), CoreError> {
        debug!(program, ?args, "running process control command");
        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|e| CoreError::Process(format!("{program} failed to spawn: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(CoreError::Process(format!(
                "{program} {} exited with {status}",
                args.join(" ")
            )))
        }
    }
}

#[async_trait]
impl InterceptionBackend for SystemdInterception {
    async fn start_instance(&self, instance: &SpoofInstance) -> Result<(), CoreError> {
        let path = self.instance_config_path(instance);
        let line = format!(
            "{} {} {} {}\n",
            instance.interface, instance.peer_ip, instance.self_ip, instance.family
        );
        tokio::fs::write(&path, line)
            .await
            .map_err(|e| CoreError::Process(format!("writing {}: {e}", path.display())))
    }

    async fn stop_instance(&self, instance: &SpoofInstance) -> Result<(), CoreError> {
        let path = self.instance_config_path(instance);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Process(format!(
                "removing {}: {e}",
                path.display()
            ))),
        }
    }

    async fn cleanup_instance_configs(&self) -> Result<(), CoreError> {
        let mut dir = match tokio::fs::read_dir(&self.config_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(CoreError::Process(format!(
                    "reading {}: {e}",
                    self.config_dir.display()
                )));
            }
        };

        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "rc") {
                        if let Err(e) = tokio::fs::remove_file(&path).await {
                            warn!(path = %path.display(), error = %e, "failed to remove stale instance config");
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "error iterating instance config dir");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn stop_service(&self, family: AddressFamily) -> Result<(), CoreError> {
        Self::run("systemctl", &["stop", self.unit(family)]).await
    }

    async fn start_service(&self, family: AddressFamily) -> Result<(), CoreError> {
        Self::run("systemctl", &["restart", self.unit(family)]).await
    }

    async fn service_running(&self, family: AddressFamily) -> bool {
        Self::run("pgrep", &["-x", self.unit(family)]).await.is_ok()
    }
}
