// ── Config history ledger ──
//
// Append-only, per-mode, time-ordered store of router config snapshots.
// Dedup against the most recent entry is the reconciler's job — the
// ledger itself just appends and reads.

use std::sync::Arc;

use tracing::{error, warn};

use crate::error::CoreError;
use crate::model::{Mode, RouterConfig};
use crate::store::{StateStore, keys};

const DEFAULT_RECENT_COUNT: usize = 10;

/// One accepted configuration snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub config: RouterConfig,
    /// Unix timestamp (seconds) at which the snapshot was accepted.
    pub timestamp: i64,
}

/// Per-mode config snapshot history over the persistent store.
pub struct ConfigHistoryLedger {
    store: Arc<dyn StateStore>,
}

impl ConfigHistoryLedger {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Append a snapshot under the mode's history.
    ///
    /// A missing mode or a null config is logged and skipped — never an
    /// error past this boundary.
    pub async fn append(
        &self,
        mode: &Mode,
        config: &RouterConfig,
        timestamp: i64,
    ) -> Result<(), CoreError> {
        if Self::mode_is_missing(mode) || config.as_value().is_null() {
            error!("cannot save config history, config or mode is not specified");
            return Ok(());
        }

        let serialized = serde_json::to_string(config)?;
        self.store
            .zadd(&keys::config_history(mode), timestamp, &serialized)
            .await?;
        Ok(())
    }

    /// The most recent snapshot for a mode, if any.
    pub async fn load_last(&self, mode: &Mode) -> Result<Option<ConfigSnapshot>, CoreError> {
        let mut recent = self.load_recent(mode, 1).await?;
        Ok(if recent.is_empty() {
            None
        } else {
            Some(recent.remove(0))
        })
    }

    /// Up to `count` snapshots for a mode, most-recent-first.
    /// Unparsable entries are skipped with a log.
    pub async fn load_recent(
        &self,
        mode: &Mode,
        count: usize,
    ) -> Result<Vec<ConfigSnapshot>, CoreError> {
        if Self::mode_is_missing(mode) {
            error!("cannot load config history, mode is not specified");
            return Ok(Vec::new());
        }
        let count = if count == 0 { DEFAULT_RECENT_COUNT } else { count };

        let rows = self
            .store
            .zrevrange(&keys::config_history(mode), 0, count.saturating_sub(1))
            .await?;

        let mut history = Vec::with_capacity(rows.len());
        for (raw, timestamp) in rows {
            match serde_json::from_str::<RouterConfig>(&raw) {
                Ok(config) => history.push(ConfigSnapshot { config, timestamp }),
                Err(e) => warn!(error = %e, "skipping unparsable config history entry"),
            }
        }
        Ok(history)
    }

    fn mode_is_missing(mode: &Mode) -> bool {
        matches!(mode, Mode::Unknown(s) if s.is_empty())
    }
}
