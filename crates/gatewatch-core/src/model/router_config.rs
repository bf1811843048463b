// ── Router configuration blob ──
//
// The daemon's full configuration is opaque to the control plane except
// for the default-route section, which decides the default WAN.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The full raw configuration blob from the router daemon.
///
/// Structural equality is JSON value equality — that is what decides
/// whether a new snapshot enters the history ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouterConfig(Value);

impl RouterConfig {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The interface carrying the global default route.
    ///
    /// `routing.global.default.viaIntf` wins; for a load-balanced default
    /// route the first next hop is used.
    pub fn default_wan(&self) -> Option<&str> {
        let default_route = self.0.pointer("/routing/global/default")?;

        if let Some(via) = default_route.get("viaIntf").and_then(Value::as_str) {
            return Some(via);
        }

        default_route
            .get("nextHops")
            .and_then(Value::as_array)
            .and_then(|hops| hops.first())
            .and_then(|hop| hop.get("viaIntf"))
            .and_then(Value::as_str)
    }
}

impl From<Value> for RouterConfig {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
