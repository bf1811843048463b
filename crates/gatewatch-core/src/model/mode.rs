// ── Operating mode ──
//
// The gateway's operating posture, read from the persistent store at
// reconcile time. Pure input to the monitoring-set derivation: the mode
// itself carries no state beyond its current value.

use strum::{Display, EnumString};

use super::interface::InterfaceType;

/// Gateway operating mode.
///
/// `auto_spoof`, `dhcp`, and `none` are the "simple" postures where the
/// gateway sits beside the router and monitors both sides; `router` means
/// the gateway *is* the router and only LAN traffic is interesting.
#[derive(Debug, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    AutoSpoof,
    Dhcp,
    None,
    Router,
    /// Anything unrecognized (including an unset mode key).
    #[strum(default, to_string = "{0}")]
    Unknown(String),
}

impl Mode {
    /// Parse the raw store value; an absent key is `Unknown("")`.
    pub fn from_store_value(raw: Option<String>) -> Self {
        raw.map_or_else(
            || Self::Unknown(String::new()),
            |s| s.parse().unwrap_or(Self::Unknown(s)),
        )
    }

    /// Whether interfaces of the given type belong to the monitoring set
    /// under this mode.
    pub fn monitors(&self, kind: InterfaceType) -> bool {
        match self {
            // monitor both wan and lan in simple modes
            Self::AutoSpoof | Self::Dhcp | Self::None => {
                matches!(kind, InterfaceType::Wan | InterfaceType::Lan)
            }
            // only monitor lan in router mode
            Self::Router => kind == InterfaceType::Lan,
            Self::Unknown(_) => false,
        }
    }
}
