// ── Spoof instance identity ──
//
// A spoof instance is one traffic-interception binding for
// (interface, address family, peer). Keys are structured values with an
// explicit match predicate — deregistration selects by interface+family
// and optionally narrows to an exact peer, instead of matching key
// strings against wildcard patterns.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Address family of an interception binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn is_v6(self) -> bool {
        self == Self::V6
    }

    /// The family an address belongs to.
    pub fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

/// Registry key for a spoof instance.
///
/// IPv4 interception targets exactly one upstream router, so the v4 key
/// is per-interface and carries no peer. IPv6 allows one instance per
/// distinct peer address on the same interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpoofKey {
    pub interface: String,
    pub family: AddressFamily,
    pub peer: Option<IpAddr>,
}

impl SpoofKey {
    pub fn v4(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            family: AddressFamily::V4,
            peer: None,
        }
    }

    pub fn v6(interface: impl Into<String>, peer: IpAddr) -> Self {
        Self {
            interface: interface.into(),
            family: AddressFamily::V6,
            peer: Some(peer),
        }
    }

    /// The key for a (interface, peer, family) registration.
    pub fn for_registration(interface: &str, peer: IpAddr, family: AddressFamily) -> Self {
        match family {
            AddressFamily::V4 => Self::v4(interface),
            AddressFamily::V6 => Self::v6(interface, peer),
        }
    }
}

impl fmt::Display for SpoofKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peer {
            Some(peer) => write!(f, "{}_{}_{}", self.interface, self.family, peer),
            None => write!(f, "{}_{}", self.interface, self.family),
        }
    }
}

/// Deregistration selector: exact peer match, or any peer when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoofSelector {
    pub interface: String,
    pub family: AddressFamily,
    pub peer: Option<IpAddr>,
}

impl SpoofSelector {
    /// Select the (single) v4 instance on an interface.
    pub fn v4(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            family: AddressFamily::V4,
            peer: None,
        }
    }

    /// Select v6 instances on an interface: all of them, or one peer.
    pub fn v6(interface: impl Into<String>, peer: Option<IpAddr>) -> Self {
        Self {
            interface: interface.into(),
            family: AddressFamily::V6,
            peer,
        }
    }

    /// Whether a registry key falls under this selector.
    pub fn matches(&self, key: &SpoofKey) -> bool {
        if key.interface != self.interface || key.family != self.family {
            return false;
        }
        match self.peer {
            Some(peer) => key.peer == Some(peer),
            None => true,
        }
    }
}

/// One registered traffic-interception binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoofInstance {
    pub key: SpoofKey,
    pub interface: String,
    /// The upstream router (or DNS peer) being impersonated.
    pub peer_ip: IpAddr,
    /// The gateway's own address on the interface.
    pub self_ip: IpAddr,
    pub family: AddressFamily,
    pub running: bool,
}

impl SpoofInstance {
    pub fn new(interface: &str, peer_ip: IpAddr, self_ip: IpAddr, family: AddressFamily) -> Self {
        Self {
            key: SpoofKey::for_registration(interface, peer_ip, family),
            interface: interface.to_owned(),
            peer_ip,
            self_ip,
            family,
            running: false,
        }
    }

    /// Descriptor equality — everything except the runtime `running` flag.
    pub fn same_descriptor(&self, other: &Self) -> bool {
        self.interface == other.interface
            && self.peer_ip == other.peer_ip
            && self.self_ip == other.self_ip
            && self.family == other.family
    }
}
