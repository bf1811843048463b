// ── Interface model and NetworkInfo projection ──
//
// `Interface` mirrors the daemon's per-interface blob: a desired-state
// `config` (opaque except `meta`) and an observed `state`. `NetworkInfo`
// is the flattened projection persisted for every other process on the
// gateway that needs to know what the network looks like.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Interface role, from `config.meta.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    Wan,
    Lan,
    #[default]
    #[serde(other)]
    Unknown,
}

/// The typed corner of the config blob: identity and role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InterfaceMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uuid: String,
    #[serde(rename = "type", default)]
    pub kind: InterfaceType,
}

/// Desired interface state. Only `meta` and the WAN gateway/DNS overrides
/// are interpreted; the rest of the blob passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InterfaceConfig {
    #[serde(default)]
    pub meta: InterfaceMeta,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub gateway6: Option<String>,
    #[serde(default)]
    pub nameservers: Option<Vec<String>>,
    #[serde(flatten)]
    pub rest: HashMap<String, Value>,
}

/// Observed interface state as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InterfaceState {
    #[serde(default)]
    pub mac: Option<String>,
    /// IPv4 address in CIDR form, e.g. `192.168.1.2/24`.
    #[serde(default)]
    pub ip4: Option<String>,
    /// IPv6 addresses in CIDR form.
    #[serde(default)]
    pub ip6: Option<Vec<String>>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub gateway6: Option<String>,
    #[serde(default)]
    pub dns: Option<Vec<String>>,
    /// Link carrier flag (1 = link up).
    #[serde(default)]
    pub carrier: Option<i64>,
}

/// One physical/logical network interface: desired config + observed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Interface {
    #[serde(default)]
    pub config: InterfaceConfig,
    #[serde(default)]
    pub state: InterfaceState,
}

impl Interface {
    pub fn name(&self) -> Option<&str> {
        self.config.meta.name.as_deref()
    }

    pub fn uuid(&self) -> &str {
        &self.config.meta.uuid
    }

    pub fn kind(&self) -> InterfaceType {
        self.config.meta.kind
    }
}

// ── NetworkInfo ─────────────────────────────────────────────────────

/// Flattened per-interface record published for external consumers.
///
/// Serialized into `sys:network:info[<name>]` and `sys:network:uuid[<uuid>]`.
/// Both rows are always rebuilt together from one fetch — never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub name: String,
    pub uuid: String,
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
    pub subnet: Option<String>,
    pub netmask: Option<String>,
    pub gateway_ip: Option<String>,
    pub gateway: Option<String>,
    pub ip6_addresses: Option<Vec<String>>,
    pub ip6_subnets: Option<Vec<String>>,
    pub ip6_masks: Option<Vec<String>>,
    pub gateway6: Option<String>,
    pub dns: Option<Vec<String>>,
    pub carrier: bool,
    pub conn_type: String,
    #[serde(rename = "type")]
    pub kind: InterfaceType,
}

impl NetworkInfo {
    /// Project an interface into its published record.
    ///
    /// Gateway and DNS only apply to WAN interfaces — for a LAN interface
    /// the DHCP-served gateway/DNS mean something else entirely and are
    /// left out. Config values win over observed state on WAN.
    pub fn project(name: &str, intf: &Interface) -> Self {
        let v4 = intf.state.ip4.as_deref().and_then(parse_v4_cidr);

        let mut ip6_addresses = Vec::new();
        let mut ip6_masks = Vec::new();
        let mut ip6_subnets = Vec::new();
        for raw in intf.state.ip6.as_deref().unwrap_or_default() {
            // invalid v6 entries are skipped, not fatal
            let Some((addr, prefix)) = parse_v6_cidr(raw) else {
                continue;
            };
            ip6_addresses.push(addr.to_string());
            ip6_masks.push(v6_netmask(prefix).to_string());
            ip6_subnets.push(raw.clone());
        }

        let (gateway, gateway6, dns) = match intf.kind() {
            InterfaceType::Wan => (
                intf.config
                    .gateway
                    .clone()
                    .or_else(|| intf.state.gateway.clone()),
                intf.config
                    .gateway6
                    .clone()
                    .or_else(|| intf.state.gateway6.clone()),
                intf.config
                    .nameservers
                    .clone()
                    .or_else(|| intf.state.dns.clone()),
            ),
            InterfaceType::Lan | InterfaceType::Unknown => (None, None, None),
        };

        Self {
            name: name.to_owned(),
            uuid: intf.config.meta.uuid.clone(),
            mac_address: intf.state.mac.clone(),
            ip_address: v4.map(|(addr, _)| addr.to_string()),
            subnet: intf.state.ip4.clone(),
            netmask: v4.map(|(_, prefix)| v4_netmask(prefix).to_string()),
            gateway_ip: gateway.clone(),
            gateway,
            ip6_addresses: (!ip6_addresses.is_empty()).then_some(ip6_addresses),
            ip6_subnets: (!ip6_subnets.is_empty()).then_some(ip6_subnets),
            ip6_masks: (!ip6_masks.is_empty()).then_some(ip6_masks),
            gateway6,
            dns,
            carrier: intf.state.carrier == Some(1),
            conn_type: "Wired".to_owned(),
            kind: intf.kind(),
        }
    }
}

// ── Address helpers ─────────────────────────────────────────────────

/// Parse `a.b.c.d/len`; a bare address gets /32.
fn parse_v4_cidr(raw: &str) -> Option<(Ipv4Addr, u8)> {
    let (addr, prefix) = split_cidr(raw)?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix = prefix.unwrap_or(32);
    (prefix <= 32).then_some((addr, prefix))
}

/// Parse `addr/len`; a bare address gets /128.
fn parse_v6_cidr(raw: &str) -> Option<(Ipv6Addr, u8)> {
    let (addr, prefix) = split_cidr(raw)?;
    let addr: Ipv6Addr = addr.parse().ok()?;
    let prefix = prefix.unwrap_or(128);
    (prefix <= 128).then_some((addr, prefix))
}

fn split_cidr(raw: &str) -> Option<(&str, Option<u8>)> {
    match raw.split_once('/') {
        Some((addr, len)) => Some((addr, Some(len.parse().ok()?))),
        None => Some((raw, None)),
    }
}

fn v4_netmask(prefix: u8) -> Ipv4Addr {
    let bits = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };
    Ipv4Addr::from(bits)
}

fn v6_netmask(prefix: u8) -> Ipv6Addr {
    let bits = if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    };
    Ipv6Addr::from(bits)
}
