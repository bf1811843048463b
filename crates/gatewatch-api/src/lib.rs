//! Async client for the gateway's router daemon.
//!
//! The router daemon owns interface, routing, DNS, and DHCP configuration
//! for the gateway. This crate exposes the small JSON surface the control
//! plane consumes:
//!
//! - [`RouterClient::active_config`] — `GET /config/active`
//! - [`RouterClient::wan_interfaces`] — `GET /config/wans`
//! - [`RouterClient::lan_interfaces`] — `GET /config/lans`
//! - [`RouterClient::interfaces`] — `GET /config/interfaces`
//! - [`RouterClient::set_config`] — `POST /config/set`
//!
//! Any non-2xx response is an [`Error::Api`]. Config payloads stay raw
//! (`serde_json::Value`); interpreting them is `gatewatch-core`'s job.

pub mod client;
pub mod error;
pub mod transport;

pub use client::RouterClient;
pub use error::Error;
pub use transport::TransportConfig;
