// Shared transport configuration for building reqwest::Client instances.
//
// The router daemon listens on plain HTTP on the loopback/management
// network, so there is no TLS or credential handling here — just timeout
// and builder mechanics, kept in one place.

use std::time::Duration;

/// Transport configuration for the router daemon HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("gatewatch/0.1.0")
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
