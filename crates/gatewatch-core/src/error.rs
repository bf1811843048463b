use thiserror::Error;

/// Top-level error type for the `gatewatch-core` crate.
///
/// The fatal/transient split matters: a failed topology fetch leaves the
/// control plane with no usable interface map, so the embedding process
/// is expected to treat it as unrecoverable ([`CoreError::is_fatal`]) and
/// let its supervisor restart the whole service. Everything else is
/// either logged-and-skipped or surfaced as an ordinary result.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Fatal: no usable topology downstream ────────────────────────
    /// Fetch from the router daemon failed during reconcile.
    #[error("router daemon request failed: {0}")]
    Router(#[from] gatewatch_api::Error),

    /// Unmanaged deployment and the discovery probe found no usable interface.
    #[error("no active ethernet interface found")]
    NoActiveInterface,

    // ── Recoverable ─────────────────────────────────────────────────
    /// Persistent store operation failed.
    #[error("state store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// External interception process control failed.
    #[error("interception process control failed: {0}")]
    Process(String),

    // ── Validation ──────────────────────────────────────────────────
    /// Malformed IP address in an operation input.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Operation needs the router daemon but this deployment has none.
    #[error("router daemon is not managed on this deployment")]
    NotManaged,

    /// No configuration history exists for the requested mode.
    #[error("no config history for mode '{0}'")]
    NoConfigHistory(String),

    /// Mode has no config-push semantics (e.g. dhcp/none).
    #[error("mode '{0}' does not support config replay")]
    UnsupportedMode(String),

    /// Payload decoding failed.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns `true` when the control plane cannot continue operating —
    /// the caller owns the restart-vs-halt policy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Router(_) | Self::NoActiveInterface)
    }
}
