// ── Signal bus ──
//
// Typed publish/subscribe used to decouple "who changed the network"
// from "how we converge". Channel identity is the whole payload.

use tokio::sync::broadcast;
use tracing::trace;

const SIGNAL_CHANNEL_SIZE: usize = 64;

/// Control-plane signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The router daemon confirms a config change took effect.
    ConfigApplied,
    /// Some component requests network re-evaluation.
    NetworkChanged,
    /// A reconcile successfully republished network info.
    NetworkInfoUpdated,
}

/// Broadcast bus for [`Signal`]s.
///
/// Cheaply cloneable; subscribers get an explicit receiver handle.
/// Publishing with no subscribers is not an error.
#[derive(Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<Signal>,
}

impl SignalBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SIGNAL_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn publish(&self, signal: Signal) {
        trace!(?signal, "publishing signal");
        let _ = self.tx.send(signal);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_signals() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe();

        bus.publish(Signal::NetworkChanged);
        bus.publish(Signal::NetworkInfoUpdated);

        assert_eq!(rx.recv().await.unwrap(), Signal::NetworkChanged);
        assert_eq!(rx.recv().await.unwrap(), Signal::NetworkInfoUpdated);
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = SignalBus::new();
        bus.publish(Signal::ConfigApplied);
    }
}
