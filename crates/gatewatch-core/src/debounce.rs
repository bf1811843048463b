// ── Debounce scheduler ──
//
// Coalesces bursts of trigger signals into one delayed action. Arming
// cancels any previously armed timer (latest wins, never queued); once
// the quiet period elapses the action runs to completion and cannot be
// cancelled mid-flight — it can only be superseded by the next run.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A cancellable coalescing timer.
///
/// At most one pending action exists per scheduler; `schedule()` replaces
/// it and resets the quiet window.
pub struct DebounceScheduler {
    quiet: Duration,
    pending: Arc<Mutex<Option<(u64, CancellationToken)>>>,
    generation: Mutex<u64>,
}

impl DebounceScheduler {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: Arc::new(Mutex::new(None)),
            generation: Mutex::new(0),
        }
    }

    /// Arm the timer, cancelling any pending one. After the quiet period
    /// the action future is produced and awaited on a background task.
    pub fn schedule<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let token = CancellationToken::new();
        let generation = {
            let mut gen_guard = self.generation.lock().expect("generation lock poisoned");
            *gen_guard += 1;
            *gen_guard
        };

        {
            let mut slot = self.pending.lock().expect("pending lock poisoned");
            if let Some((_, prev)) = slot.replace((generation, token.clone())) {
                prev.cancel();
            }
        }

        let quiet = self.quiet;
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(quiet) => {
                    // Clear the slot first: the action must observe no
                    // pending timer, and a re-arm during the action must
                    // not be clobbered afterwards.
                    {
                        let mut slot = pending.lock().expect("pending lock poisoned");
                        if matches!(*slot, Some((g, _)) if g == generation) {
                            *slot = None;
                        }
                    }
                    action().await;
                }
            }
        });
    }

    /// Drop any pending action without running it.
    pub fn cancel(&self) {
        let mut slot = self.pending.lock().expect("pending lock poisoned");
        if let Some((_, token)) = slot.take() {
            token.cancel();
        }
    }

    /// Whether an action is armed and waiting for the quiet period.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .expect("pending lock poisoned")
            .is_some()
    }
}
