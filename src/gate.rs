use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Session-scoped pause token. The dealer flips it between rounds and
/// around board mutation; every player checks it at each resumption
/// point. Passed by Arc at construction, never a process-wide static.
pub struct PauseGate {
    paused: Mutex<bool>,
    resumed: Condvar,
}

impl Default for PauseGate {
    fn default() -> Self {
        // The session starts paused: players idle until the first deal.
        Self {
            paused: Mutex::new(true),
            resumed: Condvar::new(),
        }
    }
}

impl PauseGate {
    pub fn pause(&self) {
        *self.paused.lock() = true;
    }

    pub fn resume(&self) {
        let mut paused = self.paused.lock();
        *paused = false;
        self.resumed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Wakes pause-waiters without unpausing, so they can observe a
    /// freshly raised terminate flag.
    pub fn interrupt(&self) {
        let _guard = self.paused.lock();
        self.resumed.notify_all();
    }

    /// Blocks while paused. Rechecks `terminated` at least every `tick`
    /// so cancellation latency stays bounded.
    pub fn wait_while_paused(&self, terminated: &AtomicBool, tick: Duration) {
        let mut paused = self.paused.lock();
        while *paused && !terminated.load(Ordering::SeqCst) {
            self.resumed.wait_for(&mut paused, tick);
        }
    }
}

/// Join-barrier bookkeeping. Players knock after clearing their working
/// flags; the dealer waits until a caller-supplied predicate over those
/// flags reports quiescence. Cooperative drain, not a hard lock.
#[derive(Default)]
pub struct Quiescence {
    lock: Mutex<()>,
    idle: Condvar,
}

impl Quiescence {
    pub fn knock(&self) {
        let _guard = self.lock.lock();
        self.idle.notify_all();
    }

    pub fn wait_until<F>(&self, quiet: F, tick: Duration)
    where
        F: Fn() -> bool,
    {
        let mut guard = self.lock.lock();
        while !quiet() {
            self.idle.wait_for(&mut guard, tick);
        }
    }
}
