//! Timer capability for the player controller.
//!
//! The controller never sleeps. It asks a [`Clock`] to deliver a [`Timer`]
//! later and reacts when the owner of the clock hands that timer back through
//! `PlayerController::on_timer`. Two implementations exist:
//!
//! - [`ManualClock`]: simulated time, driven explicitly (tests, deterministic
//!   embedding).
//! - [`TokioClock`]: one `tokio::time::sleep` task per timer, fired timers are
//!   sent over an unbounded channel consumed by the player session.
//!
//! Cancelling through the clock is best effort; a timer may already sit in a
//! channel when it is cancelled. The controller therefore also checks the
//! attempt identity carried by every timer.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// What a timer means to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Escalate if nothing has started since the latest load
    Stall,
    /// Absolute ceiling from `start`
    Hard,
    /// One second of the escalation countdown elapsed
    Countdown,
}

/// A scheduled callback, tagged with the attempt it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    /// Attempt generation at scheduling time
    pub generation: u64,
    /// Controller-assigned sequence, unique per scheduled timer
    pub seq: u64,
}

/// Clock-assigned handle used to cancel a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

pub trait Clock {
    /// Monotonic time since the clock was created
    fn now(&self) -> Duration;

    fn schedule(&mut self, after: Duration, timer: Timer) -> TimerHandle;

    fn cancel(&mut self, handle: TimerHandle);
}

/// Simulated clock; time only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Duration,
    next_handle: u64,
    pending: BTreeMap<(Duration, TimerHandle), Timer>,
    due_by_handle: HashMap<TimerHandle, Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the earliest timer due at or before `until`,
    /// moving the clock to its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<Timer> {
        let (&(due, handle), _) = self.pending.first_key_value()?;
        if due > until {
            return None;
        }
        let timer = self.pending.remove(&(due, handle))?;
        self.due_by_handle.remove(&handle);
        self.now = self.now.max(due);
        Some(timer)
    }

    /// Move time forward without firing anything
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(due, _)| *due)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn schedule(&mut self, after: Duration, timer: Timer) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        let due = self.now + after;
        self.pending.insert((due, handle), timer);
        self.due_by_handle.insert(handle, due);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(due) = self.due_by_handle.remove(&handle) {
            self.pending.remove(&(due, handle));
        }
    }
}

/// Tokio-backed clock delivering fired timers over a channel
#[derive(Debug)]
pub struct TokioClock {
    origin: tokio::time::Instant,
    next_handle: u64,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    fired: mpsc::UnboundedSender<Timer>,
}

impl TokioClock {
    pub fn new(fired: mpsc::UnboundedSender<Timer>) -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            next_handle: 0,
            tasks: HashMap::new(),
            fired,
        }
    }

    /// Clock plus the receiving end its timers fire into
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Timer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn active_timers(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule(&mut self, after: Duration, timer: Timer) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Receiver gone means the session ended; nothing left to notify.
            let _ = fired.send(timer);
        });
        trace!(?timer, ?after, "timer scheduled");
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
