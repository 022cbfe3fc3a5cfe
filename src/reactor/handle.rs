//! # Loop handle: scheduling primitives shared with callbacks.
//!
//! [`LoopHandle`] is a thin, cloneable view over the reactor's queues. It is
//! `Send + Sync`: callbacks, hooks, test bodies and even other threads may
//! schedule work through it; the loop is woken through a [`Notify`].
//!
//! ## Queues
//! ```text
//! schedule_once(d, f) ──► timers   BTreeMap<(deadline, id), f>
//! defer(f)            ──► ticks    VecDeque<f>
//! cancel(id)          ──► timers.remove(deadline(id), id)
//! stop()              ──► stop token cancelled (only while running)
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Boxed loop callback.
pub(crate) type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Handle of a single-shot timer created by [`LoopHandle::schedule_once`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Lifecycle of the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Not started yet; work may be queued ahead of `run`.
    Idle,
    /// `Reactor::run` is driving callbacks.
    Running,
    /// The loop exited; new work is dropped.
    Stopped,
}

pub(crate) struct State {
    pub(crate) phase: Phase,
    next_id: u64,
    timers: BTreeMap<(Instant, u64), Callback>,
    deadlines: HashMap<u64, Instant>,
    pub(crate) ticks: VecDeque<Callback>,
    pub(crate) stop: CancellationToken,
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<State>,
    pub(crate) wake: Notify,
}

impl Shared {
    /// Removes every callback that is ready to run at `now`.
    ///
    /// Due timers come first (deadline order), then the ticks queued so far.
    pub(crate) fn take_ready(&self, now: Instant) -> Vec<Callback> {
        let mut st = self.state.lock();
        let mut ready = Vec::new();
        while let Some(entry) = st.timers.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ((_, id), cb) = entry.remove_entry();
            st.deadlines.remove(&id);
            ready.push(cb);
        }
        ready.extend(st.ticks.drain(..));
        ready
    }

    /// Earliest pending timer deadline.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.state.lock().timers.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Marks the loop stopped and hands back everything still queued.
    ///
    /// The caller drops the leftovers outside the lock.
    pub(crate) fn close(&self) -> Vec<Callback> {
        let mut st = self.state.lock();
        st.phase = Phase::Stopped;
        st.deadlines.clear();
        let timers = std::mem::take(&mut st.timers);
        let mut leftovers: Vec<Callback> = st.ticks.drain(..).collect();
        leftovers.extend(timers.into_values());
        leftovers
    }
}

/// Cloneable handle to a [`Reactor`](crate::Reactor).
///
/// ### Properties
/// - **Non-blocking**: every method returns immediately.
/// - **Cloneable**: cheap to clone (internally an `Arc`).
/// - **Thread-safe**: may be used from any thread; callbacks still run on the loop thread.
#[derive(Clone)]
pub struct LoopHandle {
    pub(crate) shared: Arc<Shared>,
}

impl LoopHandle {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    next_id: 0,
                    timers: BTreeMap::new(),
                    deadlines: HashMap::new(),
                    ticks: VecDeque::new(),
                    stop: CancellationToken::new(),
                }),
                wake: Notify::new(),
            }),
        }
    }

    /// Schedules `f` to run once, `delay` from now.
    ///
    /// Returns a [`TimerId`] usable with [`LoopHandle::cancel`]. If the loop has
    /// already stopped, `f` is dropped and the returned id is inert.
    pub fn schedule_once<F>(&self, delay: Duration, f: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let mut st = self.shared.state.lock();
        let id = st.next_id;
        st.next_id += 1;
        if st.phase == Phase::Stopped {
            drop(st);
            tracing::trace!(timer = id, "loop stopped; timer dropped");
            return TimerId(id);
        }
        st.timers.insert((deadline, id), Box::new(f));
        st.deadlines.insert(id, deadline);
        drop(st);
        self.shared.wake.notify_one();
        TimerId(id)
    }

    /// Cancels a pending timer.
    ///
    /// Returns `true` if the timer was still pending, `false` if it already
    /// fired, was cancelled before, or was dropped with a stopped loop.
    pub fn cancel(&self, id: TimerId) -> bool {
        let removed = {
            let mut st = self.shared.state.lock();
            match st.deadlines.remove(&id.0) {
                Some(deadline) => st.timers.remove(&(deadline, id.0)),
                None => None,
            }
        };
        removed.is_some()
    }

    /// Defers `f` to the next loop iteration.
    ///
    /// A callback deferred while an iteration is running never runs in that
    /// same iteration; this lets the current callback chain unwind first.
    pub fn defer<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut st = self.shared.state.lock();
        if st.phase == Phase::Stopped {
            drop(st);
            tracing::trace!("loop stopped; deferred callback dropped");
            return;
        }
        st.ticks.push_back(Box::new(f));
        drop(st);
        self.shared.wake.notify_one();
    }

    /// Asks the running loop to stop after the current callback.
    ///
    /// No-op when the loop is not running.
    pub fn stop(&self) {
        let st = self.shared.state.lock();
        if st.phase == Phase::Running {
            st.stop.cancel();
        }
    }

    /// True from loop start until the loop has exited.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().phase == Phase::Running
    }

    /// Number of timers still pending.
    pub fn pending_timers(&self) -> usize {
        self.shared.state.lock().deadlines.len()
    }
}

impl std::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.shared.state.lock();
        f.debug_struct("LoopHandle")
            .field("phase", &st.phase)
            .field("timers", &st.deadlines.len())
            .field("ticks", &st.ticks.len())
            .finish()
    }
}
