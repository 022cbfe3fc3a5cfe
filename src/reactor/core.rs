//! # Reactor: drives loop callbacks on the calling thread.
//!
//! [`Reactor::run`] builds a current-thread tokio runtime, queues the start
//! callback and blocks until [`LoopHandle::stop`] is called (or a callback
//! panics). Timers wait with `tokio::time::sleep_until`.
//!
//! ## Exit paths
//! ```text
//! stop() ──► stop token cancelled ──► drive() returns Ok(())
//! callback panics ─────────────────► drive() returns Err(Panicked) (payload kept)
//! runtime build fails ─────────────► Err(Runtime)                  (start never runs)
//! called inside a runtime ─────────► Err(NestedRuntime)            (start never runs)
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{PanicPayload, ReactorError};

use super::handle::{LoopHandle, Phase, Shared};

/// Single-threaded callback loop.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use evented_spec::Reactor;
///
/// let reactor = Reactor::new();
/// let handle = reactor.handle();
/// reactor
///     .run(move || {
///         let h = handle.clone();
///         handle.schedule_once(Duration::from_millis(10), move || h.stop());
///     })
///     .unwrap();
/// assert!(!reactor.handle().is_running());
/// ```
#[derive(Debug)]
pub struct Reactor {
    handle: LoopHandle,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    /// Creates an idle reactor.
    pub fn new() -> Self {
        Self {
            handle: LoopHandle::new(),
        }
    }

    /// Returns a handle for scheduling work on this reactor.
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Starts the loop, runs `start` in its first iteration and blocks until stopped.
    ///
    /// Work queued through the handle before `run` is kept and runs after `start`.
    /// When the loop exits, everything still queued is dropped.
    pub fn run<F>(&self, start: F) -> Result<(), ReactorError>
    where
        F: FnOnce() + Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ReactorError::NestedRuntime);
        }

        let shared = &self.handle.shared;
        let stop = {
            let mut st = shared.state.lock();
            if st.phase == Phase::Running {
                return Err(ReactorError::AlreadyRunning);
            }
            st.phase = Phase::Running;
            st.stop = CancellationToken::new();
            st.ticks.push_front(Box::new(start));
            st.stop.clone()
        };

        let result = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|source| ReactorError::Runtime { source })
            .and_then(|rt| rt.block_on(drive(shared, &stop)));

        let leftovers = shared.close();
        if !leftovers.is_empty() {
            tracing::trace!(dropped = leftovers.len(), "loop exited with pending callbacks");
        }
        drop(leftovers);
        result
    }
}

/// Main loop: run ready batches, otherwise wait for work, a deadline or stop.
async fn drive(shared: &Shared, stop: &CancellationToken) -> Result<(), ReactorError> {
    loop {
        if stop.is_cancelled() {
            return Ok(());
        }

        let batch = shared.take_ready(Instant::now());
        if batch.is_empty() {
            let next = shared.next_deadline();
            tokio::select! {
                _ = stop.cancelled() => return Ok(()),
                _ = shared.wake.notified() => {}
                _ = sleep_until(next) => {}
            }
            continue;
        }

        for cb in batch {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(cb)) {
                let payload = PanicPayload::new(payload);
                return Err(ReactorError::Panicked {
                    message: payload.message(),
                    payload,
                });
            }
            if stop.is_cancelled() {
                return Ok(());
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
