// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Level-triggered, coalescing single-worker task runner.
//!
//! The reactor serializes every invocation of its callback: at most one
//! runs at any time. `update()` requests at least one more run; any number
//! of requests arriving during an in-flight run collapse into exactly one
//! follow-up run. Independently, the callback runs every `interval` even
//! without updates, so missed notifications cannot cause divergence.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of one callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The callback ran to completion.
    Completed,
    /// The callback observed cancellation; the worker exits.
    Interrupted,
}

/// The single-method capability the reactor drives.
#[async_trait]
pub trait TickFn: Send + Sync {
    async fn tick(&self) -> Tick;
}

/// Cheap clonable handle for requesting runs.
///
/// The underlying notifier stores at most one pending permit, which is what
/// coalesces requests made during an in-flight run into one follow-up run.
#[derive(Clone, Default)]
pub struct ReactorHandle {
    notify: Arc<Notify>,
}

impl ReactorHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the callback run at least once more after this returns.
    /// Non-blocking; safe from any thread. Discarded once the reactor is
    /// shutting down.
    pub fn update(&self) {
        self.notify.notify_one();
    }
}

/// Single-worker runner with a timed refresh.
pub struct Reactor {
    name: String,
    interval: Duration,
    handle: ReactorHandle,
    tick_fn: Arc<dyn TickFn>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Reactor {
    /// The handle is taken as an argument (rather than minted internally) so
    /// the callback can hold a clone without referencing the reactor itself.
    pub fn new(
        name: impl Into<String>,
        handle: ReactorHandle,
        tick_fn: Arc<dyn TickFn>,
        interval: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            interval,
            handle,
            tick_fn,
            cancel: CancellationToken::new(),
            worker: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> ReactorHandle {
        self.handle.clone()
    }

    /// Request one more callback run. See [`ReactorHandle::update`].
    pub fn update(&self) {
        self.handle.update();
    }

    /// Spawn the worker. No-op if already started.
    pub fn start(&self) {
        let mut slot = self.worker.lock();
        if slot.is_some() {
            return;
        }

        let name = self.name.clone();
        let interval = self.interval;
        let notify = self.handle.notify.clone();
        let tick_fn = self.tick_fn.clone();
        let cancel = self.cancel.clone();

        *slot = Some(tokio::spawn(async move {
            debug!(reactor = %name, "worker started");
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = notify.notified() => {}
                    _ = ticker.tick() => {}
                }

                // Run one callback invocation, abandoning it cleanly if
                // shutdown is signalled while it is in flight.
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Tick::Interrupted,
                    outcome = tick_fn.tick() => outcome,
                };
                if outcome == Tick::Interrupted {
                    break;
                }
            }
            debug!(reactor = %name, "worker terminated");
        }));
    }

    /// Signal shutdown and wait for the worker to terminate. Pending update
    /// requests are discarded.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(reactor = %self.name, error = %e, "worker join failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "reactor_tests.rs"]
mod tests;
