//! Cooperative poll loop.
//!
//! A scheduler is either stopped or running. While running it repeatedly
//! waits for the configured delay, re-checks its [`SyncGate`] against a fresh
//! snapshot and, when open, invokes every tick task once. Stop requests are
//! honoured at the top of the next iteration, so an iteration that already
//! began (delay, gate check, tick) always finishes.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use anyhow::Result;
use futures::StreamExt;
use shared::domain::ActorRole;
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, info, trace, warn};

use crate::{
    action::Action,
    gate::SyncGate,
    store::{log_lagged, Store, SyncSnapshot},
};

const MIN_DELAY: Duration = Duration::from_millis(1);

/// One unit of work per open tick. Receives the scheduler's context and the
/// snapshot the gate just approved.
pub type TickTask<C> = Arc<dyn Fn(&C, &SyncSnapshot) -> Result<()> + Send + Sync>;

pub type DelayFn = Arc<dyn Fn() -> Duration + Send + Sync>;

pub fn tick_task<C, F>(f: F) -> TickTask<C>
where
    F: Fn(&C, &SyncSnapshot) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn fixed_delay(delay: Duration) -> DelayFn {
    Arc::new(move || delay)
}

#[derive(Debug, Default)]
struct LoopState {
    /// Requested by start/stop signals.
    running: bool,
    /// A loop task exists and has not yet observed a stop.
    active: bool,
}

struct Inner<C> {
    role: ActorRole,
    store: Store,
    context: C,
    tasks: Vec<TickTask<C>>,
    gate: SyncGate,
    delay: DelayFn,
    state: Mutex<LoopState>,
    ticks: AtomicU64,
}

impl<C> Inner<C> {
    fn lock_state(&self) -> MutexGuard<'_, LoopState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct PollScheduler<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for PollScheduler<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Send + Sync + 'static> PollScheduler<C> {
    pub fn new(
        role: ActorRole,
        store: Store,
        context: C,
        tasks: Vec<TickTask<C>>,
        gate: SyncGate,
        delay: DelayFn,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                role,
                store,
                context,
                tasks,
                gate,
                delay,
                state: Mutex::new(LoopState::default()),
                ticks: AtomicU64::new(0),
            }),
        }
    }

    pub fn role(&self) -> ActorRole {
        self.inner.role
    }

    /// Starts the loop. A second start while a loop exists is a no-op, even if
    /// that loop is finishing an iteration after a stop.
    pub fn start(&self) {
        let mut state = self.inner.lock_state();
        state.running = true;
        if state.active {
            debug!(role = %self.inner.role, "poll already running");
            return;
        }
        state.active = true;
        drop(state);

        info!(role = %self.inner.role, "poll started");
        tokio::spawn(run_loop(Arc::clone(&self.inner)));
    }

    pub fn stop(&self) {
        let mut state = self.inner.lock_state();
        if state.running {
            state.running = false;
            info!(role = %self.inner.role, "poll stop requested");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_state().running
    }

    /// Whether a loop task is still alive (it may be draining after a stop).
    pub fn is_active(&self) -> bool {
        self.inner.lock_state().active
    }

    /// Number of ticks that passed the gate so far.
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.load(Ordering::Relaxed)
    }

    /// Follows `PollStart`/`PollStop` signals for this scheduler's role.
    pub fn listen(&self, rx: broadcast::Receiver<Action>) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut actions = BroadcastStream::new(rx);
            while let Some(item) = actions.next().await {
                match item {
                    Ok(Action::PollStart(role)) if role == scheduler.role() => scheduler.start(),
                    Ok(Action::PollStop(role)) if role == scheduler.role() => scheduler.stop(),
                    Ok(_) => {}
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        log_lagged("poll signals", skipped)
                    }
                }
            }
        })
    }
}

async fn run_loop<C>(inner: Arc<Inner<C>>) {
    loop {
        {
            let mut state = inner.lock_state();
            if !state.running {
                state.active = false;
                info!(role = %inner.role, "poll stopped");
                return;
            }
        }

        tokio::time::sleep((inner.delay)().max(MIN_DELAY)).await;

        let snapshot = inner.store.sync_snapshot();
        if !inner.gate.should_sync(&snapshot) {
            trace!(role = %inner.role, "gate closed");
            continue;
        }

        let tick = inner.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(role = %inner.role, tick, "poll tick");
        for (index, task) in inner.tasks.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| task(&inner.context, &snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(role = %inner.role, task = index, error = %err, "tick task failed")
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    warn!(role = %inner.role, task = index, reason, "tick task panicked")
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
#[path = "tests/poll_tests.rs"]
mod tests;
