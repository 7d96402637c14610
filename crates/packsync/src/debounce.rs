//! Debounced trigger for bursty input.
//!
//! A burst of [`Debouncer::call`]s collapses into a single run of the action,
//! `delay` after the last call. Timers run as tasks on a shared tokio
//! runtime, so any number of debouncers costs no extra threads.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Default delay between the last edit and the debounced action.
pub const DEFAULT_DEBOUNCE_MS: u64 = 4000;

type Action = Box<dyn Fn() + Send + Sync>;

/// Coalesces bursts of calls into one delayed action.
///
/// The action never runs twice at once. Dropping the debouncer terminates
/// it; a pending action never runs.
pub struct Debouncer {
    inner: Arc<Inner>,
}

struct Inner {
    delay: Duration,
    action: Action,
    runtime: Handle,
    state: Mutex<State>,
    /// Signalled when a run of the action ends, for `finish` callers.
    idle: Condvar,
    /// Signalled when a run of the action ends, for timer tasks.
    idle_timers: Notify,
}

#[derive(Debug, Default)]
struct State {
    /// When the pending action is due. `None` when nothing is pending.
    deadline: Option<Instant>,
    /// Identity of the live timer task. Bumped to orphan older timers.
    timer: u64,
    /// Thread running the action, if it is running.
    firing: Option<ThreadId>,
    terminated: bool,
}

impl Debouncer {
    /// Create a debouncer whose timers run on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(delay: Duration, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self::with_handle(Handle::current(), delay, action)
    }

    /// Create a debouncer whose timers run on `runtime`.
    pub fn with_handle(
        runtime: Handle,
        delay: Duration,
        action: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                action: Box::new(action),
                runtime,
                state: Mutex::new(State::default()),
                idle: Condvar::new(),
                idle_timers: Notify::new(),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// True while a delayed run is scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner.lock().deadline.is_some()
    }

    /// Record an occurrence, scheduling the action or pushing its deadline
    /// back to `now + delay`. No-op after [`terminate`](Self::terminate).
    pub fn call(&self) {
        let mut state = self.inner.lock();
        if state.terminated {
            return;
        }

        let deadline = Instant::now() + self.inner.delay;
        if state.deadline.replace(deadline).is_some() {
            return;
        }

        state.timer += 1;
        let timer = state.timer;
        drop(state);

        let inner = Arc::clone(&self.inner);
        self.inner
            .runtime
            .spawn(async move { inner.run_timer(timer, deadline).await });
    }

    /// Cancel any pending run and run the action now, on the caller's thread.
    ///
    /// If the action is already running on another thread, this blocks until
    /// that run ends. The action then runs again only if a `call` arrived
    /// since that run started; otherwise the finished run covers this one and
    /// false is returned. Also false after `terminate`, or when called from
    /// inside the action. The debouncer stays usable afterwards.
    pub fn finish(&self) -> bool {
        let current = thread::current().id();
        let mut state = self.inner.lock();

        if state.firing.is_some() {
            if state.firing == Some(current) {
                return false;
            }
            state = self.inner.wait_idle(state);
            if state.deadline.is_none() {
                return false;
            }
        }

        if state.terminated {
            return false;
        }

        state.deadline = None;
        state.timer += 1;
        state.firing = Some(current);
        drop(state);

        self.inner.fire();
        true
    }

    /// Permanently disable the debouncer. A pending run is dropped.
    pub fn terminate(&self) {
        let mut state = self.inner.lock();
        state.terminated = true;
        state.deadline = None;
        state.timer += 1;
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.lock().terminated
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.inner.delay)
            .field("state", &*self.inner.lock())
            .finish()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_idle<'a>(&'a self, state: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.idle
            .wait_while(state, |state| state.firing.is_some())
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the action. The caller must have set `firing`.
    fn fire(&self) {
        struct Reset<'a>(&'a Inner);

        impl Drop for Reset<'_> {
            fn drop(&mut self) {
                self.0.lock().firing = None;
                self.0.idle.notify_all();
                self.0.idle_timers.notify_waiters();
            }
        }

        let _reset = Reset(self);
        (self.action)();
    }

    async fn run_timer(self: Arc<Self>, timer: u64, mut deadline: Instant) {
        loop {
            tokio::time::sleep_until(deadline).await;

            let idle = {
                let mut state = self.lock();
                if state.timer != timer {
                    return;
                }

                let due = state.deadline;
                match due {
                    // Extended while asleep
                    Some(due) if due > Instant::now() => {
                        deadline = due;
                        continue;
                    }
                    Some(_) if state.firing.is_some() => {
                        // Registered before unlocking so the wake-up is not missed
                        let idle = self.idle_timers.notified();
                        drop(state);
                        idle
                    }
                    Some(_) => {
                        state.deadline = None;
                        state.firing = Some(thread::current().id());
                        drop(state);

                        tracing::trace!("debounced action firing");
                        self.fire();
                        return;
                    }
                    None => return,
                }
            };
            idle.await;
        }
    }
}
