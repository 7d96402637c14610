//! Background descriptor fetching with supersession.
//!
//! The coordinator tracks one locator at a time. Requesting a different
//! locator cancels the in-flight fetch and starts a new one; a fetch whose
//! locator has been replaced never publishes, even if it finishes before it
//! notices the cancellation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::descriptor::{Snapshot, parse_descriptor};
use crate::locator::Locator;
use crate::report::FailureReport;
use crate::transport::{MetaError, Transport};

/// Operation label used when a descriptor fetch fails.
pub const PACK_METADATA: &str = "pack metadata";

/// Notifications delivered, in order, on the coordinator's event channel.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    /// A fetch finished and its snapshot is now current.
    SnapshotReady {
        locator: Locator,
        snapshot: Arc<Snapshot>,
    },
    /// The current fetch failed. The coordinator holds no snapshot.
    Failed {
        locator: Locator,
        report: FailureReport,
    },
}

/// Observable state of the tracked locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
    Ready,
    Failed,
}

enum Phase {
    Idle,
    Fetching {
        task: u64,
        cancel: CancellationToken,
    },
    Ready(Arc<Snapshot>),
    Failed,
}

struct Tracked {
    locator: Option<Locator>,
    phase: Phase,
    next_task: u64,
}

struct Shared {
    transport: Arc<dyn Transport>,
    runtime: Handle,
    events: mpsc::UnboundedSender<UpdateEvent>,
    tracked: Mutex<Tracked>,
}

/// Owns the tracked locator, the in-flight fetch and the last snapshot.
///
/// All three change together under one lock. Results are published on the
/// channel returned by [`UpdateCoordinator::new`], so the consumer sees a
/// single serialized stream of events. Dropping the coordinator cancels any
/// in-flight fetch.
pub struct UpdateCoordinator {
    shared: Arc<Shared>,
}

impl UpdateCoordinator {
    /// Create a coordinator that spawns fetches on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>) -> (Self, mpsc::UnboundedReceiver<UpdateEvent>) {
        Self::with_handle(Handle::current(), transport)
    }

    pub fn with_handle(
        runtime: Handle,
        transport: Arc<dyn Transport>,
    ) -> (Self, mpsc::UnboundedReceiver<UpdateEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            transport,
            runtime,
            events,
            tracked: Mutex::new(Tracked {
                locator: None,
                phase: Phase::Idle,
                next_task: 0,
            }),
        });

        (Self { shared }, receiver)
    }

    /// Start tracking `locator`. Returns false, doing nothing, when it is
    /// already the tracked locator.
    pub fn request_update(&self, locator: Locator) -> bool {
        let mut tracked = self.shared.lock();
        if tracked.locator.as_ref() == Some(&locator) {
            return false;
        }

        self.shared.start(&mut tracked, locator);
        true
    }

    /// Fetch the tracked locator again, superseding any in-flight fetch.
    /// Returns false when nothing is tracked.
    pub fn refresh(&self) -> bool {
        let mut tracked = self.shared.lock();
        let Some(locator) = tracked.locator.clone() else {
            return false;
        };

        self.shared.start(&mut tracked, locator);
        true
    }

    /// The last published snapshot. `None` until a fetch succeeds, and again
    /// as soon as a new locator is requested or the current fetch fails.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        match &self.shared.lock().phase {
            Phase::Ready(snapshot) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    pub fn locator(&self) -> Option<Locator> {
        self.shared.lock().locator.clone()
    }

    pub fn state(&self) -> FetchState {
        match self.shared.lock().phase {
            Phase::Idle => FetchState::Idle,
            Phase::Fetching { .. } => FetchState::Fetching,
            Phase::Ready(_) => FetchState::Ready,
            Phase::Failed => FetchState::Failed,
        }
    }
}

impl Drop for UpdateCoordinator {
    fn drop(&mut self) {
        let mut tracked = self.shared.lock();
        if let Phase::Fetching { cancel, .. } = &tracked.phase {
            cancel.cancel();
            tracked.phase = Phase::Idle;
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Tracked> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the in-flight fetch, adopt `locator` and spawn its fetch.
    /// The caller holds the lock for the whole swap.
    fn start(self: &Arc<Self>, tracked: &mut Tracked, locator: Locator) {
        if let Phase::Fetching { task, cancel } = &tracked.phase {
            tracing::debug!(task, "cancelling superseded fetch");
            cancel.cancel();
        }

        tracked.next_task += 1;
        let task = tracked.next_task;
        let cancel = CancellationToken::new();

        tracked.locator = Some(locator.clone());
        tracked.phase = Phase::Fetching {
            task,
            cancel: cancel.clone(),
        };

        tracing::debug!(task, %locator, "fetch started");
        let shared = Arc::clone(self);
        self.runtime
            .spawn(async move { shared.run_fetch(task, locator, cancel).await });
    }

    async fn run_fetch(&self, task: u64, locator: Locator, cancel: CancellationToken) {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(MetaError::Cancelled),
            result = fetch_snapshot(self.transport.as_ref(), &locator) => result,
        };

        self.complete(task, &locator, result);
    }

    /// Publish the outcome of fetch `task` if it is still the current one.
    /// Any error on the current fetch ends it as failed; a `Cancelled` that
    /// did not come from supersession is reported as a fetch error. Returns
    /// whether anything was published.
    fn complete(&self, task: u64, locator: &Locator, result: Result<Snapshot, MetaError>) -> bool {
        let mut tracked = self.lock();
        let current = matches!(tracked.phase, Phase::Fetching { task: live, .. } if live == task);
        if !current {
            tracing::debug!(task, %locator, "discarding superseded fetch");
            return false;
        }

        let event = match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                tracing::debug!(task, %locator, name = %snapshot.name, "snapshot published");
                tracked.phase = Phase::Ready(Arc::clone(&snapshot));
                UpdateEvent::SnapshotReady {
                    locator: locator.clone(),
                    snapshot,
                }
            }
            Err(error) => {
                // Not asked for by us, so the read itself gave up
                let error = if error.is_reportable() {
                    error
                } else {
                    MetaError::Fetch("read was cancelled".into())
                };
                tracing::warn!(task, %locator, %error, "descriptor fetch failed");
                tracked.phase = Phase::Failed;
                UpdateEvent::Failed {
                    locator: locator.clone(),
                    report: FailureReport::from_error(PACK_METADATA, &error),
                }
            }
        };

        // Sent under the lock so events keep the order of state changes
        let _ = self.events.send(event);
        true
    }
}

async fn fetch_snapshot(transport: &dyn Transport, locator: &Locator) -> Result<Snapshot, MetaError> {
    let bytes = transport.read(locator).await?;
    parse_descriptor(&bytes)
}
