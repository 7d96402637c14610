use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::{Locator, MetaError, Transport};

#[derive(Default)]
struct Documents {
    bodies: HashMap<Locator, Vec<u8>>,
    failures: HashMap<Locator, VecDeque<MetaError>>,
    gates: HashMap<Locator, watch::Sender<bool>>,
    reads: HashMap<Locator, usize>,
}

/// In-memory transport for testing. Serves stored documents, counts reads,
/// can fail upcoming reads and can hold reads until released.
pub struct InMemoryTransport {
    label: String,
    documents: Mutex<Documents>,
}

impl InMemoryTransport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            documents: Mutex::new(Documents::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Documents> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Store (or replace) the document served for `locator`.
    pub fn insert(&self, locator: &Locator, body: impl Into<Vec<u8>>) {
        self.lock().bodies.insert(locator.clone(), body.into());
    }

    /// Fail the next read of `locator` with `error`. Queued failures are
    /// consumed in order before the stored document is served.
    pub fn fail_next(&self, locator: &Locator, error: MetaError) {
        self.lock()
            .failures
            .entry(locator.clone())
            .or_default()
            .push_back(error);
    }

    /// Make reads of `locator` wait until [`release`](Self::release).
    pub fn hold(&self, locator: &Locator) {
        let (gate, _) = watch::channel(false);
        self.lock().gates.insert(locator.clone(), gate);
    }

    /// Let held reads of `locator` proceed.
    pub fn release(&self, locator: &Locator) {
        if let Some(gate) = self.lock().gates.remove(locator) {
            gate.send_replace(true);
        }
    }

    /// Number of reads started for `locator`.
    pub fn reads(&self, locator: &Locator) -> usize {
        self.lock().reads.get(locator).copied().unwrap_or(0)
    }

    /// Number of reads started across all locators.
    pub fn total_reads(&self) -> usize {
        self.lock().reads.values().sum()
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    fn label(&self) -> &str {
        &self.label
    }

    async fn read(&self, locator: &Locator) -> Result<Vec<u8>, MetaError> {
        let gate = {
            let mut documents = self.lock();
            *documents.reads.entry(locator.clone()).or_default() += 1;
            documents.gates.get(locator).map(watch::Sender::subscribe)
        };

        if let Some(mut gate) = gate {
            // A dropped sender means the gate was released
            let _ = gate.wait_for(|open| *open).await;
        }

        let mut documents = self.lock();
        if let Some(error) = documents
            .failures
            .get_mut(locator)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        documents
            .bodies
            .get(locator)
            .cloned()
            .ok_or_else(|| MetaError::Fetch(format!("HTTP 404 Not Found for {locator}")))
    }
}
