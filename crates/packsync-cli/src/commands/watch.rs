use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use packsync::coordinator::PACK_METADATA;
use packsync::{
    Debouncer, FailureReport, FetchState, Locator, Transport, UpdateCoordinator, UpdateEvent,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::format;

/// Latest edit, shared between the input loop and the debounced action.
#[derive(Default)]
struct PendingText(Mutex<String>);

impl PendingText {
    fn set(&self, text: String) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = text;
    }

    fn get(&self) -> String {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

pub async fn run(transport: Arc<dyn Transport>, delay: Duration) -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    let events = watch(input, transport, delay, |line| println!("{line}")).await?;
    tracing::debug!(events, "watch finished");
    Ok(())
}

/// Feed each input line to the debouncer as one edit and print events as
/// they arrive. End of input flushes the pending edit and waits for its
/// fetch. Returns the number of events printed.
async fn watch<R>(
    input: R,
    transport: Arc<dyn Transport>,
    delay: Duration,
    mut emit: impl FnMut(&str),
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let (coordinator, mut events) = UpdateCoordinator::new(transport);
    let coordinator = Arc::new(coordinator);
    let pending = Arc::new(PendingText::default());
    let (rejected_tx, mut rejected) = mpsc::unbounded_channel();

    let debouncer = {
        let coordinator = Arc::clone(&coordinator);
        let pending = Arc::clone(&pending);
        Debouncer::new(delay, move || {
            let text = pending.get();
            match Locator::parse(&text) {
                Ok(locator) => {
                    if !coordinator.request_update(locator) {
                        tracing::debug!(%text, "locator unchanged");
                    }
                }
                Err(e) => {
                    let _ = rejected_tx.send(FailureReport::from_error(PACK_METADATA, &e));
                }
            }
        })
    };
    tracing::info!(
        delay_ms = debouncer.delay().as_millis() as u64,
        "watching input for locator edits"
    );

    let mut lines = input.lines();
    let mut printed = 0usize;
    let mut show = |text: String| {
        emit(&text);
        printed += 1;
    };

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(text) => {
                        pending.set(text);
                        debouncer.call();
                    }
                    None => {
                        // Returns after any run already under way, so its
                        // request is in before the drain below
                        if !debouncer.finish() {
                            tracing::debug!("final edit already applied");
                        }
                        break;
                    }
                }
            }
            Some(event) = events.recv() => show(describe(&event)),
            Some(report) = rejected.recv() => show(report.to_string()),
        }
    }

    debouncer.terminate();
    while let Ok(report) = rejected.try_recv() {
        show(report.to_string());
    }

    // A fetch publishes under the same lock that ends it, so once the state
    // leaves Fetching its event is already queued.
    loop {
        if coordinator.state() != FetchState::Fetching {
            while let Ok(event) = events.try_recv() {
                show(describe(&event));
            }
            break;
        }
        match events.recv().await {
            Some(event) => show(describe(&event)),
            None => break,
        }
    }

    Ok(printed)
}

fn describe(event: &UpdateEvent) -> String {
    match event {
        UpdateEvent::SnapshotReady { locator, snapshot } => {
            format!("Loaded {locator}\n{}", format::snapshot_details(snapshot).trim_end())
        }
        UpdateEvent::Failed { report, .. } => report.to_string(),
    }
}
