// shoplist/src/autosave.rs

use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, warn};

use crate::{error::StorageError, item::Item, persistence::ListPersistence};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveOptions {
    /// Quiet period after a change before writing; changes inside it coalesce.
    pub debounce: Duration,
    /// Retry a failed write once before reporting it.
    pub retry_once: bool,
    pub retry_delay: Duration,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            retry_once: true,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Outcome of one background write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveEvent {
    Saved { generation: u64, count: usize, at: DateTime<Utc> },
    Failed { generation: u64, error: StorageError },
}

#[derive(Clone, Default)]
struct Pending {
    generation: u64,
    items: Arc<Vec<Item>>,
}

#[derive(Clone, Debug, Default)]
struct Settled {
    generation: u64,
    error: Option<StorageError>,
}

/// Background writer. Scheduled snapshots replace each other until the task
/// picks one up, so only the newest list ever reaches storage and writes never
/// overlap.
pub struct AutoSaver {
    key: String,
    pending: watch::Sender<Pending>,
    settled: watch::Receiver<Settled>,
    task: JoinHandle<()>,
}

impl AutoSaver {
    /// Must be called inside a tokio runtime.
    pub fn spawn(persistence: Arc<ListPersistence>, opts: SaveOptions) -> (Self, mpsc::UnboundedReceiver<SaveEvent>) {
        let key = persistence.key().to_string();
        let (pending_tx, pending_rx) = watch::channel(Pending::default());
        let (settled_tx, settled_rx) = watch::channel(Settled::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(persistence, opts, pending_rx, settled_tx, events_tx));
        (Self { key, pending: pending_tx, settled: settled_rx, task }, events_rx)
    }

    /// Queues `items` for writing, superseding anything not yet written.
    /// Returns the generation number of this snapshot.
    pub fn schedule(&self, items: Vec<Item>) -> u64 {
        let mut generation = 0;
        self.pending.send_modify(|p| {
            p.generation += 1;
            p.items = Arc::new(items);
            generation = p.generation;
        });
        debug!(generation, "save scheduled");
        generation
    }

    pub fn latest_scheduled(&self) -> u64 { self.pending.borrow().generation }

    /// Waits until the newest scheduled snapshot has been written (or has
    /// failed) and returns that outcome.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let target = self.latest_scheduled();
        if target == 0 { return Ok(()); }
        let mut rx = self.settled.clone();
        let outcome = {
            let settled = rx
                .wait_for(|s| s.generation >= target)
                .await
                .map_err(|_| StorageError::write(&self.key, "autosave task stopped"))?;
            settled.error.clone()
        };
        match outcome { Some(e) => Err(e), None => Ok(()) }
    }

    /// Writes whatever is still pending, then stops the task.
    pub async fn shutdown(self) -> Result<(), StorageError> {
        let res = self.flush().await;
        let Self { pending, task, .. } = self;
        drop(pending);
        if let Err(e) = task.await { error!(error = %e, "autosave task panicked"); }
        res
    }
}

async fn run(
    persistence: Arc<ListPersistence>,
    opts: SaveOptions,
    mut pending: watch::Receiver<Pending>,
    settled: watch::Sender<Settled>,
    events: mpsc::UnboundedSender<SaveEvent>,
) {
    while pending.changed().await.is_ok() {
        if !opts.debounce.is_zero() { tokio::time::sleep(opts.debounce).await; }
        let Pending { generation, items } = pending.borrow_and_update().clone();
        let result = write(&persistence, &items, &opts).await;
        let event = match &result {
            Ok(()) => SaveEvent::Saved { generation, count: items.len(), at: Utc::now() },
            Err(e) => {
                error!(generation, error = %e, "saving list failed");
                SaveEvent::Failed { generation, error: e.clone() }
            }
        };
        settled.send_replace(Settled { generation, error: result.err() });
        let _ = events.send(event);
    }
    debug!("autosave task finished");
}

async fn write(persistence: &ListPersistence, items: &[Item], opts: &SaveOptions) -> Result<(), StorageError> {
    match persistence.save(items).await {
        Err(e) if opts.retry_once => {
            warn!(error = %e, "save failed, retrying once");
            tokio::time::sleep(opts.retry_delay).await;
            persistence.save(items).await
        }
        res => res,
    }
}
