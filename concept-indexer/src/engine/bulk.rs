//! Background bulk processor.
//!
//! Writes and partial updates enqueued here are coalesced into compound bulk
//! requests. A collector task buffers operations and hands a batch to the
//! flush workers when any threshold trips: request count, serialized byte
//! size, or the flush interval. Enqueueing never blocks on the network and
//! never fails; flush failures are logged, with per-item retries delegated
//! to the cluster's bulk semantics.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use concept_indexer_repository::{BulkOperation, DocumentStore};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

/// Thresholds and sizing for the bulk processor.
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// Number of concurrent flush workers.
    pub workers: usize,
    /// Flush once this many operations are buffered.
    pub max_requests: usize,
    /// Flush once the buffered payloads reach this many bytes.
    pub max_bytes: usize,
    /// Flush any buffered operations at this interval.
    pub flush_interval: Duration,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_requests: 1000,
            max_bytes: 2 << 20,
            flush_interval: Duration::from_secs(10),
        }
    }
}

/// Handle to the background batching queue.
///
/// The handle is bound to one client; the engine closes it and opens a new
/// one whenever the client is replaced.
pub struct BulkProcessor {
    sender: StdMutex<Option<mpsc::UnboundedSender<BulkOperation>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BulkProcessor {
    /// Start the collector and flush workers against the given store.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index_name: impl Into<String>,
        config: BulkConfig,
    ) -> Self {
        let index_name = index_name.into();
        let workers = config.workers.max(1);

        let (operation_tx, operation_rx) = mpsc::unbounded_channel();
        let (batch_tx, batch_rx) = mpsc::channel::<Vec<BulkOperation>>(workers);
        let batch_rx = Arc::new(Mutex::new(batch_rx));

        let mut tasks = Vec::with_capacity(workers + 1);
        for _ in 0..workers {
            let store = Arc::clone(&store);
            let index_name = index_name.clone();
            let batch_rx = Arc::clone(&batch_rx);
            tasks.push(tokio::spawn(async move {
                loop {
                    let batch = { batch_rx.lock().await.recv().await };
                    match batch {
                        Some(operations) => flush(store.as_ref(), &index_name, operations).await,
                        None => return,
                    }
                }
            }));
        }
        tasks.push(tokio::spawn(collect(operation_rx, batch_tx, config)));

        Self {
            sender: StdMutex::new(Some(operation_tx)),
            tasks: Mutex::new(tasks),
        }
    }

    /// Queue a full document replacement.
    pub fn index(&self, id: impl Into<String>, document: Value) {
        self.enqueue(BulkOperation::Index {
            id: id.into(),
            document,
        });
    }

    /// Queue a partial-document update.
    pub fn update(&self, id: impl Into<String>, patch: Value) {
        self.enqueue(BulkOperation::Update {
            id: id.into(),
            patch,
        });
    }

    fn enqueue(&self, operation: BulkOperation) {
        let sender = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match sender.as_ref() {
            Some(sender) => {
                if sender.send(operation).is_err() {
                    warn!("bulk collector is gone; dropping operation");
                }
            }
            None => warn!("bulk processor is closed; dropping operation"),
        }
    }

    /// Stop intake, flush the remaining buffer, and await in-flight batches.
    /// Safe to call more than once.
    pub async fn close(&self) {
        {
            let mut sender = match self.sender.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            sender.take();
        }

        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            if let Err(err) = task.await {
                error!(error = %err, "bulk task ended abnormally");
            }
        }
    }
}

/// Buffer operations and dispatch batches on any tripped threshold. Exits
/// when the handle's sender is dropped, flushing whatever remains.
async fn collect(
    mut operations: mpsc::UnboundedReceiver<BulkOperation>,
    batches: mpsc::Sender<Vec<BulkOperation>>,
    config: BulkConfig,
) {
    let mut buffer: Vec<BulkOperation> = Vec::new();
    let mut buffered_bytes = 0usize;

    let mut ticker = tokio::time::interval(config.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            operation = operations.recv() => match operation {
                Some(operation) => {
                    buffered_bytes += operation.byte_len();
                    buffer.push(operation);
                    if buffer.len() >= config.max_requests || buffered_bytes >= config.max_bytes {
                        dispatch(&batches, &mut buffer, &mut buffered_bytes).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    dispatch(&batches, &mut buffer, &mut buffered_bytes).await;
                }
            }
        }
    }

    if !buffer.is_empty() {
        dispatch(&batches, &mut buffer, &mut buffered_bytes).await;
    }
}

async fn dispatch(
    batches: &mpsc::Sender<Vec<BulkOperation>>,
    buffer: &mut Vec<BulkOperation>,
    buffered_bytes: &mut usize,
) {
    let batch = std::mem::take(buffer);
    *buffered_bytes = 0;
    if batches.send(batch).await.is_err() {
        warn!("bulk workers are gone; dropping batch");
    }
}

async fn flush(store: &dyn DocumentStore, index_name: &str, operations: Vec<BulkOperation>) {
    let count = operations.len();
    match store.bulk(index_name, &operations).await {
        Ok(summary) if summary.errors => {
            warn!(count, took_ms = summary.took, "bulk flush completed with item failures");
        }
        Ok(summary) => {
            debug!(count = summary.items, took_ms = summary.took, "bulk flush completed");
        }
        Err(err) => {
            error!(count, error = %err, "bulk flush failed");
        }
    }
}
