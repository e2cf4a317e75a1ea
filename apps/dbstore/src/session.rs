use std::thread;

use fleetlog_ingest_core::{IngestError, RecordSource, SupplyRx, SupplyTx};
use iox::Connector;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::pipeline::{Outcome, Pipeline};

/// Per-outcome counters reported when the worker exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub stored: u64,
    pub store_failed: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: &Outcome) {
        self.received += 1;
        match outcome {
            Outcome::Ignored => self.ignored += 1,
            Outcome::Dropped(_) => self.dropped += 1,
            Outcome::Stored { .. } => self.stored += 1,
            Outcome::StoreFailed => self.store_failed += 1,
        }
    }
}

/// Runs a source on the tokio runtime; `tx` is dropped when the source ends.
/// The source's error is handed back through the join handle.
pub fn run_source<S: RecordSource + 'static>(
    src: S,
    tx: SupplyTx,
) -> JoinHandle<Result<(), IngestError>> {
    tokio::spawn(async move {
        let res = src.run(tx).await;
        match &res {
            Ok(()) => tracing::info!(source = src.name(), "source finished"),
            Err(err) => tracing::error!(source = src.name(), error = %err, "source failed"),
        }
        res
    })
}

/// Pumps messages into the pipeline on a dedicated thread, one at a time,
/// until every sender is gone and the queue is drained.
pub fn spawn_worker<C>(
    mut pipeline: Pipeline<C>,
    rx: SupplyRx,
    handle: Handle,
) -> std::io::Result<thread::JoinHandle<WorkerStats>>
where
    C: Connector + 'static,
{
    thread::Builder::new()
        .name("dbstore-worker".into())
        .spawn(move || {
            let mut stats = WorkerStats::default();
            while let Ok(supply) = rx.recv() {
                let outcome = handle.block_on(pipeline.process_supply(&supply));
                stats.record(&outcome);
            }
            tracing::info!(?stats, "worker drained");
            stats
        })
}
