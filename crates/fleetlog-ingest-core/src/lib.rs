//! Core ingest types and the per-record parsing/validation steps used by fleetlog

use serde::{Deserialize, Serialize};

pub mod identity;
pub mod record;
pub mod validate;

pub use identity::resolve_identity;
pub use record::RawRecord;
pub use validate::{check_regional, extract_fields, Fields, Rejection};

/// Message kind that carries one plain CSV telemetry record.
pub const PLAIN_DATA_KIND: &str = "stdin";

/// One message delivered by a source. Only [`PLAIN_DATA_KIND`] messages hold records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supply {
    pub channel: u32,
    pub name: String,
    pub payload: String,
}

impl Supply {
    pub fn plain(channel: u32, payload: impl Into<String>) -> Self {
        Self { channel, name: PLAIN_DATA_KIND.to_string(), payload: payload.into() }
    }

    pub fn is_plain_data(&self) -> bool {
        self.name == PLAIN_DATA_KIND
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Msg(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SupplyTx = crossbeam_channel::Sender<Supply>;
pub type SupplyRx = crossbeam_channel::Receiver<Supply>;

/// Trait for anything that delivers raw records into the pipeline
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Runs until the input ends or the receiver hangs up.
    async fn run(&self, tx: SupplyTx) -> Result<(), IngestError>;

    fn name(&self) -> &str;
}

pub fn channel() -> (SupplyTx, SupplyRx) {
    crossbeam_channel::unbounded()
}
