use analysis::{MovementEstimator, PositionStore};
use fleetlog_ingest_core::{
    check_regional, extract_fields, resolve_identity, RawRecord, Rejection, Supply,
};
use iox::{Connector, PersistenceWriter};
use model::{StoredRecord, DEFAULT_METADATA};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Not a plain-data message for our channel.
    Ignored,
    Dropped(Rejection),
    Stored { rows: u64 },
    /// Accepted, but the write was lost.
    StoreFailed,
}

/// Parse, enrich and persist records, one at a time.
pub struct Pipeline<C: Connector> {
    channel: u32,
    estimator: MovementEstimator,
    writer: PersistenceWriter<C>,
}

impl<C: Connector> Pipeline<C> {
    pub fn new(channel: u32, writer: PersistenceWriter<C>) -> Self {
        Self { channel, estimator: MovementEstimator::new(), writer }
    }

    pub fn positions(&self) -> &PositionStore {
        self.estimator.positions()
    }

    pub async fn process_supply(&mut self, supply: &Supply) -> Outcome {
        if supply.channel != self.channel || !supply.is_plain_data() {
            tracing::debug!(channel = supply.channel, kind = %supply.name, "ignoring message");
            return Outcome::Ignored;
        }
        self.process(&supply.payload).await
    }

    /// Handles one raw CSV record. Never fails; every problem is logged.
    pub async fn process(&mut self, raw: &str) -> Outcome {
        let record = match self.enrich(raw) {
            Ok(record) => record,
            Err(rejection) => {
                tracing::warn!(reason = %rejection, "dropping record");
                return Outcome::Dropped(rejection);
            }
        };
        match self.writer.append(&record).await {
            Ok(rows) => Outcome::Stored { rows },
            Err(_) => Outcome::StoreFailed,
        }
    }

    fn enrich(&self, raw: &str) -> Result<StoredRecord, Rejection> {
        let rec = RawRecord::parse(raw);
        let identity = resolve_identity(rec.identifier());
        if !identity.is_resolved() {
            return Err(Rejection::UnresolvedIdentity(rec.identifier().to_string()));
        }

        let fields = extract_fields(&rec)?;
        // updates the stored position even if the regional check below drops the record
        let movement = self.estimator.observe(identity, fields.latitude, fields.longitude, fields.speed);

        tracing::info!(
            %identity,
            lat = fields.latitude,
            lon = fields.longitude,
            alt = fields.altitude,
            spd = fields.speed,
            dst = movement.distance_m,
            heading = movement.heading_deg,
            "record"
        );

        check_regional(fields.latitude, fields.longitude)?;

        Ok(StoredRecord {
            identity,
            timestamp: fields.timestamp,
            latitude: fields.latitude,
            longitude: fields.longitude,
            altitude: fields.altitude,
            speed: fields.speed,
            heading: movement.heading_deg,
            signal_strength: fields.signal_strength,
            metadata: DEFAULT_METADATA.to_string(),
        })
    }
}
