//! Per-identity movement estimation over the last known position.

use std::collections::HashMap;
use std::f64::consts::PI;

use model::*;
use parking_lot::Mutex;

/// Meters per degree of latitude around 35°N.
pub const METERS_PER_DEG_LAT: f64 = 110940.5844;
/// Meters per degree of longitude around 35°N.
pub const METERS_PER_DEG_LON: f64 = 91287.7885;

/// At or below this speed a new bearing is not trusted.
pub const MIN_HEADING_SPEED: f64 = 0.1;
/// At or below this distance (meters) a new bearing is not trusted.
pub const MIN_HEADING_DISTANCE_M: f64 = 2.0;

/// Last known position per identity.
///
/// Entries are created on first sight and overwritten afterwards; nothing is
/// ever evicted. All access goes through one lock so a read-compute-write
/// cycle for a record is atomic.
#[derive(Debug, Default)]
pub struct PositionStore {
    inner: Mutex<HashMap<Identity, Position>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: Identity) -> Option<Position> {
        self.inner.lock().get(&identity).copied()
    }

    /// Runs `f` on the previous position (if any) and stores what it returns,
    /// all under the lock.
    pub fn update<F>(&self, identity: Identity, f: F) -> Position
    where
        F: FnOnce(Option<&Position>) -> Position,
    {
        let mut map = self.inner.lock();
        let next = f(map.get(&identity));
        map.insert(identity, next);
        next
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Movement from `prev` to (`lat`, `lon`) using flat meters-per-degree constants.
pub fn estimate(prev: Option<&Position>, lat: f64, lon: f64, speed: f64) -> Movement {
    let Some(prev) = prev else {
        return Movement::STILL;
    };
    let dlat = (prev.latitude - lat) * METERS_PER_DEG_LAT;
    let dlon = (prev.longitude - lon) * METERS_PER_DEG_LON;
    let distance_m = (dlat * dlat + dlon * dlon).sqrt();

    let heading_deg = if speed > MIN_HEADING_SPEED && distance_m > MIN_HEADING_DISTANCE_M {
        dlon.atan2(dlat) * 180.0 / PI + 180.0
    } else {
        prev.heading
    };
    Movement { distance_m, heading_deg }
}

/// Stateful estimator: owns the position map for one pipeline instance.
#[derive(Debug, Default)]
pub struct MovementEstimator {
    positions: PositionStore,
}

impl MovementEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimates movement for `identity` and records the new position with
    /// the resulting heading. The position is stored unconditionally; callers
    /// that reject the record afterwards do not roll it back.
    pub fn observe(&self, identity: Identity, lat: f64, lon: f64, speed: f64) -> Movement {
        let mut movement = Movement::STILL;
        self.positions.update(identity, |prev| {
            movement = estimate(prev, lat, lon, speed);
            Position { latitude: lat, longitude: lon, heading: movement.heading_deg }
        });
        tracing::trace!(%identity, distance = movement.distance_m, heading = movement.heading_deg, "position updated");
        movement
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }
}
