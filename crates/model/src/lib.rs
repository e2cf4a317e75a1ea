use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata stored alongside every row when the source supplies none.
pub const DEFAULT_METADATA: &str = "{}";

/// Offset added to the numeric suffix of an on-board device name.
pub const ONBOARD_IDENTITY_BASE: i32 = 30000;

/// Integer key of a vehicle or fixed sensor. Zero means "unresolved".
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct Identity(pub i32);

impl Identity {
    pub const UNRESOLVED: Identity = Identity(0);

    /// Identity of the on-board device with numeric suffix `n`.
    ///
    /// The sum wraps in 32 bits, so a suffix of `-30000` lands back on
    /// [`Identity::UNRESOLVED`].
    pub fn onboard(n: i64) -> Self {
        Identity((ONBOARD_IDENTITY_BASE as i64).wrapping_add(n) as i32)
    }

    pub fn is_resolved(&self) -> bool {
        self.0 != 0
    }

    pub fn get(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Last known position of an identity, with the heading derived when it was recorded.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// degrees, 0..=360
    pub heading: f64,
}

/// Distance and heading since the previous observation of the same identity.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Movement {
    pub distance_m: f64,
    pub heading_deg: f64,
}

impl Movement {
    pub const STILL: Movement = Movement { distance_m: 0.0, heading_deg: 0.0 };
}

/// One enriched row, as appended to the location history table.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct StoredRecord {
    pub identity: Identity,
    /// "DATE TIME" exactly as the device sent it
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub signal_strength: f64,
    #[serde(default = "default_metadata")]
    pub metadata: String,
}

fn default_metadata() -> String {
    DEFAULT_METADATA.to_string()
}

/// Inclusive latitude/longitude rectangle in degrees.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct BBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BBox {
    pub const fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self { min_lat, max_lat, min_lon, max_lon }
    }

    /// NaN never falls inside.
    pub fn contains_lat(&self, lat: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat)
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon)
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.contains_lat(lat) && self.contains_lon(lon)
    }
}

/// Plausibility box every parsed coordinate must fall in.
pub const REFERENCE_BOX: BBox = BBox::new(20.0, 46.0, 122.0, 154.0);

/// Service-region box checked again after the movement estimate.
pub const REGIONAL_BOX: BBox = BBox::new(30.0, 40.0, 120.0, 150.0);
