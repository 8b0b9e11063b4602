//! Ledger records and their row forms.

use bus_location::LiveRecord;
use chrono::{DateTime, Utc};
use realtime::{Error, Result, validation};
use serde::{Deserialize, Serialize};

use crate::repository::{Condition, Row, Value};

pub const INITIATION_TIME: &str = "initiation_time";
pub const PLATE_NUMBER: &str = "plate_number";
pub const ROUTE_ID: &str = "route_id";
pub const ACTIVE: &str = "active";
pub const STATION_SEQUENCE: &str = "station_sequence";
pub const ARRIVAL_TIME: &str = "arrival_time";
pub const STATION_ID: &str = "station_id";

/// Identifies a trip: when it started and which vehicle runs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripKey {
    pub initiation_time: DateTime<Utc>,
    pub plate_number: String,
}

impl TripKey {
    #[must_use]
    pub fn new(initiation_time: DateTime<Utc>, plate_number: impl Into<String>) -> Self {
        Self { initiation_time, plate_number: plate_number.into() }
    }

    /// Reject a key that cannot address exactly one trip.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when the plate number is empty.
    pub fn validate(&self) -> Result<()> {
        if self.plate_number.trim().is_empty() {
            return Err(validation!("trip key at {} has no plate number", self.initiation_time));
        }
        Ok(())
    }

    /// Conditions matching this trip's rows exactly.
    #[must_use]
    pub fn conditions(&self) -> Vec<Condition> {
        vec![
            Condition::eq(INITIATION_TIME, self.initiation_time),
            Condition::eq(PLATE_NUMBER, self.plate_number.as_str()),
        ]
    }
}

/// A trip row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub key: TripKey,
    pub route_id: String,
    pub active: bool,
}

impl Trip {
    #[must_use]
    pub fn to_row(&self) -> Row {
        Row::from([
            (INITIATION_TIME.to_string(), Value::from(self.key.initiation_time)),
            (PLATE_NUMBER.to_string(), Value::from(self.key.plate_number.as_str())),
            (ROUTE_ID.to_string(), Value::from(self.route_id.as_str())),
            (ACTIVE.to_string(), Value::from(self.active)),
        ])
    }
}

/// A stop visit row, keyed under its trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopVisit {
    pub key: TripKey,
    pub station_sequence: i32,
    pub arrival_time: DateTime<Utc>,
    pub station_id: Option<String>,
}

impl StopVisit {
    #[must_use]
    pub fn to_row(&self) -> Row {
        Row::from([
            (INITIATION_TIME.to_string(), Value::from(self.key.initiation_time)),
            (PLATE_NUMBER.to_string(), Value::from(self.key.plate_number.as_str())),
            (STATION_SEQUENCE.to_string(), Value::from(self.station_sequence)),
            (ARRIVAL_TIME.to_string(), Value::from(self.arrival_time)),
            (STATION_ID.to_string(), Value::from(self.station_id.clone())),
        ])
    }
}

/// An active trip as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRef {
    pub key: TripKey,
    pub route_id: String,
}

impl TryFrom<&Row> for TripRef {
    type Error = Error;

    fn try_from(row: &Row) -> Result<Self> {
        let Some(Value::Timestamp(initiation_time)) = row.get(INITIATION_TIME) else {
            return Err(validation!("active trip row without {}", INITIATION_TIME));
        };
        let plate_number = match row.get(PLATE_NUMBER) {
            Some(Value::Text(plate)) if !plate.trim().is_empty() => plate.clone(),
            _ => {
                return Err(validation!(
                    "active trip row at {} without {}",
                    initiation_time,
                    PLATE_NUMBER
                ));
            }
        };
        let route_id = match row.get(ROUTE_ID) {
            Some(Value::Text(route_id)) => route_id.clone(),
            _ => String::new(),
        };

        Ok(Self { key: TripKey { initiation_time: *initiation_time, plate_number }, route_id })
    }
}

/// A live record whose trip is already in the store, so its initiation time
/// is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuingRecord {
    pub initiation_time: DateTime<Utc>,
    pub live: LiveRecord,
}

impl ContinuingRecord {
    #[must_use]
    pub fn key(&self) -> TripKey {
        TripKey::new(self.initiation_time, self.live.plate_number.as_str())
    }
}
