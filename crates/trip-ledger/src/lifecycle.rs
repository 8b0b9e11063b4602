//! # Trip lifecycle
//!
//! The only operations that write to the ledger: open a trip, append a stop
//! visit to it and close it.

use std::fmt::{self, Display};

use bus_location::LiveRecord;
use chrono::{DateTime, Utc};
use realtime::{Result, repository};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Tables;
use crate::records::{ACTIVE, ContinuingRecord, StopVisit, Trip, TripKey};
use crate::repository::{Condition, Repository, Row, Value};

/// Outcome of [`append_stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppendOutcome {
    /// A stop visit was written.
    Appended,

    /// The reported sequence does not advance past the last recorded one.
    NotAdvancing { last: i32, reported: i32 },
}

/// Outcome of [`close_trip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseOutcome {
    Closed,

    /// No row matched, the trip was closed by an earlier call.
    AlreadyClosed,
}

/// Why a trip is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseReason {
    /// The vehicle is no longer reported live.
    Ended,

    /// The trip ran past the staleness threshold.
    Stale,

    /// A newer active trip exists for the same vehicle.
    Duplicate,
}

impl Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ended => write!(f, "ended"),
            Self::Stale => write!(f, "stale"),
            Self::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// Open a trip for a newly live vehicle and record its first stop visit, both
/// stamped with the snapshot's observation time.
///
/// # Errors
///
/// Returns `Error::Validation` for a record without a plate number and
/// `Error::Repository` when either insert fails. The stop visit is not
/// attempted when the trip insert fails.
pub async fn create_trip(
    repo: &impl Repository, tables: &Tables, record: &LiveRecord, observed_at: DateTime<Utc>,
) -> Result<TripKey> {
    let key = TripKey::new(observed_at, record.plate_number.as_str());
    key.validate()?;

    let trip = Trip { key: key.clone(), route_id: record.route_id.clone(), active: true };
    repo.insert_row(&tables.parent, &trip.to_row())
        .await
        .map_err(|err| repository!("inserting trip {}: {:#}", key.plate_number, err))?;

    let visit = StopVisit {
        key: key.clone(),
        station_sequence: record.station_sequence,
        arrival_time: observed_at,
        station_id: record.station_id.clone(),
    };
    repo.insert_row(&tables.child, &visit.to_row())
        .await
        .map_err(|err| repository!("inserting first stop of {}: {:#}", key.plate_number, err))?;

    info!(
        monotonic_counter.trips_created = 1,
        plate_number = %key.plate_number,
        initiation_time = %key.initiation_time,
        station_sequence = record.station_sequence,
        "trip created"
    );

    Ok(key)
}

/// Record a stop visit for a continuing trip when the vehicle has advanced
/// past the last recorded station.
///
/// # Errors
///
/// Returns `Error::Validation` for a record without a plate number and
/// `Error::Repository` when the lookup or the insert fails.
pub async fn append_stop(
    repo: &impl Repository, tables: &Tables, continuing: &ContinuingRecord,
    observed_at: DateTime<Utc>,
) -> Result<AppendOutcome> {
    let key = continuing.key();
    key.validate()?;
    let reported = continuing.live.station_sequence;

    let last = repo
        .last_station_sequence(&tables.child, &key)
        .await
        .map_err(|err| repository!("reading last stop of {}: {:#}", key.plate_number, err))?;

    if let Some(last) = last
        && reported <= last
    {
        debug!(plate_number = %key.plate_number, last, reported, "sequence not advancing");
        return Ok(AppendOutcome::NotAdvancing { last, reported });
    }

    let visit = StopVisit {
        key,
        station_sequence: reported,
        arrival_time: observed_at,
        station_id: continuing.live.station_id.clone(),
    };
    repo.insert_row(&tables.child, &visit.to_row())
        .await
        .map_err(|err| repository!("inserting stop of {}: {:#}", visit.key.plate_number, err))?;

    info!(
        monotonic_counter.stops_appended = 1,
        plate_number = %visit.key.plate_number,
        station_sequence = reported,
        "stop appended"
    );

    Ok(AppendOutcome::Appended)
}

/// Mark the trip inactive. Closing an already closed trip is a no-op.
///
/// # Errors
///
/// Returns `Error::Validation` when the key has no plate number and
/// `Error::Repository` when the update fails.
pub async fn close_trip(
    repo: &impl Repository, tables: &Tables, key: &TripKey,
) -> Result<CloseOutcome> {
    key.validate()?;

    let mut conditions = key.conditions();
    conditions.push(Condition::eq(ACTIVE, true));
    let update = Row::from([(ACTIVE.to_string(), Value::Bool(false))]);

    let changed = repo
        .update_rows(&tables.parent, &conditions, &update)
        .await
        .map_err(|err| repository!("closing trip {}: {:#}", key.plate_number, err))?;

    if changed == 0 {
        debug!(
            plate_number = %key.plate_number,
            initiation_time = %key.initiation_time,
            "trip already closed"
        );
        return Ok(CloseOutcome::AlreadyClosed);
    }

    Ok(CloseOutcome::Closed)
}
