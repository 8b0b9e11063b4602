//! # Staleness guard
//!
//! Trips that have run longer than the threshold are force-closed, whether or
//! not the vehicle is still reported live.

use chrono::{DateTime, TimeDelta, Utc};

use crate::records::TripRef;

/// Whether a trip started at `initiation_time` has run strictly longer than
/// `threshold` at `now`.
#[must_use]
pub fn is_stale(initiation_time: DateTime<Utc>, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
    now - initiation_time > threshold
}

/// Split active trips into those eligible for reconciliation and those to
/// close as stale. Every trip lands in exactly one side, in input order.
#[must_use]
pub fn partition_stale(
    active: Vec<TripRef>, now: DateTime<Utc>, threshold: TimeDelta,
) -> (Vec<TripRef>, Vec<TripRef>) {
    active.into_iter().partition(|trip| !is_stale(trip.key.initiation_time, now, threshold))
}
