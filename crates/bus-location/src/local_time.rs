//! # Feed time
//!
//! The service reports `queryTime` as local civil time without an offset.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use realtime::{Error, Result};

/// `queryTime` layout. The fractional part is optional.
pub const FEED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Zone label written by hosts whose civil clock runs on KST but is labeled
/// UTC. Timestamps under this label are nine hours ahead of the true instant.
pub const MISLABELED_ZONE: &str = "UTC";

const MISLABELED_OFFSET_HOURS: i64 = 9;

/// Convert a feed timestamp in the civil time of `zone_label` into a UTC
/// instant.
///
/// A label of exactly `"UTC"` is treated as the mislabeled-clock deployment:
/// the naive time is read as UTC and shifted nine hours earlier. Any other
/// label must be an IANA zone name.
///
/// # Errors
///
/// Returns `Error::TimeParse` when the timestamp does not match
/// [`FEED_TIME_FORMAT`], when the zone label is unknown, or when the local
/// time does not exist in that zone.
pub fn to_utc(timestamp: &str, zone_label: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(timestamp.trim(), FEED_TIME_FORMAT)
        .map_err(|err| Error::TimeParse(format!("invalid feed time {timestamp:?}: {err}")))?;

    if zone_label == MISLABELED_ZONE {
        return Ok(naive.and_utc() - TimeDelta::hours(MISLABELED_OFFSET_HOURS));
    }

    let tz: Tz = zone_label
        .parse()
        .map_err(|err| Error::TimeParse(format!("unknown zone label {zone_label:?}: {err}")))?;
    let Some(local) = tz.from_local_datetime(&naive).earliest() else {
        return Err(Error::TimeParse(format!("{timestamp} does not exist in {zone_label}")));
    };

    Ok(local.with_timezone(&Utc))
}
