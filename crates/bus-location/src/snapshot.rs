//! Normalized live snapshot

use chrono::{DateTime, Utc};
use realtime::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::feed::{BusLocation, BusLocationResponse, RESULT_NO_DATA, RESULT_OK};
use crate::local_time;

/// One vehicle reported live in a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRecord {
    pub plate_number: String,
    pub route_id: String,
    pub station_sequence: i32,
    pub station_id: Option<String>,
}

impl TryFrom<&BusLocation> for LiveRecord {
    type Error = Error;

    fn try_from(location: &BusLocation) -> Result<Self> {
        let plate_number = non_empty(location.plate_no.as_deref())
            .ok_or_else(|| Error::Parse("bus location without plateNo".to_string()))?;
        let route_id = non_empty(location.route_id.as_deref())
            .ok_or_else(|| Error::Parse(format!("{plate_number}: missing routeId")))?;
        let seq = non_empty(location.station_seq.as_deref())
            .ok_or_else(|| Error::Parse(format!("{plate_number}: missing stationSeq")))?;
        let station_sequence = seq
            .parse::<i32>()
            .map_err(|err| Error::Parse(format!("{plate_number}: stationSeq {seq:?}: {err}")))?;

        Ok(Self {
            plate_number: plate_number.to_string(),
            route_id: route_id.to_string(),
            station_sequence,
            station_id: non_empty(location.station_id.as_deref()).map(ToString::to_string),
        })
    }
}

/// Vehicles reported live in one poll, all observed at the same instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub observed_at: DateTime<Utc>,
    pub records: Vec<LiveRecord>,
}

impl Snapshot {
    /// Normalize a decoded response for the configured route.
    ///
    /// Records that cannot be normalized are skipped individually; the rest of
    /// the batch is kept.
    ///
    /// # Errors
    ///
    /// Will return one of the following errors:
    ///  - `Error::NoLiveData` if no vehicle is operating on the route
    ///  - `Error::Fetch` if the service reported a failure result code
    ///  - `Error::Parse` if the response carries no query time
    ///  - `Error::TimeParse` if the query time is malformed
    pub fn normalize(response: &BusLocationResponse, config: &FeedConfig) -> Result<Self> {
        let header = &response.header;
        match header.result_code {
            Some(RESULT_NO_DATA) => {
                return Err(Error::NoLiveData(format!(
                    "no bus is operating on route {}",
                    config.route_id
                )));
            }
            Some(code) if code != RESULT_OK => {
                let message = header.result_message.as_deref().unwrap_or_default();
                return Err(Error::Fetch(format!("service returned result {code}: {message}")));
            }
            _ => {}
        }

        let mut records = Vec::with_capacity(response.bus_locations().len());
        for location in response.bus_locations() {
            let record = match LiveRecord::try_from(location) {
                Ok(record) => record,
                Err(err) => {
                    warn!(monotonic_counter.skipped_records = 1, error = %err, "skipping bus location");
                    continue;
                }
            };
            if record.route_id != config.route_id {
                warn!(
                    plate_number = %record.plate_number,
                    route_id = %record.route_id,
                    "skipping bus location for another route"
                );
                continue;
            }
            records.push(record);
        }

        if records.is_empty() {
            return Err(Error::NoLiveData(format!(
                "no bus is operating on route {}",
                config.route_id
            )));
        }

        let Some(query_time) = non_empty(header.query_time.as_deref()) else {
            return Err(Error::Parse("response has no queryTime".to_string()));
        };
        let observed_at = local_time::to_utc(query_time, &config.zone_label)?;
        debug!(%observed_at, query_time, vehicles = records.len(), "snapshot normalized");

        Ok(Self { observed_at, records })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
