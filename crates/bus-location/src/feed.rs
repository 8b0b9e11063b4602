//! Bus location feed types

use realtime::Error;
use serde::{Deserialize, Serialize};

/// Result code for a successful query.
pub const RESULT_OK: i32 = 0;

/// Result code the service uses when no bus is running on the route.
pub const RESULT_NO_DATA: i32 = 4;

/// Bus location list response as deserialized from the service XML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BusLocationResponse {
    /// Query metadata.
    #[serde(rename(deserialize = "msgHeader"))]
    pub header: MsgHeader,

    /// Vehicle list. Omitted by the service when there is no result.
    #[serde(rename(deserialize = "msgBody"))]
    pub body: Option<MsgBody>,
}

impl TryFrom<&str> for BusLocationResponse {
    type Error = Error;

    fn try_from(xml: &str) -> anyhow::Result<Self, Self::Error> {
        quick_xml::de::from_str(xml).map_err(Into::into)
    }
}

impl TryFrom<&[u8]> for BusLocationResponse {
    type Error = Error;

    fn try_from(xml: &[u8]) -> anyhow::Result<Self, Self::Error> {
        quick_xml::de::from_reader(xml).map_err(Into::into)
    }
}

impl BusLocationResponse {
    /// Locations reported in the body, empty when there is no body.
    #[must_use]
    pub fn bus_locations(&self) -> &[BusLocation] {
        self.body.as_ref().map_or(&[], |body| body.bus_locations.as_slice())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MsgHeader {
    /// Local civil time of the query, `YYYY-MM-DD HH:MM:SS.ffffff`.
    #[serde(rename(deserialize = "queryTime"))]
    pub query_time: Option<String>,

    #[serde(rename(deserialize = "resultCode"))]
    pub result_code: Option<i32>,

    #[serde(rename(deserialize = "resultMessage"))]
    pub result_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MsgBody {
    /// One entry per vehicle. Repeated `busLocationList` elements always
    /// decode into a list, including the single-vehicle case.
    #[serde(rename(deserialize = "busLocationList"))]
    pub bus_locations: Vec<BusLocation>,
}

/// A vehicle position as reported by the service. Fields stay as reported
/// until normalized into a [`crate::LiveRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BusLocation {
    #[serde(rename(deserialize = "plateNo"))]
    pub plate_no: Option<String>,

    #[serde(rename(deserialize = "routeId"))]
    pub route_id: Option<String>,

    #[serde(rename(deserialize = "stationId"))]
    pub station_id: Option<String>,

    /// Integer sequence of the station along the route, string encoded.
    #[serde(rename(deserialize = "stationSeq"))]
    pub station_seq: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const TWO_BUSES: &str = r"<response>
  <comMsgHeader/>
  <msgHeader>
    <queryTime>2024-01-01 10:00:00.123456</queryTime>
    <resultCode>0</resultCode>
    <resultMessage>OK</resultMessage>
  </msgHeader>
  <msgBody>
    <busLocationList>
      <endBus>0</endBus>
      <lowPlate>0</lowPlate>
      <plateNo>70A1111</plateNo>
      <plateType>3</plateType>
      <remainSeatCnt>31</remainSeatCnt>
      <routeId>200000085</routeId>
      <stationId>200000177</stationId>
      <stationSeq>3</stationSeq>
    </busLocationList>
    <busLocationList>
      <plateNo>70A2222</plateNo>
      <routeId>200000085</routeId>
      <stationSeq>12</stationSeq>
    </busLocationList>
  </msgBody>
</response>";

    const ONE_BUS: &str = r"<response>
  <msgHeader>
    <queryTime>2024-01-01 10:00:00.5</queryTime>
    <resultCode>0</resultCode>
  </msgHeader>
  <msgBody>
    <busLocationList>
      <plateNo>70A1111</plateNo>
      <routeId>200000085</routeId>
      <stationId>200000177</stationId>
      <stationSeq>3</stationSeq>
    </busLocationList>
  </msgBody>
</response>";

    const NO_RESULT: &str = r"<response>
  <msgHeader>
    <queryTime>2024-01-01 03:00:00.0</queryTime>
    <resultCode>4</resultCode>
    <resultMessage>no result</resultMessage>
  </msgHeader>
</response>";

    #[test]
    fn decodes_repeated_locations() {
        let response = BusLocationResponse::try_from(TWO_BUSES).expect("should deserialize");

        assert_eq!(response.header.query_time.as_deref(), Some("2024-01-01 10:00:00.123456"));
        assert_eq!(response.header.result_code, Some(RESULT_OK));

        let locations = response.bus_locations();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].plate_no.as_deref(), Some("70A1111"));
        assert_eq!(locations[0].station_id.as_deref(), Some("200000177"));
        assert_eq!(locations[0].station_seq.as_deref(), Some("3"));
        assert_eq!(locations[1].station_id, None);
    }

    #[test]
    fn single_location_is_a_list() {
        let response = BusLocationResponse::try_from(ONE_BUS.as_bytes()).expect("should deserialize");
        assert_eq!(response.bus_locations().len(), 1);
    }

    #[test]
    fn missing_body() {
        let response = BusLocationResponse::try_from(NO_RESULT).expect("should deserialize");
        assert_eq!(response.header.result_code, Some(RESULT_NO_DATA));
        assert!(response.bus_locations().is_empty());
    }

    #[test]
    fn malformed_payload() {
        let err = BusLocationResponse::try_from("<response><msgHeader><resultCode>zero")
            .expect_err("should fail");
        assert_eq!(err.code(), "parse_error");
    }
}
