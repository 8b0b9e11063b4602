#![allow(missing_docs)]


use bus_location::{FeedConfig, fetch_snapshot};
use chrono::{TimeZone, Utc};
use http::StatusCode;

use self::provider::MockProvider;

// Should decode the feed into a snapshot of typed records.
#[tokio::test]
async fn snapshot() {
    let provider = MockProvider::new(
        XmlBuilder::new().bus("111", "3", Some("S3")).bus("222", "7", None).xml(),
    );

    let snapshot = fetch_snapshot(&provider, &config()).await.expect("should fetch");

    assert_eq!(snapshot.observed_at, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());
    assert_eq!(snapshot.records.len(), 2);
    assert_eq!(snapshot.records[0].plate_number, "111");
    assert_eq!(snapshot.records[0].station_sequence, 3);
    assert_eq!(snapshot.records[1].station_id, None);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].ends_with("?serviceKey=key&routeId=R1"));
}

// Should read the query time under the mislabeled UTC zone.
#[tokio::test]
async fn mislabeled_zone() {
    let provider = MockProvider::new(XmlBuilder::new().bus("111", "3", None).xml());
    let mut config = config();
    config.zone_label = "UTC".into();

    let snapshot = fetch_snapshot(&provider, &config).await.expect("should fetch");
    assert_eq!(snapshot.observed_at, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());
}

// Should signal no live data distinctly when no bus is operating.
#[tokio::test]
async fn no_bus_operating() {
    let provider = MockProvider::new(XmlBuilder::new().result_code(4).xml());

    let err = fetch_snapshot(&provider, &config()).await.expect_err("should fail");
    assert_eq!(err.code(), "no_live_data");
}

// Should fail the fetch for a non-success status.
#[tokio::test]
async fn server_error() {
    let provider = MockProvider::status(StatusCode::SERVICE_UNAVAILABLE);

    let err = fetch_snapshot(&provider, &config()).await.expect_err("should fail");
    assert_eq!(err.code(), "fetch_error");
    assert!(err.is_retryable());
}

// Should fail the fetch when the service cannot be reached.
#[tokio::test]
async fn unreachable() {
    let provider = MockProvider::unreachable();

    let err = fetch_snapshot(&provider, &config()).await.expect_err("should fail");
    assert_eq!(err.code(), "fetch_error");
}

// Should reject a payload that is not the expected XML.
#[tokio::test]
async fn malformed_payload() {
    let provider = MockProvider::new("<response><msgHeader><resultCode>ok</resultCode>");

    let err = fetch_snapshot(&provider, &config()).await.expect_err("should fail");
    assert_eq!(err.code(), "parse_error");
}

// Should reject a malformed query time for the whole batch.
#[tokio::test]
async fn malformed_query_time() {
    let provider = MockProvider::new(
        XmlBuilder::new().query_time("2024/01/01 10:00").bus("111", "3", None).xml(),
    );

    let err = fetch_snapshot(&provider, &config()).await.expect_err("should fail");
    assert_eq!(err.code(), "time_parse_error");
}

fn config() -> FeedConfig {
    let mut config = FeedConfig::new("key", "R1");
    config.base_url = "http://localhost:8080/buslocationservice/getBusLocationList".into();
    config
}

struct XmlBuilder<'a> {
    query_time: &'a str,
    result_code: i32,
    buses: Vec<(&'a str, &'a str, Option<&'a str>)>,
}

impl<'a> XmlBuilder<'a> {
    const fn new() -> Self {
        Self { query_time: "2024-01-01 10:00:00.000000", result_code: 0, buses: Vec::new() }
    }

    const fn query_time(mut self, query_time: &'a str) -> Self {
        self.query_time = query_time;
        self
    }

    const fn result_code(mut self, result_code: i32) -> Self {
        self.result_code = result_code;
        self
    }

    fn bus(mut self, plate: &'a str, seq: &'a str, station: Option<&'a str>) -> Self {
        self.buses.push((plate, seq, station));
        self
    }

    // Generate a bus location list response.
    fn xml(self) -> String {
        let mut body = String::new();
        for (plate, seq, station) in self.buses {
            let station = station.map(|id| format!("<stationId>{id}</stationId>")).unwrap_or_default();
            body.push_str(&format!(
                "<busLocationList><plateNo>{plate}</plateNo><routeId>R1</routeId>{station}<stationSeq>{seq}</stationSeq></busLocationList>"
            ));
        }
        let body = if body.is_empty() { String::new() } else { format!("<msgBody>{body}</msgBody>") };

        format!(
            "<response><msgHeader><queryTime>{}</queryTime><resultCode>{}</resultCode></msgHeader>{body}</response>",
            self.query_time, self.result_code
        )
    }
}
