use std::borrow::Cow;

/// Gyeonggi bus location service, `getBusLocationList` operation.
pub const DEFAULT_BASE_URL: &str =
    "http://apis.data.go.kr/6410000/buslocationservice/getBusLocationList";

/// Civil time zone the feed reports `queryTime` in.
pub const DEFAULT_ZONE_LABEL: &str = "Asia/Seoul";

/// Upstream feed settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub base_url: Cow<'static, str>,
    pub service_key: String,
    pub route_id: String,

    /// IANA zone label used to interpret `queryTime`. `"UTC"` selects the
    /// mislabeled-clock correction in [`crate::local_time::to_utc`].
    pub zone_label: Cow<'static, str>,
}

impl FeedConfig {
    #[must_use]
    pub fn new(service_key: impl Into<String>, route_id: impl Into<String>) -> Self {
        Self {
            base_url: Cow::Borrowed(DEFAULT_BASE_URL),
            service_key: service_key.into(),
            route_id: route_id.into(),
            zone_label: Cow::Borrowed(DEFAULT_ZONE_LABEL),
        }
    }

    /// Request URI for the route's location list.
    #[must_use]
    pub fn request_uri(&self) -> String {
        format!(
            "{}?serviceKey={}&routeId={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.service_key),
            urlencoding::encode(&self.route_id)
        )
    }
}
