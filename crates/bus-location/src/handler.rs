//! Bus location fetch
//!
//! Request the route's live bus locations and normalize them into a
//! [`Snapshot`].

use http::header::ACCEPT;
use http::{Method, Request};
use realtime::{Error, HttpRequest, Result};
use tracing::{info, warn};

use crate::config::FeedConfig;
use crate::feed::BusLocationResponse;
use crate::snapshot::Snapshot;

/// Fetch the live snapshot for the configured route.
///
/// Any failure here happens before reconciliation, so no partial upstream data
/// reaches the store.
///
/// # Errors
///
/// Returns `Error::Fetch` when the service is unreachable or answers with a
/// non-success status, `Error::Parse` when the payload cannot be decoded and
/// the errors documented on [`Snapshot::normalize`].
pub async fn fetch_snapshot(http: &impl HttpRequest, config: &FeedConfig) -> Result<Snapshot> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(config.request_uri())
        .header(ACCEPT, "application/xml")
        .body(Vec::new())
        .map_err(|err| Error::Fetch(format!("building bus location request: {err}")))?;

    let response = http
        .fetch(request)
        .await
        .map_err(|err| Error::Fetch(format!("requesting bus locations: {err:#}")))?;

    let status = response.status();
    if !status.is_success() {
        warn!(%status, route_id = %config.route_id, "bus location request failed");
        return Err(Error::Fetch(format!("bus location service returned {status}")));
    }

    let message = BusLocationResponse::try_from(&response.body()[..])?;
    let snapshot = Snapshot::normalize(&message, config)?;

    info!(
        route_id = %config.route_id,
        observed_at = %snapshot.observed_at,
        vehicles = snapshot.records.len(),
        "fetched bus locations"
    );

    Ok(snapshot)
}
