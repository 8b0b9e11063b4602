//! # Bus Trips
//!
//! Runs one reconciliation cycle for the configured route and exits with a
//! status identifying the outcome. Scheduling is left to the host (cron or a
//! systemd timer), which must not start overlapping runs.

mod config;
mod provider;

use std::process::ExitCode;

use realtime::{Error, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use trip_ledger::cycle::{self, CycleReport};

use crate::config::Settings;
use crate::provider::Provider;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    if let Err(err) = dotenv {
        debug!(error = %err, "no .env file loaded");
    }

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %format!("{err:#}"), "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(&settings).await {
        Ok(report) => {
            info!(
                monotonic_counter.cycles_completed = 1,
                route_id = %settings.ledger.feed.route_id,
                created = report.created,
                appended = report.appended,
                closed = report.closed_ended + report.closed_stale + report.closed_duplicate,
                "cycle succeeded"
            );
            ExitCode::SUCCESS
        }
        Err(err @ Error::NoLiveData(_)) => {
            warn!(code = err.code(), error = %err, "no bus operating, nothing reconciled");
            ExitCode::from(err.exit_code())
        }
        Err(err) => {
            error!(
                monotonic_counter.cycles_failed = 1,
                code = err.code(),
                retryable = err.is_retryable(),
                error = %err,
                "cycle failed"
            );
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(settings: &Settings) -> Result<CycleReport> {
    let provider = open(settings).await?;
    cycle::run(&settings.ledger, &provider).await
}

/// Connect to the store and bootstrap its tables, bounded by the cycle
/// deadline so an unresponsive store still ends the run.
async fn open(settings: &Settings) -> Result<Provider> {
    let deadline = settings.ledger.deadline;
    let Ok(result) = tokio::time::timeout(deadline, async {
        let provider = Provider::connect(&settings.database).await?;
        if settings.bootstrap {
            provider.bootstrap(&settings.ledger.tables).await?;
        }
        anyhow::Ok(provider)
    })
    .await
    else {
        warn!(deadline = ?deadline, host = %settings.database.host, "store did not answer");
        return Err(Error::DeadlineExceeded(format!(
            "store connection did not complete within {deadline:?}"
        )));
    };

    result.map_err(|err| Error::Repository(format!("{err:#}")))
}
