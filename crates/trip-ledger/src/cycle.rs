//! # Reconciliation cycle
//!
//! One poll: fetch the live snapshot, read the active trips, work out the
//! mutations and apply them according to the configured [`WriteMode`].

use bus_location::{LiveRecord, Snapshot};
use chrono::{DateTime, TimeDelta, Utc};
use realtime::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::{Config, Tables, WriteMode};
use crate::lifecycle::{
    AppendOutcome, CloseOutcome, CloseReason, append_stop, close_trip, create_trip,
};
use crate::provider::Provider;
use crate::records::{
    ACTIVE, ContinuingRecord, INITIATION_TIME, PLATE_NUMBER, ROUTE_ID, TripKey, TripRef,
};
use crate::reconcile::{classify, index_by_key, split_duplicates};
use crate::repository::{Condition, Repository};
use crate::staleness::partition_stale;

/// A single write derived from reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create(LiveRecord),
    Append(ContinuingRecord),
    Close { key: TripKey, reason: CloseReason },
}

/// What a cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub observed_at: DateTime<Utc>,
    pub live: usize,
    pub active: usize,
    pub created: usize,
    pub appended: usize,
    pub not_advancing: usize,
    pub closed_ended: usize,
    pub closed_stale: usize,
    pub closed_duplicate: usize,
    pub already_closed: usize,

    /// Writes that failed and were skipped in independent mode.
    pub skipped: usize,
}

impl CycleReport {
    const fn new(observed_at: DateTime<Utc>, live: usize, active: usize) -> Self {
        Self {
            observed_at,
            live,
            active,
            created: 0,
            appended: 0,
            not_advancing: 0,
            closed_ended: 0,
            closed_stale: 0,
            closed_duplicate: 0,
            already_closed: 0,
            skipped: 0,
        }
    }

    const fn record_close(&mut self, reason: CloseReason) {
        match reason {
            CloseReason::Ended => self.closed_ended += 1,
            CloseReason::Stale => self.closed_stale += 1,
            CloseReason::Duplicate => self.closed_duplicate += 1,
        }
    }
}

/// Run one reconciliation cycle under the configured deadline.
///
/// # Errors
///
/// Returns the first fatal error of the cycle, or `Error::DeadlineExceeded`
/// when the cycle overruns. In transactional mode nothing the cycle wrote
/// survives an error.
pub async fn run(config: &Config, provider: &impl Provider) -> Result<CycleReport> {
    let Ok(result) = tokio::time::timeout(config.deadline, reconcile(config, provider)).await
    else {
        warn!(deadline = ?config.deadline, "cycle deadline exceeded");
        if config.write_mode == WriteMode::Transactional {
            rollback(provider).await;
        }
        return Err(Error::DeadlineExceeded(format!(
            "cycle did not finish within {:?}",
            config.deadline
        )));
    };
    result
}

async fn reconcile(config: &Config, provider: &impl Provider) -> Result<CycleReport> {
    let snapshot = bus_location::fetch_snapshot(provider, &config.feed).await?;
    let active = active_trips(provider, &config.tables).await?;
    let now = provider.now_utc();

    let mut report = CycleReport::new(snapshot.observed_at, snapshot.records.len(), active.len());
    let mutations = plan(&snapshot, active, now, config.stale_after);

    match config.write_mode {
        WriteMode::Transactional => {
            apply_transactional(provider, &config.tables, &mutations, &snapshot, &mut report)
                .await?;
        }
        WriteMode::Independent => {
            apply_independent(provider, &config.tables, &mutations, &snapshot, &mut report)
                .await?;
        }
    }

    info!(
        observed_at = %report.observed_at,
        live = report.live,
        active = report.active,
        created = report.created,
        appended = report.appended,
        not_advancing = report.not_advancing,
        closed_ended = report.closed_ended,
        closed_stale = report.closed_stale,
        closed_duplicate = report.closed_duplicate,
        already_closed = report.already_closed,
        skipped = report.skipped,
        "cycle complete"
    );

    Ok(report)
}

/// Active trips as recorded in the store.
///
/// # Errors
///
/// Returns `Error::Repository` when the query fails and `Error::Validation`
/// when a row lacks a key column.
pub async fn active_trips(repo: &impl Repository, tables: &Tables) -> Result<Vec<TripRef>> {
    let columns = [INITIATION_TIME, PLATE_NUMBER, ROUTE_ID];
    let rows = repo
        .select(&tables.parent, &columns, &[Condition::eq(ACTIVE, true)])
        .await
        .map_err(|err| Error::Repository(format!("querying active trips: {err:#}")))?;

    rows.iter().map(TripRef::try_from).collect()
}

/// Derive the ordered mutations for a snapshot against the active trips:
/// creates, appends, then closes for ended, stale and duplicate trips.
///
/// A stale trip is closed even while its vehicle is live; the vehicle then
/// counts as new and gets a fresh trip in the same pass.
#[must_use]
pub fn plan(
    snapshot: &Snapshot, active: Vec<TripRef>, now: DateTime<Utc>, stale_after: TimeDelta,
) -> Vec<Mutation> {
    let (active, duplicates) = split_duplicates(active);
    let (eligible, stale) = partition_stale(active, now, stale_after);

    let live_index = index_by_key(&snapshot.records, |record| record.plate_number.clone());
    let store_index = index_by_key(&eligible, |trip| trip.key.plate_number.clone());
    let classification = classify(&live_index, &store_index);

    let mut new = classification.new.into_values().collect::<Vec<_>>();
    new.sort_unstable();
    let mut continuing = classification.continuing.into_values().collect::<Vec<_>>();
    continuing.sort_unstable();
    let mut ended = classification.ended.into_values().collect::<Vec<_>>();
    ended.sort_unstable();

    let mut mutations = Vec::with_capacity(
        new.len() + continuing.len() + ended.len() + stale.len() + duplicates.len(),
    );
    mutations.extend(new.into_iter().map(|idx| Mutation::Create(snapshot.records[idx].clone())));
    mutations.extend(continuing.into_iter().map(|(live_idx, store_idx)| {
        Mutation::Append(ContinuingRecord {
            initiation_time: eligible[store_idx].key.initiation_time,
            live: snapshot.records[live_idx].clone(),
        })
    }));
    mutations.extend(ended.into_iter().map(|idx| Mutation::Close {
        key: eligible[idx].key.clone(),
        reason: CloseReason::Ended,
    }));
    mutations.extend(
        stale.into_iter().map(|trip| Mutation::Close { key: trip.key, reason: CloseReason::Stale }),
    );
    mutations.extend(
        duplicates
            .into_iter()
            .map(|trip| Mutation::Close { key: trip.key, reason: CloseReason::Duplicate }),
    );

    mutations
}

async fn apply_transactional(
    repo: &impl Repository, tables: &Tables, mutations: &[Mutation], snapshot: &Snapshot,
    report: &mut CycleReport,
) -> Result<()> {
    if mutations.is_empty() {
        return Ok(());
    }

    repo.begin()
        .await
        .map_err(|err| Error::Repository(format!("beginning transaction: {err:#}")))?;

    for mutation in mutations {
        if let Err(err) = apply(repo, tables, mutation, snapshot.observed_at, report).await {
            error!(code = err.code(), error = %err, "write failed, rolling back cycle");
            rollback(repo).await;
            return Err(err);
        }
    }

    if let Err(err) = repo.commit().await {
        rollback(repo).await;
        return Err(Error::Repository(format!("committing cycle: {err:#}")));
    }

    Ok(())
}

async fn apply_independent(
    repo: &impl Repository, tables: &Tables, mutations: &[Mutation], snapshot: &Snapshot,
    report: &mut CycleReport,
) -> Result<()> {
    for mutation in mutations {
        match apply(repo, tables, mutation, snapshot.observed_at, report).await {
            Ok(()) => {}
            Err(err @ Error::Repository(_)) => {
                error!(monotonic_counter.writes_skipped = 1, error = %err, "write failed, skipping");
                report.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

async fn apply(
    repo: &impl Repository, tables: &Tables, mutation: &Mutation, observed_at: DateTime<Utc>,
    report: &mut CycleReport,
) -> Result<()> {
    match mutation {
        Mutation::Create(record) => {
            create_trip(repo, tables, record, observed_at).await?;
            report.created += 1;
        }
        Mutation::Append(continuing) => {
            match append_stop(repo, tables, continuing, observed_at).await? {
                AppendOutcome::Appended => report.appended += 1,
                AppendOutcome::NotAdvancing { .. } => report.not_advancing += 1,
            }
        }
        Mutation::Close { key, reason } => match close_trip(repo, tables, key).await? {
            CloseOutcome::Closed => {
                info!(
                    monotonic_counter.trips_closed = 1,
                    plate_number = %key.plate_number,
                    initiation_time = %key.initiation_time,
                    %reason,
                    "trip closed"
                );
                report.record_close(*reason);
            }
            CloseOutcome::AlreadyClosed => report.already_closed += 1,
        },
    }
    Ok(())
}

async fn rollback(repo: &impl Repository) {
    if let Err(err) = repo.rollback().await {
        warn!(error = %format!("{err:#}"), "rollback failed");
    }
}
