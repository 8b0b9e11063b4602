#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{Request, Response, StatusCode};
use realtime::{Clock, HttpRequest};
use trip_ledger::{
    Condition, INITIATION_TIME, Operator, PLATE_NUMBER, Provider, Repository, Row,
    STATION_SEQUENCE, Tables, TripKey, Value,
};

/// Store operation a failure can be injected into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Op {
    Select,
    Insert,
    Update,
    Commit,
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Row>>,
    saved: Option<HashMap<String, Vec<Row>>>,
    failures: Vec<(Op, String)>,
    writes: usize,
    commits: usize,
    rollbacks: usize,
}

#[derive(Clone)]
pub struct MockProvider {
    tables: Tables,
    feed: Option<String>,
    now: DateTime<Utc>,
    write_delay: Option<Duration>,
    state: Arc<Mutex<State>>,
}

#[allow(dead_code, clippy::missing_panics_doc)]
impl MockProvider {
    #[must_use]
    pub fn new(feed: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            tables: Tables::default(),
            feed: Some(feed.into()),
            now,
            write_delay: None,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Provider whose feed cannot be reached.
    #[must_use]
    pub fn unreachable(now: DateTime<Utc>) -> Self {
        let mut provider = Self::new("", now);
        provider.feed = None;
        provider
    }

    #[must_use]
    pub const fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn fail(&self, op: Op, table: &str) {
        self.state.lock().expect("lock").failures.push((op, table.to_string()));
    }

    /// Clear every injected failure.
    pub fn heal(&self) {
        self.state.lock().expect("lock").failures.clear();
    }

    /// Seed a row without counting it as a cycle write.
    pub fn seed(&self, table: &str, row: Row) {
        let mut state = self.state.lock().expect("lock");
        state.tables.entry(table.to_string()).or_default().push(row);
    }

    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        let state = self.state.lock().expect("lock");
        let mut rows = state.tables.get(table).cloned().unwrap_or_default();
        rows.sort();
        rows
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.state.lock().expect("lock").writes
    }

    #[must_use]
    pub fn commits(&self) -> usize {
        self.state.lock().expect("lock").commits
    }

    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.state.lock().expect("lock").rollbacks
    }

    fn primary_key(&self, table: &str) -> &'static [&'static str] {
        if table == self.tables.child {
            &[INITIATION_TIME, PLATE_NUMBER, STATION_SEQUENCE]
        } else {
            &[INITIATION_TIME, PLATE_NUMBER]
        }
    }
}

impl State {
    fn check(&self, op: Op, table: &str) -> Result<()> {
        if self.failures.iter().any(|(failing, name)| *failing == op && name == table) {
            bail!("injected {op:?} failure on {table}");
        }
        Ok(())
    }
}

fn matches(row: &Row, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| {
        let Some(value) = row.get(&condition.column) else {
            return false;
        };
        if matches!(value, Value::Null) || matches!(condition.value, Value::Null) {
            return false;
        }
        match condition.operator {
            Operator::Eq => *value == condition.value,
            Operator::Ne => *value != condition.value,
            Operator::Lt => *value < condition.value,
            Operator::Le => *value <= condition.value,
            Operator::Gt => *value > condition.value,
            Operator::Ge => *value >= condition.value,
        }
    })
}

fn same_key(left: &Row, right: &Row, columns: &[&str]) -> bool {
    columns.iter().all(|column| left.get(*column) == right.get(*column))
}

impl Provider for MockProvider {}

impl HttpRequest for MockProvider {
    async fn fetch(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>> {
        let Some(feed) = &self.feed else {
            bail!("connection refused: {}", request.uri());
        };
        Response::builder()
            .status(StatusCode::OK)
            .body(Bytes::from(feed.clone()))
            .context("failed to build response")
    }
}

impl Clock for MockProvider {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now
    }
}

impl Repository for MockProvider {
    async fn select(
        &self, table: &str, columns: &[&str], conditions: &[Condition],
    ) -> Result<Vec<Row>> {
        let state = self.state.lock().expect("lock");
        state.check(Op::Select, table)?;

        let rows = state.tables.get(table).map(Vec::as_slice).unwrap_or_default();
        Ok(rows
            .iter()
            .filter(|row| matches(row, conditions))
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|column| row.get(*column).map(|v| ((*column).to_string(), v.clone())))
                    .collect()
            })
            .collect())
    }

    async fn insert_row(&self, table: &str, row: &Row) -> Result<()> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        let pk = self.primary_key(table);

        let mut state = self.state.lock().expect("lock");
        state.check(Op::Insert, table)?;

        if table == self.tables.child {
            let parents = state.tables.get(self.tables.parent.as_ref());
            let has_parent = parents.is_some_and(|rows| {
                rows.iter().any(|parent| same_key(parent, row, &[INITIATION_TIME, PLATE_NUMBER]))
            });
            if !has_parent {
                bail!("insert on {table} violates foreign key constraint");
            }
        }

        let rows = state.tables.entry(table.to_string()).or_default();
        if rows.iter().any(|existing| same_key(existing, row, pk)) {
            bail!("duplicate key value violates unique constraint on {table}");
        }
        rows.push(row.clone());
        state.writes += 1;
        Ok(())
    }

    async fn update_rows(
        &self, table: &str, conditions: &[Condition], update: &Row,
    ) -> Result<u64> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().expect("lock");
        state.check(Op::Update, table)?;

        let mut changed = 0;
        for row in state.tables.entry(table.to_string()).or_default() {
            if matches(row, conditions) {
                row.extend(update.iter().map(|(column, value)| (column.clone(), value.clone())));
                changed += 1;
            }
        }
        state.writes += 1;
        Ok(changed)
    }

    async fn last_station_sequence(&self, table: &str, key: &TripKey) -> Result<Option<i32>> {
        let state = self.state.lock().expect("lock");
        state.check(Op::Select, table)?;

        let rows = state.tables.get(table).map(Vec::as_slice).unwrap_or_default();
        Ok(rows
            .iter()
            .filter(|row| matches(row, &key.conditions()))
            .filter_map(|row| match row.get(STATION_SEQUENCE) {
                Some(Value::Int(seq)) => Some(*seq),
                _ => None,
            })
            .max())
    }

    async fn begin(&self) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        if state.saved.is_some() {
            bail!("transaction already open");
        }
        state.saved = Some(state.tables.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        state.check(Op::Commit, self.tables.parent.as_ref())?;
        state.saved = None;
        state.commits += 1;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        if let Some(saved) = state.saved.take() {
            state.tables = saved;
        }
        state.rollbacks += 1;
        Ok(())
    }
}
