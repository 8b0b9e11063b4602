//! # Provider
//!
//! Host implementation of the ledger's provider seams: outbound HTTP through
//! `reqwest`, the trip store through `tokio-postgres` and the system clock.

use std::error::Error as StdError;

use anyhow::{Context, Result, bail};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, NaiveDateTime, Utc};
use http::{Request, Response};
use realtime::{Clock, HttpRequest, SystemClock};
use tokio_postgres::NoTls;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tracing::{debug, error};
use trip_ledger::schema::{create_statements, quote_ident};
use trip_ledger::{
    Condition, INITIATION_TIME, PLATE_NUMBER, Repository, Row, STATION_SEQUENCE, Tables, TripKey,
    Value,
};

use crate::config::DatabaseConfig;

pub struct Provider {
    http: reqwest::Client,
    db: tokio_postgres::Client,
    clock: SystemClock,
}

impl Provider {
    /// Open the store connection and build the HTTP client.
    pub async fn connect(database: &DatabaseConfig) -> Result<Self> {
        let (db, connection) = database
            .to_pg()
            .connect(NoTls)
            .await
            .with_context(|| format!("connecting to {}:{}", database.host, database.port))?;

        // the connection performs the actual communication with the store
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "database connection error");
            }
        });

        let http = reqwest::Client::builder().build().context("building HTTP client")?;
        Ok(Self { http, db, clock: SystemClock })
    }

    /// Create the ledger tables when they do not exist.
    pub async fn bootstrap(&self, tables: &Tables) -> Result<()> {
        for statement in create_statements(tables) {
            self.db.batch_execute(&statement).await.context("creating ledger tables")?;
        }
        debug!(parent = %tables.parent, child = %tables.child, "ledger tables ready");
        Ok(())
    }
}

impl trip_ledger::Provider for Provider {}

impl HttpRequest for Provider {
    async fn fetch(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>> {
        let (parts, body) = request.into_parts();
        let response = self
            .http
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await
            .with_context(|| format!("requesting {}", parts.uri))?;

        let mut builder = Response::builder().status(response.status());
        if let Some(headers) = builder.headers_mut() {
            headers.clone_from(response.headers());
        }
        let body = response.bytes().await.context("reading response body")?;

        builder.body(body).context("building response")
    }
}

impl Clock for Provider {
    fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }
}

impl Repository for Provider {
    async fn select(
        &self, table: &str, columns: &[&str], conditions: &[Condition],
    ) -> Result<Vec<Row>> {
        let projection = columns.iter().map(|column| quote_ident(column)).collect::<Vec<_>>();
        let mut params = Vec::with_capacity(conditions.len());
        let filter = where_clause(conditions, &mut params);
        let sql = format!("SELECT {} FROM {}{filter}", projection.join(", "), quote_ident(table));

        let rows = self.db.query(&sql, &bind(&params)).await.with_context(|| format!("query: {sql}"))?;
        rows.iter().map(decode_row).collect()
    }

    async fn insert_row(&self, table: &str, row: &Row) -> Result<()> {
        let columns = row.keys().map(|column| quote_ident(column)).collect::<Vec<_>>();
        let placeholders = (1..=row.len()).map(|idx| format!("${idx}")).collect::<Vec<_>>();
        let params = row.values().map(Param).collect::<Vec<_>>();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns.join(", "),
            placeholders.join(", ")
        );

        self.db.execute(&sql, &bind(&params)).await.with_context(|| format!("insert: {sql}"))?;
        Ok(())
    }

    async fn update_rows(
        &self, table: &str, conditions: &[Condition], update: &Row,
    ) -> Result<u64> {
        if update.is_empty() {
            bail!("update of {table} sets no columns");
        }

        let mut params = update.values().map(Param).collect::<Vec<_>>();
        let assignments = update
            .keys()
            .enumerate()
            .map(|(idx, column)| format!("{} = ${}", quote_ident(column), idx + 1))
            .collect::<Vec<_>>();
        let filter = where_clause(conditions, &mut params);
        let sql = format!("UPDATE {} SET {}{filter}", quote_ident(table), assignments.join(", "));

        self.db.execute(&sql, &bind(&params)).await.with_context(|| format!("update: {sql}"))
    }

    async fn last_station_sequence(&self, table: &str, key: &TripKey) -> Result<Option<i32>> {
        let sql = format!(
            "SELECT MAX({}) FROM {} WHERE {} = $1 AND {} = $2",
            quote_ident(STATION_SEQUENCE),
            quote_ident(table),
            quote_ident(INITIATION_TIME),
            quote_ident(PLATE_NUMBER)
        );

        let row = self
            .db
            .query_one(&sql, &[&key.initiation_time, &key.plate_number])
            .await
            .with_context(|| format!("query: {sql}"))?;
        row.try_get(0).context("reading last station sequence")
    }

    async fn begin(&self) -> Result<()> {
        self.db.batch_execute("BEGIN").await.context("BEGIN")
    }

    async fn commit(&self) -> Result<()> {
        self.db.batch_execute("COMMIT").await.context("COMMIT")
    }

    async fn rollback(&self) -> Result<()> {
        self.db.batch_execute("ROLLBACK").await.context("ROLLBACK")
    }
}

/// A [`Value`] bound as a statement parameter.
#[derive(Debug)]
struct Param<'a>(&'a Value);

impl ToSql for Param<'_> {
    fn to_sql(
        &self, ty: &Type, out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self.0 {
            Value::Text(value) => value.to_sql_checked(ty, out),
            Value::Int(value) => value.to_sql_checked(ty, out),
            Value::Bool(value) => value.to_sql_checked(ty, out),
            Value::Timestamp(value) => value.to_sql_checked(ty, out),
            Value::Null => Ok(IsNull::Yes),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn bind<'a>(params: &'a [Param<'_>]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(|param| param as &(dyn ToSql + Sync)).collect()
}

/// Render `conditions` as a WHERE clause, appending their values to `params`
/// and numbering placeholders after the parameters already present.
fn where_clause<'a>(conditions: &'a [Condition], params: &mut Vec<Param<'a>>) -> String {
    if conditions.is_empty() {
        return String::new();
    }

    let predicates = conditions
        .iter()
        .map(|condition| {
            params.push(Param(&condition.value));
            format!("{} {} ${}", quote_ident(&condition.column), condition.operator, params.len())
        })
        .collect::<Vec<_>>();

    format!(" WHERE {}", predicates.join(" AND "))
}

fn decode_row(row: &tokio_postgres::Row) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = decode_value(row, idx, column.type_())
                .with_context(|| format!("decoding column {}", column.name()))?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}

fn decode_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Result<Value> {
    let value = if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(Value::Int)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(|value| Value::Int(value.into()))
    } else if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)?.map(Value::Timestamp)
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)?.map(|value| Value::Timestamp(value.and_utc()))
    } else {
        bail!("unsupported column type {ty}");
    };

    Ok(value.unwrap_or(Value::Null))
}
