//! # Repository
//!
//! Storage seam for the trip ledger. Rows are loosely typed here and nowhere
//! else: records convert to and from [`Row`] at this boundary.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::records::TripKey;

/// A column value as exchanged with the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Text(String),
    Int(i32),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Null,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A `column operator value` filter. Conditions in a list are ANDed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    #[must_use]
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self { column: column.into(), operator, value: value.into() }
    }

    /// Equality condition.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Eq, value)
    }
}

/// Column name to value, ordered by column name.
pub type Row = BTreeMap<String, Value>;

/// The `Repository` trait defines the store operations the ledger needs.
///
/// Implementations surface failures as `anyhow` errors; the lifecycle
/// operations classify them as repository errors.
pub trait Repository: Send + Sync {
    /// Rows of `table` matching every condition, restricted to `columns`.
    fn select(
        &self, table: &str, columns: &[&str], conditions: &[Condition],
    ) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Insert one row. Fails on a primary key conflict.
    fn insert_row(&self, table: &str, row: &Row) -> impl Future<Output = Result<()>> + Send;

    /// Set the `update` columns on every row matching `conditions`, returning
    /// the number of rows changed.
    fn update_rows(
        &self, table: &str, conditions: &[Condition], update: &Row,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Highest station sequence recorded in `table` for the trip.
    fn last_station_sequence(
        &self, table: &str, key: &TripKey,
    ) -> impl Future<Output = Result<Option<i32>>> + Send;

    /// Open a transaction spanning subsequent calls.
    fn begin(&self) -> impl Future<Output = Result<()>> + Send;

    /// Commit the open transaction.
    fn commit(&self) -> impl Future<Output = Result<()>> + Send;

    /// Discard the open transaction.
    fn rollback(&self) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn optional_values() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("S1")), Value::Text("S1".to_string()));
    }

    #[test]
    fn condition() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let condition = Condition::eq("initiation_time", at);

        assert_eq!(condition.operator.as_sql(), "=");
        assert_eq!(condition.value, Value::Timestamp(at));
        assert_eq!(Operator::Ne.to_string(), "<>");
    }
}
