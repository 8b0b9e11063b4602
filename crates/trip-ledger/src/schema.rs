//! # Schema
//!
//! DDL for the ledger tables, rendered with the configured table names.

use crate::config::Tables;

/// Quote a SQL identifier, doubling any embedded quote.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` statements for the trip and stop visit
/// tables, parent first.
#[must_use]
pub fn create_statements(tables: &Tables) -> [String; 2] {
    let parent = quote_ident(&tables.parent);
    let child = quote_ident(&tables.child);

    [
        format!(
            "CREATE TABLE IF NOT EXISTS {parent} (
    initiation_time TIMESTAMPTZ NOT NULL,
    plate_number TEXT NOT NULL,
    route_id TEXT NOT NULL,
    active BOOLEAN NOT NULL,
    PRIMARY KEY (initiation_time, plate_number)
)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {child} (
    initiation_time TIMESTAMPTZ NOT NULL,
    plate_number TEXT NOT NULL,
    station_sequence INT NOT NULL,
    arrival_time TIMESTAMPTZ NOT NULL,
    station_id TEXT,
    PRIMARY KEY (initiation_time, plate_number, station_sequence),
    FOREIGN KEY (initiation_time, plate_number) REFERENCES {parent} (initiation_time, plate_number)
)"
        ),
    ]
}
