//! # Trip Ledger
//!
//! Reconciles the live bus snapshot against the trips the store believes are
//! active, then opens, extends and closes trips so the ledger tracks which
//! vehicles are on the route and where they have been.

mod config;
mod lifecycle;
mod provider;
mod records;
mod repository;

pub mod cycle;
pub mod reconcile;
pub mod schema;
pub mod staleness;

pub use self::config::*;
pub use self::lifecycle::*;
pub use self::provider::Provider;
pub use self::records::*;
pub use self::repository::*;
