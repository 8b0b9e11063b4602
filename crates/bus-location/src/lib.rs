//! # Bus Location Feed
//!
//! Fetches the live bus location list for a route and normalizes it into a
//! [`Snapshot`] of typed vehicle records sharing one observation instant.

mod config;
mod feed;
mod handler;
mod snapshot;

pub mod local_time;

pub use self::config::*;
pub use self::feed::*;
pub use self::handler::fetch_snapshot;
pub use self::snapshot::*;
