use std::borrow::Cow;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use anyhow::bail;
use bus_location::FeedConfig;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Trips older than this are closed whether or not the vehicle is live.
pub const DEFAULT_STALE_AFTER_MINUTES: i64 = 180;

/// Upper bound on one cycle, fetch through commit.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Table names for the trip ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    /// One row per trip.
    pub parent: Cow<'static, str>,

    /// One row per stop visit, keyed under its trip.
    pub child: Cow<'static, str>,
}

impl Default for Tables {
    fn default() -> Self {
        Self { parent: Cow::Borrowed("bus_initial_entry"), child: Cow::Borrowed("bus_stop_record") }
    }
}

/// How the writes of one cycle reach the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// All writes of a cycle commit together or not at all.
    #[default]
    Transactional,

    /// Each write commits on its own. A failed store write is logged and
    /// skipped while the rest of the cycle proceeds.
    Independent,
}

impl Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transactional => write!(f, "transactional"),
            Self::Independent => write!(f, "independent"),
        }
    }
}

impl FromStr for WriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transactional" => Ok(Self::Transactional),
            "independent" => Ok(Self::Independent),
            other => bail!("unknown write mode {other:?}, expected transactional or independent"),
        }
    }
}

/// Cycle configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub feed: FeedConfig,
    pub tables: Tables,
    pub stale_after: TimeDelta,
    pub write_mode: WriteMode,
    pub deadline: Duration,
}

impl Config {
    #[must_use]
    pub fn new(feed: FeedConfig) -> Self {
        Self {
            feed,
            tables: Tables::default(),
            stale_after: TimeDelta::minutes(DEFAULT_STALE_AFTER_MINUTES),
            write_mode: WriteMode::default(),
            deadline: DEFAULT_DEADLINE,
        }
    }
}
