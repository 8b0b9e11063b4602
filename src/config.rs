use std::env;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use bus_location::FeedConfig;
use chrono::TimeDelta;
use trip_ledger::{Config, DEFAULT_STALE_AFTER_MINUTES, WriteMode};

/// Process settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ledger: Config,
    pub database: DatabaseConfig,

    /// Create the ledger tables when missing.
    pub bootstrap: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Duration,
}

impl Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl DatabaseConfig {
    /// Connection parameters for the store.
    #[must_use]
    pub fn to_pg(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .connect_timeout(self.connect_timeout)
            .application_name("bus-trips");
        if let Some(name) = &self.name {
            config.dbname(name);
        }
        if let Some(user) = &self.user {
            config.user(user);
        }
        if let Some(password) = &self.password {
            config.password(password);
        }
        config
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns a variable's value when
    /// it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| lookup(key).map(|value| value.trim().to_string());
        let required = |key: &str| {
            lookup(key).filter(|value| !value.is_empty()).ok_or_else(|| anyhow!("{key} is not set"))
        };

        let mut feed = FeedConfig::new(required("SERVICE_KEY_BUS_API")?, required("BUS_ROUTE_ID")?);
        if let Some(base_url) = lookup("FEED_BASE_URL") {
            feed.base_url = base_url.into();
        }
        if let Some(zone_label) = lookup("FEED_TIMEZONE") {
            feed.zone_label = zone_label.into();
        }

        let mut ledger = Config::new(feed);
        if let Some(parent) = lookup("DB_TABLE_PARENT") {
            ledger.tables.parent = parent.into();
        }
        if let Some(child) = lookup("DB_TABLE_CHILD") {
            ledger.tables.child = child.into();
        }
        if ledger.tables.parent == ledger.tables.child {
            bail!("DB_TABLE_PARENT and DB_TABLE_CHILD must differ");
        }

        let stale_after = parsed(&lookup, "STALE_AFTER_MINUTES", DEFAULT_STALE_AFTER_MINUTES)?;
        if stale_after <= 0 {
            bail!("STALE_AFTER_MINUTES must be positive, got {stale_after}");
        }
        ledger.stale_after = TimeDelta::minutes(stale_after);
        ledger.write_mode = parsed(&lookup, "WRITE_MODE", WriteMode::default())?;

        let deadline = parsed(&lookup, "CYCLE_DEADLINE_SECS", ledger.deadline.as_secs())?;
        if deadline == 0 {
            bail!("CYCLE_DEADLINE_SECS must be positive");
        }
        ledger.deadline = Duration::from_secs(deadline);

        let database = DatabaseConfig {
            host: required("DB_HOST")?,
            port: parsed(&lookup, "DB_PORT", 5432)?,
            name: lookup("DB_NAME"),
            user: lookup("DB_USER"),
            password: lookup("DB_PASSWORD"),
            connect_timeout: ledger.deadline,
        };

        Ok(Self { ledger, database, bootstrap: parsed(&lookup, "DB_BOOTSTRAP", false)? })
    }
}

fn parsed<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|err| anyhow!("{err}"))
            .with_context(|| format!("invalid {key}: {value:?}")),
        _ => Ok(default),
    }
}
