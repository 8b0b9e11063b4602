//! Bus trips service errors

use quick_xml::DeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the workspace.
pub type Result<T> = anyhow::Result<T, Error>;

/// Domain level error type returned by a reconciliation cycle.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The upstream feed was unreachable or reported a failure.
    #[error("code: fetch_error, description: {0}")]
    Fetch(String),

    /// The feed answered but reports no vehicle operating on the route.
    #[error("code: no_live_data, description: {0}")]
    NoLiveData(String),

    /// The feed payload could not be decoded.
    #[error("code: parse_error, description: {0}")]
    Parse(String),

    /// A store query or write failed.
    #[error("code: repository_error, description: {0}")]
    Repository(String),

    /// A lifecycle operation was invoked with an incomplete trip key.
    #[error("code: validation_error, description: {0}")]
    Validation(String),

    /// A feed timestamp was malformed.
    #[error("code: time_parse_error, description: {0}")]
    TimeParse(String),

    /// The cycle did not finish before its deadline.
    #[error("code: deadline_exceeded, description: {0}")]
    DeadlineExceeded(String),

    /// A non recoverable internal error occurred.
    #[error("code: server_error, description: {0}")]
    ServerError(String),
}

impl Error {
    /// Returns the stable error code associated with the variant.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::Fetch(_) => "fetch_error",
            Self::NoLiveData(_) => "no_live_data",
            Self::Parse(_) => "parse_error",
            Self::Repository(_) => "repository_error",
            Self::Validation(_) => "validation_error",
            Self::TimeParse(_) => "time_parse_error",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// Process completion status reported to the scheduler for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::ServerError(_) => 1,
            Self::Fetch(_) => 2,
            Self::NoLiveData(_) => 3,
            Self::Parse(_) => 4,
            Self::Repository(_) => 5,
            Self::Validation(_) => 6,
            Self::TimeParse(_) => 7,
            Self::DeadlineExceeded(_) => 8,
        }
    }

    /// Whether running the cycle again later may succeed without intervention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Repository(_) | Self::DeadlineExceeded(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(" -> ");

        // if type is Error, return it with the newly added context
        if let Some(inner) = err.downcast_ref::<Self>() {
            tracing::debug!("Error: {err}, caused by: {inner}");

            return match inner {
                Self::Fetch(e) => Self::Fetch(format!("{err}: {e}")),
                Self::NoLiveData(e) => Self::NoLiveData(format!("{err}: {e}")),
                Self::Parse(e) => Self::Parse(format!("{err}: {e}")),
                Self::Repository(e) => Self::Repository(format!("{err}: {e}")),
                Self::Validation(e) => Self::Validation(format!("{err}: {e}")),
                Self::TimeParse(e) => Self::TimeParse(format!("{err}: {e}")),
                Self::DeadlineExceeded(e) => Self::DeadlineExceeded(format!("{err}: {e}")),
                Self::ServerError(_) => Self::ServerError(chain),
            };
        }

        // otherwise, return a server error
        Self::ServerError(chain)
    }
}

impl From<DeError> for Error {
    fn from(err: DeError) -> Self {
        Self::Parse(format!("failed to deserialize message: {err}"))
    }
}

#[macro_export]
macro_rules! repository {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Repository(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::Repository(format!($err))
    };
}

#[macro_export]
macro_rules! validation {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Validation(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::Validation(format!($err))
    };
}
