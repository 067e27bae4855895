use std::time::Duration;

/// The oracle could not be reached, or stopped being usable.
///
/// Fatal to a harness run: no comparison means anything without the
/// oracle. `connect` never hands out a client after one of these.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("invalid oracle endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("oracle at {endpoint} is unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered the probe with an error, typically bad credentials
    /// or an unknown database.
    #[error("oracle at {endpoint} rejected the liveness probe (HTTP {status}): {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("liveness probe to {endpoint} timed out after {timeout:?}")]
    ProbeTimeout { endpoint: String, timeout: Duration },

    #[error("unexpected liveness probe answer from {endpoint}: {body:?}")]
    UnexpectedProbe { endpoint: String, body: String },

    #[error("oracle connection is closed")]
    Closed,
}

/// Defining the remote encoding routine failed.
///
/// A routine that is already present is not reported through this type;
/// installation treats that case as done.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("oracle refused to define the encoding function (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("transport failure while defining the encoding function: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("defining the encoding function timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// One value's remote evaluation failed.
///
/// Always attributable to a single value and never a pass. The client
/// stays usable for the next value.
///
/// ```text
///   QueryError
///   ├── Timeout     ← no complete answer within the per-query timeout
///   ├── Transport   ← connection dropped or refused (after retries)
///   ├── Remote      ← server-side exception or non-2xx status
///   ├── Empty       ← success status but no row
///   ├── Malformed   ← more than one line/column, or not UTF-8
///   └── Unrecorded  ← fixture backend has no answer for the value
/// ```
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query for {value} timed out after {timeout:?}")]
    Timeout { value: u32, timeout: Duration },

    #[error("transport failure while querying {value}: {source}")]
    Transport {
        value: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("oracle failed to evaluate {value} (HTTP {status}, code {code:?}): {message}")]
    Remote {
        value: u32,
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("oracle returned no result for {value}")]
    Empty { value: u32 },

    #[error("oracle returned a malformed result for {value}: {body:?}")]
    Malformed { value: u32, body: String },

    #[error("no recorded oracle answer for {value}")]
    Unrecorded { value: u32 },
}

impl QueryError {
    /// The value whose evaluation failed.
    #[must_use]
    pub fn value(&self) -> u32 {
        match self {
            Self::Timeout { value, .. }
            | Self::Transport { value, .. }
            | Self::Remote { value, .. }
            | Self::Empty { value }
            | Self::Malformed { value, .. }
            | Self::Unrecorded { value } => *value,
        }
    }
}

/// Everything an [`Oracle`](crate::Oracle) call can fail with.
///
/// ```text
///   OracleError
///   ├── Connection(ConnectionError)   ← fatal
///   ├── Install(InstallError)         ← fatal
///   └── Query(QueryError)             ← recoverable, one value
/// ```
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl OracleError {
    /// `true` when the run cannot continue past this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Query(_))
    }
}

/// Reading or writing a recorded fixture failed.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid fixture document: {0}")]
    Json(#[from] serde_json::Error),
}
