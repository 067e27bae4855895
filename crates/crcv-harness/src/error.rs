use crcv_oracle::OracleError;

/// Conditions that end a run without a report.
///
/// Divergences and failed queries are not here: they are results, and
/// land in the [`HarnessReport`](crate::HarnessReport).
///
/// ```text
///   HarnessError
///   ├── Fatal    ← connection or install failure while evaluating a value
///   ├── Setup    ← an oracle could not be opened or its encoder installed
///   └── Worker   ← a parallel worker task panicked
/// ```
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("oracle failed fatally at value {value} (worker {worker}): {source}")]
    Fatal {
        value: u32,
        worker: usize,
        #[source]
        source: OracleError,
    },

    #[error("could not open oracle for worker {worker}: {source}")]
    Setup {
        worker: usize,
        #[source]
        source: OracleError,
    },

    #[error("worker task failed: {0}")]
    Worker(String),
}
