use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ConnectionError, FixtureError, OracleError, QueryError};
use crate::oracle::Oracle;

/// A recorded set of oracle answers.
///
/// Serialized as JSON with the value as the key:
///
/// ```json
/// {
///   "source": "clickhouse",
///   "entries": { "0": "AA", "128": "gAE" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fixture {
    /// Which backend produced the answers.
    pub source: String,
    pub entries: BTreeMap<u32, String>,
}

impl Fixture {
    /// Read a fixture from a JSON file.
    ///
    /// # Errors
    ///
    /// [`FixtureError::Io`] if the file cannot be read,
    /// [`FixtureError::Json`] if it is not a fixture document.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the fixture as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`FixtureError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), FixtureError> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(path, text)?;
        Ok(())
    }
}

/// Oracle that replays a [`Fixture`] instead of talking to a server.
///
/// Lets the comparison run offline and in CI. A value that was never
/// recorded is a [`QueryError::Unrecorded`], never a silent pass.
#[derive(Debug)]
pub struct FixtureOracle {
    fixture: Fixture,
    closed: bool,
}

impl FixtureOracle {
    #[must_use]
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            closed: false,
        }
    }

    /// Load a fixture file and wrap it.
    ///
    /// # Errors
    ///
    /// Any [`FixtureError`] from [`Fixture::load`].
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        Ok(Self::new(Fixture::load(path)?))
    }
}

#[async_trait]
impl Oracle for FixtureOracle {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn query(&mut self, value: u32) -> Result<String, OracleError> {
        if self.closed {
            return Err(ConnectionError::Closed.into());
        }
        self.fixture
            .entries
            .get(&value)
            .cloned()
            .ok_or_else(|| QueryError::Unrecorded { value }.into())
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

/// Wraps another oracle and remembers every answer it gives.
///
/// Failed queries are not recorded, so a fixture built from a flaky run
/// never contains a made-up answer.
pub struct RecordingOracle<O> {
    inner: O,
    recorded: BTreeMap<u32, String>,
}

impl<O: Oracle> RecordingOracle<O> {
    #[must_use]
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            recorded: BTreeMap::new(),
        }
    }

    /// Everything recorded so far, labelled with the inner backend's name.
    #[must_use]
    pub fn fixture(&self) -> Fixture {
        Fixture {
            source: self.inner.name().to_string(),
            entries: self.recorded.clone(),
        }
    }

    /// Unwrap the inner oracle.
    pub fn into_inner(self) -> O {
        self.inner
    }
}

#[async_trait]
impl<O: Oracle> Oracle for RecordingOracle<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn install_encoder(&mut self) -> Result<(), OracleError> {
        self.inner.install_encoder().await
    }

    async fn query(&mut self, value: u32) -> Result<String, OracleError> {
        let text = self.inner.query(value).await?;
        debug!(value, text = %text, "recorded oracle answer");
        self.recorded.insert(value, text.clone());
        Ok(text)
    }

    async fn close(&mut self) {
        self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Fixture {
        Fixture {
            source: "test".to_string(),
            entries: BTreeMap::from([(0, "AA".to_string()), (128, "gAE".to_string())]),
        }
    }

    #[tokio::test]
    async fn replays_recorded_answers() {
        let mut oracle = FixtureOracle::new(fixture());
        assert_eq!(oracle.query(128).await.unwrap(), "gAE");
        assert_eq!(oracle.query(0).await.unwrap(), "AA");
    }

    #[tokio::test]
    async fn unrecorded_value_is_query_error() {
        let mut oracle = FixtureOracle::new(fixture());
        let err = oracle.query(1).await.unwrap_err();
        assert!(matches!(err, OracleError::Query(QueryError::Unrecorded { value: 1 })));
        // Still usable afterwards
        assert!(oracle.query(0).await.is_ok());
    }

    #[tokio::test]
    async fn query_after_close_fails_fast() {
        let mut oracle = FixtureOracle::new(fixture());
        oracle.close().await;
        oracle.close().await;
        let err = oracle.query(0).await.unwrap_err();
        assert!(matches!(err, OracleError::Connection(ConnectionError::Closed)));
    }

    #[test]
    fn json_uses_string_keys() {
        let json = serde_json::to_string(&fixture()).unwrap();
        assert_eq!(json, r#"{"source":"test","entries":{"0":"AA","128":"gAE"}}"#);
        let back: Fixture = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fixture());
    }

    #[tokio::test]
    async fn recording_keeps_only_successful_answers() {
        let mut recorder = RecordingOracle::new(FixtureOracle::new(fixture()));
        recorder.query(128).await.unwrap();
        assert!(recorder.query(7).await.is_err());

        let recorded = recorder.fixture();
        assert_eq!(recorded.source, "fixture");
        assert_eq!(recorded.entries, BTreeMap::from([(128, "gAE".to_string())]));
    }
}
