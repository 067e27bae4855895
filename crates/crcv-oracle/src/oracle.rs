use async_trait::async_trait;

use crate::error::OracleError;

/// An independent implementation of the encoding, consulted one value at a
/// time.
///
/// The harness only ever sees this trait, so a live ClickHouse server, a
/// recorded fixture and a local strategy are interchangeable:
///
/// ```text
///            ┌──────────────────────┐
///            │ DifferentialHarness  │
///            └──────────┬───────────┘
///                       │ query(value)
///            ┌──────────▼───────────┐
///            │     dyn Oracle       │
///            └──────────┬───────────┘
///        ┌──────────────┼─────────────────┐
///  ClickHouseOracle  FixtureOracle   StrategyOracle
/// ```
///
/// Construction (connecting, probing) is backend-specific and happens
/// before a value reaches the trait.
#[async_trait]
pub trait Oracle: Send {
    /// Backend label for logs and reports.
    fn name(&self) -> &str;

    /// Define whatever the backend needs on the remote side before the
    /// first query. Must be safe to call against an oracle that already
    /// has it.
    ///
    /// # Errors
    ///
    /// [`OracleError::Install`] if the definition failed, or
    /// [`OracleError::Connection`] if the client is closed.
    async fn install_encoder(&mut self) -> Result<(), OracleError> {
        Ok(())
    }

    /// Evaluate the encoding of `value` and return the oracle's text.
    ///
    /// Each call is independent. A failure is tied to `value` and leaves
    /// the client able to serve the next call.
    ///
    /// # Errors
    ///
    /// [`OracleError::Query`] for a failed evaluation, or
    /// [`OracleError::Connection`] once the client is closed.
    async fn query(&mut self, value: u32) -> Result<String, OracleError>;

    /// Release the connection. Idempotent.
    async fn close(&mut self);
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn install_encoder(&mut self) -> Result<(), OracleError> {
        (**self).install_encoder().await
    }

    async fn query(&mut self, value: u32) -> Result<String, OracleError> {
        (**self).query(value).await
    }

    async fn close(&mut self) {
        (**self).close().await;
    }
}
