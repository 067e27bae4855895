use async_trait::async_trait;
use crcv_codec::EncodingStrategy;

use crate::error::{ConnectionError, OracleError};
use crate::oracle::Oracle;

/// Oracle that evaluates one of the historical encoding strategies
/// in-process.
///
/// Stands in for a remote variant when checking that the harness notices
/// a broken continuation rule, without needing a server.
#[derive(Debug)]
pub struct StrategyOracle {
    strategy: EncodingStrategy,
    queries: u64,
    closed: bool,
}

impl StrategyOracle {
    #[must_use]
    pub fn new(strategy: EncodingStrategy) -> Self {
        Self {
            strategy,
            queries: 0,
            closed: false,
        }
    }

    #[must_use]
    pub fn strategy(&self) -> EncodingStrategy {
        self.strategy
    }

    /// Number of successful queries answered so far.
    #[must_use]
    pub fn queries(&self) -> u64 {
        self.queries
    }
}

#[async_trait]
impl Oracle for StrategyOracle {
    fn name(&self) -> &str {
        self.strategy.name()
    }

    async fn query(&mut self, value: u32) -> Result<String, OracleError> {
        if self.closed {
            return Err(ConnectionError::Closed.into());
        }
        self.queries += 1;
        Ok(self.strategy.encode_text(value))
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}
