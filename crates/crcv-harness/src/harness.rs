use crcv_oracle::Oracle;
use tracing::{debug, info, warn};

use crate::comparison::{ComparisonResult, Divergence, Inconclusive, Outcome};
use crate::config::{FailureMode, HarnessConfig};
use crate::corpus::{Candidate, Corpus};
use crate::error::HarnessError;
use crate::minimize::reproducing_seeds;
use crate::report::{HarnessReport, ReportBuilder};

/// Drives the comparison loop against a single oracle.
///
/// Values are checked one at a time in corpus order: the oracle round
/// trip is the only await point, and nothing carries over between
/// iterations except the report being built.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), crcv_harness::HarnessError> {
/// use crcv_codec::EncodingStrategy;
/// use crcv_harness::{DifferentialHarness, HarnessConfig, SEED_VALUES};
/// use crcv_oracle::StrategyOracle;
///
/// let oracle = StrategyOracle::new(EncodingStrategy::RemainingValue);
/// let mut harness = DifferentialHarness::new(oracle, HarnessConfig::default());
/// let report = harness.run(&SEED_VALUES, 100).await?;
/// assert!(report.is_pass());
/// # Ok(())
/// # }
/// ```
pub struct DifferentialHarness<O> {
    oracle: O,
    config: HarnessConfig,
}

impl<O: Oracle> DifferentialHarness<O> {
    pub fn new(oracle: O, config: HarnessConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run with the seed list and iteration count from the config.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_configured(&mut self) -> Result<HarnessReport, HarnessError> {
        let seeds = self.config.seed_values.clone();
        let iterations = self.config.random_iterations;
        self.run(&seeds, iterations).await
    }

    /// Compare every seed, then `random_iterations` random values, and
    /// report.
    ///
    /// Installs the oracle's encoder first. A divergence or a failed
    /// query is a result, not an error.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Setup`] if the encoder could not be installed, and
    /// [`HarnessError::Fatal`] if the oracle loses its connection
    /// mid-run.
    pub async fn run(
        &mut self,
        seed_values: &[u32],
        random_iterations: u64,
    ) -> Result<HarnessReport, HarnessError> {
        let corpus = Corpus::new(seed_values, random_iterations, self.config.rng_seed);
        info!(
            oracle = self.oracle.name(),
            comparisons = corpus.len(),
            rng_seed = self.config.rng_seed,
            "starting differential run"
        );

        self.oracle
            .install_encoder()
            .await
            .map_err(|source| HarnessError::Setup { worker: 0, source })?;

        let mut builder = ReportBuilder::new(self.oracle.name(), self.config.rng_seed);
        for candidate in corpus {
            let outcome = compare_one(&mut self.oracle, candidate, 0).await?;
            if builder.record(outcome) && self.config.failure_mode == FailureMode::StopOnFirst {
                builder.stopped_early();
                break;
            }
        }

        let seeds = if self.config.minimize {
            reproducing_seeds(&mut self.oracle, builder.divergences(), &self.config, 0).await?
        } else {
            builder.divergences().iter().map(|d| d.value).collect()
        };
        let report = builder.finish(seeds);

        info!(
            verdict = %report.verdict(),
            comparisons = report.comparisons,
            divergences = report.divergences.len(),
            inconclusive = report.inconclusive.len(),
            "differential run finished"
        );
        Ok(report)
    }

    /// Close the oracle connection.
    pub async fn close(&mut self) {
        self.oracle.close().await;
    }

    pub fn into_oracle(self) -> O {
        self.oracle
    }
}

/// Query one candidate and classify the answer.
pub(crate) async fn compare_one<O: Oracle + ?Sized>(
    oracle: &mut O,
    candidate: Candidate,
    worker: usize,
) -> Result<Outcome, HarnessError> {
    match oracle.query(candidate.value).await {
        Ok(text) => {
            let result = ComparisonResult::compare(candidate.value, text);
            if result.matched {
                debug!(value = candidate.value, text = %result.reference, "match");
                Ok(Outcome::Match {
                    sequence: candidate.sequence,
                })
            } else {
                let divergence = Divergence::new(candidate, worker, result);
                warn!(%divergence, "oracle diverges from reference");
                Ok(Outcome::Divergence(divergence))
            }
        }
        Err(source) if source.is_fatal() => Err(HarnessError::Fatal {
            value: candidate.value,
            worker,
            source,
        }),
        Err(e) => {
            warn!(value = candidate.value, worker, error = %e, "value left unchecked");
            Ok(Outcome::Inconclusive(Inconclusive {
                sequence: candidate.sequence,
                worker,
                origin: candidate.origin,
                value: candidate.value,
                error: e.to_string(),
            }))
        }
    }
}
