use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crcv_oracle::{Oracle, OracleError};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::comparison::Outcome;
use crate::config::{FailureMode, HarnessConfig};
use crate::corpus::{Corpus, Origin};
use crate::error::HarnessError;
use crate::harness::compare_one;
use crate::minimize::reproducing_seeds;
use crate::report::{HarnessReport, ReportBuilder};

/// Run the configured corpus over `workers` concurrent oracles.
///
/// `factory(worker)` opens the oracle a worker owns for the whole run; no
/// connection is shared. Candidate `n` goes to worker `n % workers`, and
/// the outcomes are merged back in sequence order before the report is
/// built, so for a stable oracle the report matches a sequential run
/// apart from the worker ids on divergences.
///
/// Under [`FailureMode::StopOnFirst`] workers stop picking up values past
/// the earliest divergence seen so far, and the merged outcomes are cut
/// right after the first one.
///
/// Random-origin divergences are shrunk on one more oracle from the
/// factory, opened only when there is something to shrink.
///
/// # Errors
///
/// [`HarnessError::Setup`] if an oracle cannot be opened or prepared,
/// [`HarnessError::Fatal`] if one loses its connection, and
/// [`HarnessError::Worker`] if a worker task panics.
pub async fn run_parallel<F, Fut, O>(
    factory: F,
    config: &HarnessConfig,
    workers: usize,
) -> Result<HarnessReport, HarnessError>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<O, OracleError>>,
    O: Oracle + 'static,
{
    let workers = workers.max(1);
    let mut oracles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let oracle = factory(worker)
            .await
            .map_err(|source| HarnessError::Setup { worker, source })?;
        oracles.push(oracle);
    }
    let name = oracles
        .first()
        .map(|oracle| oracle.name().to_string())
        .unwrap_or_default();

    info!(
        oracle = %name,
        workers,
        comparisons = config.seed_values.len() as u64 + config.random_iterations,
        rng_seed = config.rng_seed,
        "starting parallel differential run"
    );

    let stop_at = Arc::new(AtomicU64::new(u64::MAX));
    let mut tasks = JoinSet::new();
    for (worker, oracle) in oracles.into_iter().enumerate() {
        let shard = Shard {
            worker,
            workers: workers as u64,
            seeds: config.seed_values.clone(),
            random_iterations: config.random_iterations,
            rng_seed: config.rng_seed,
            stop_on_first: config.failure_mode == FailureMode::StopOnFirst,
            stop_at: Arc::clone(&stop_at),
        };
        tasks.spawn(shard.run(oracle));
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let shard_outcomes = joined.map_err(|e| HarnessError::Worker(e.to_string()))??;
        outcomes.extend(shard_outcomes);
    }
    outcomes.sort_by_key(Outcome::sequence);

    let mut builder = ReportBuilder::new(&name, config.rng_seed);
    for outcome in outcomes {
        if builder.record(outcome) && config.failure_mode == FailureMode::StopOnFirst {
            builder.stopped_early();
            break;
        }
    }

    let needs_shrinking = config.minimize
        && builder
            .divergences()
            .iter()
            .any(|d| matches!(d.origin, Origin::Random { .. }));
    let seeds = if needs_shrinking {
        let mut oracle = factory(workers)
            .await
            .map_err(|source| HarnessError::Setup { worker: workers, source })?;
        oracle
            .install_encoder()
            .await
            .map_err(|source| HarnessError::Setup { worker: workers, source })?;
        let seeds = reproducing_seeds(&mut oracle, builder.divergences(), config, workers).await;
        oracle.close().await;
        seeds?
    } else {
        builder.divergences().iter().map(|d| d.value).collect()
    };
    let report = builder.finish(seeds);

    info!(
        verdict = %report.verdict(),
        comparisons = report.comparisons,
        divergences = report.divergences.len(),
        inconclusive = report.inconclusive.len(),
        "parallel differential run finished"
    );
    Ok(report)
}

/// One worker's slice of the corpus.
struct Shard {
    worker: usize,
    workers: u64,
    seeds: Vec<u32>,
    random_iterations: u64,
    rng_seed: u64,
    stop_on_first: bool,
    /// Lowest divergent sequence number seen by any worker.
    stop_at: Arc<AtomicU64>,
}

impl Shard {
    async fn run<O: Oracle>(self, mut oracle: O) -> Result<Vec<Outcome>, HarnessError> {
        let result = self.compare_all(&mut oracle).await;
        oracle.close().await;
        result
    }

    async fn compare_all<O: Oracle>(&self, oracle: &mut O) -> Result<Vec<Outcome>, HarnessError> {
        oracle
            .install_encoder()
            .await
            .map_err(|source| HarnessError::Setup {
                worker: self.worker,
                source,
            })?;

        // Every worker walks the full corpus so the random draws line up.
        let corpus = Corpus::new(&self.seeds, self.random_iterations, self.rng_seed);
        let mut outcomes = Vec::new();
        for candidate in corpus.filter(|c| c.sequence % self.workers == self.worker as u64) {
            if self.stop_on_first && candidate.sequence > self.stop_at.load(Ordering::Acquire) {
                debug!(worker = self.worker, "earlier divergence found, worker stopping");
                break;
            }
            let outcome = compare_one(oracle, candidate, self.worker).await?;
            if matches!(outcome, Outcome::Divergence(_)) {
                self.stop_at.fetch_min(candidate.sequence, Ordering::AcqRel);
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
