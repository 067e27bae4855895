//! Shrinking divergent values to a small reproducing set.
//!
//! A random draw that trips the oracle is rarely the simplest value that
//! does. The shrinker clears set bits greedily, highest first, keeping a
//! clear whenever the oracle still disagrees with the reference, and
//! starts over from the top after every kept clear. The walk is a pure
//! function of the oracle's answers, so a stable oracle always shrinks a
//! value to the same result.

use crcv_oracle::{Oracle, OracleError};
use tracing::debug;

use crate::comparison::{ComparisonResult, Divergence};
use crate::config::HarnessConfig;
use crate::corpus::Origin;
use crate::error::HarnessError;

/// Result of shrinking one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shrunk {
    pub original: u32,
    /// Smallest value found that still diverges. Equal to `original`
    /// when no bit could be cleared.
    pub minimal: u32,
    /// Oracle queries spent.
    pub probes: usize,
}

/// Shrink `value`, which is known to diverge, spending at most
/// `max_probes` oracle queries.
///
/// A failed query counts as "does not reproduce".
///
/// # Errors
///
/// Propagates fatal oracle errors (closed connection, failed install).
pub async fn shrink<O: Oracle + ?Sized>(
    oracle: &mut O,
    value: u32,
    max_probes: usize,
) -> Result<Shrunk, OracleError> {
    let mut current = value;
    let mut probes = 0;

    'restart: while probes < max_probes {
        for bit in (0..u32::BITS).rev() {
            let mask = 1u32 << bit;
            if current & mask == 0 {
                continue;
            }
            if probes == max_probes {
                break 'restart;
            }
            let candidate = current & !mask;
            probes += 1;
            if reproduces(oracle, candidate).await? {
                debug!(from = current, to = candidate, "shrink step kept");
                current = candidate;
                continue 'restart;
            }
        }
        break;
    }

    Ok(Shrunk {
        original: value,
        minimal: current,
        probes,
    })
}

async fn reproduces<O: Oracle + ?Sized>(oracle: &mut O, value: u32) -> Result<bool, OracleError> {
    match oracle.query(value).await {
        Ok(text) => Ok(!ComparisonResult::compare(value, text).matched),
        Err(e) if e.is_fatal() => Err(e),
        Err(_) => Ok(false),
    }
}

/// The values to hand back for reproducing `divergences`.
///
/// Seed-origin values are kept verbatim. Random-origin values are shrunk
/// when `config.minimize` is set. The caller sorts and de-duplicates.
pub(crate) async fn reproducing_seeds<O: Oracle + ?Sized>(
    oracle: &mut O,
    divergences: &[Divergence],
    config: &HarnessConfig,
    worker: usize,
) -> Result<Vec<u32>, HarnessError> {
    let mut seeds = Vec::with_capacity(divergences.len());
    for divergence in divergences {
        let value = match divergence.origin {
            Origin::Random { .. } if config.minimize => {
                let shrunk = shrink(oracle, divergence.value, config.max_shrink_probes)
                    .await
                    .map_err(|source| HarnessError::Fatal {
                        value: divergence.value,
                        worker,
                        source,
                    })?;
                debug!(
                    original = shrunk.original,
                    minimal = shrunk.minimal,
                    probes = shrunk.probes,
                    "shrunk divergent value"
                );
                shrunk.minimal
            }
            _ => divergence.value,
        };
        seeds.push(value);
    }
    Ok(seeds)
}
