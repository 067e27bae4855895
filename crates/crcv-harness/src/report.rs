use std::fmt;

use crate::comparison::{Divergence, Inconclusive, Outcome};

/// Overall result of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every comparison matched.
    Pass,
    /// At least one divergence.
    Fail,
    /// No divergence, but some values could not be checked.
    Inconclusive,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Inconclusive => "INCONCLUSIVE",
        })
    }
}

/// Terminal report of a differential run.
///
/// `divergences` and `inconclusive` are ordered by sequence number, so
/// the first entry is the first failure the run hit. `reproducing_seeds`
/// is the sorted, de-duplicated set of values that reproduce every
/// divergence, with random draws shrunk where the minimizer could.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct HarnessReport {
    pub oracle: String,
    pub rng_seed: u64,
    pub comparisons: u64,
    pub passed: u64,
    pub divergences: Vec<Divergence>,
    pub inconclusive: Vec<Inconclusive>,
    pub reproducing_seeds: Vec<u32>,
    /// `true` when `StopOnFirst` cut the run short.
    pub stopped_early: bool,
}

impl HarnessReport {
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if !self.divergences.is_empty() {
            Verdict::Fail
        } else if !self.inconclusive.is_empty() {
            Verdict::Inconclusive
        } else {
            Verdict::Pass
        }
    }

    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.verdict() == Verdict::Pass
    }

    /// The first divergence in run order, if any.
    #[must_use]
    pub fn first_divergence(&self) -> Option<&Divergence> {
        self.divergences.first()
    }
}

impl fmt::Display for HarnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} comparisons against {} (rng seed {}): {} passed, {} divergent, {} inconclusive{}",
            self.verdict(),
            self.comparisons,
            self.oracle,
            self.rng_seed,
            self.passed,
            self.divergences.len(),
            self.inconclusive.len(),
            if self.stopped_early { ", stopped at first divergence" } else { "" }
        )?;
        for divergence in &self.divergences {
            writeln!(f, "  divergence: {divergence}")?;
        }
        for inconclusive in &self.inconclusive {
            writeln!(f, "  inconclusive: {inconclusive}")?;
        }
        if !self.reproducing_seeds.is_empty() {
            let seeds: Vec<String> = self.reproducing_seeds.iter().map(u32::to_string).collect();
            writeln!(f, "  reproduce with: {}", seeds.join(" "))?;
        }
        Ok(())
    }
}

/// Folds outcomes, in sequence order, into a report.
pub(crate) struct ReportBuilder {
    report: HarnessReport,
}

impl ReportBuilder {
    pub(crate) fn new(oracle: &str, rng_seed: u64) -> Self {
        Self {
            report: HarnessReport {
                oracle: oracle.to_string(),
                rng_seed,
                comparisons: 0,
                passed: 0,
                divergences: Vec::new(),
                inconclusive: Vec::new(),
                reproducing_seeds: Vec::new(),
                stopped_early: false,
            },
        }
    }

    /// Record one outcome. Returns `true` if it was a divergence.
    pub(crate) fn record(&mut self, outcome: Outcome) -> bool {
        self.report.comparisons += 1;
        match outcome {
            Outcome::Match { .. } => {
                self.report.passed += 1;
                false
            }
            Outcome::Divergence(divergence) => {
                self.report.divergences.push(divergence);
                true
            }
            Outcome::Inconclusive(inconclusive) => {
                self.report.inconclusive.push(inconclusive);
                false
            }
        }
    }

    pub(crate) fn stopped_early(&mut self) {
        self.report.stopped_early = true;
    }

    pub(crate) fn divergences(&self) -> &[Divergence] {
        &self.report.divergences
    }

    pub(crate) fn finish(mut self, mut reproducing_seeds: Vec<u32>) -> HarnessReport {
        reproducing_seeds.sort_unstable();
        reproducing_seeds.dedup();
        self.report.reproducing_seeds = reproducing_seeds;
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::ComparisonResult;
    use crate::corpus::{Candidate, Origin};

    fn divergence(sequence: u64, value: u32, oracle: &str) -> Outcome {
        let candidate = Candidate {
            sequence,
            value,
            origin: Origin::Seed {
                index: usize::try_from(sequence).unwrap(),
            },
        };
        Outcome::Divergence(Divergence::new(
            candidate,
            0,
            ComparisonResult::compare(value, oracle.to_string()),
        ))
    }

    #[test]
    fn empty_run_passes() {
        let report = ReportBuilder::new("fixture", 0).finish(Vec::new());
        assert_eq!(report.verdict(), Verdict::Pass);
        assert!(report.is_pass());
    }

    #[test]
    fn any_divergence_fails() {
        let mut builder = ReportBuilder::new("fixture", 0);
        assert!(!builder.record(Outcome::Match { sequence: 0 }));
        assert!(builder.record(divergence(1, 128, "AA")));
        let report = builder.finish(vec![128]);
        assert_eq!(report.verdict(), Verdict::Fail);
        assert_eq!(report.comparisons, 2);
        assert_eq!(report.passed, 1);
        assert_eq!(report.first_divergence().map(|d| d.value), Some(128));
    }

    #[test]
    fn failed_queries_are_not_a_pass() {
        let mut builder = ReportBuilder::new("fixture", 0);
        builder.record(Outcome::Match { sequence: 0 });
        builder.record(Outcome::Inconclusive(Inconclusive {
            sequence: 1,
            worker: 0,
            origin: Origin::Seed { index: 1 },
            value: 1,
            error: "query for 1 timed out after 10ms".to_string(),
        }));
        let report = builder.finish(Vec::new());
        assert_eq!(report.verdict(), Verdict::Inconclusive);
        assert!(!report.is_pass());
    }

    #[test]
    fn reproducing_seeds_sorted_and_unique() {
        let report = ReportBuilder::new("fixture", 0).finish(vec![16384, 128, 16384, 0]);
        assert_eq!(report.reproducing_seeds, vec![0, 128, 16384]);
    }

    #[test]
    fn serializes_for_machine_output() {
        let mut builder = ReportBuilder::new("fixture", 3);
        builder.record(divergence(0, 128, "AA"));
        let json = serde_json::to_value(builder.finish(vec![128])).unwrap();
        assert_eq!(json["oracle"], "fixture");
        assert_eq!(json["reproducing_seeds"], serde_json::json!([128]));
        assert_eq!(json["divergences"][0]["origin"]["kind"], "seed");
        assert_eq!(json["divergences"][0]["oracle_hex"], "00");
        assert_eq!(serde_json::to_value(Verdict::Fail).unwrap(), "fail");
    }

    #[test]
    fn display_names_value_and_both_strings() {
        let mut builder = ReportBuilder::new("positional-length", 7);
        builder.record(Outcome::Match { sequence: 0 });
        builder.record(divergence(1, 128, "AA"));
        let rendered = builder.finish(vec![128]).to_string();
        assert_eq!(
            rendered,
            "FAIL: 2 comparisons against positional-length (rng seed 7): 1 passed, 1 divergent, 0 inconclusive\n\
             \x20 divergence: value 128 (seed #1, worker 0): reference \"gAE\" [8001] != oracle \"AA\" [00] decoding to 0\n\
             \x20 reproduce with: 128\n"
        );
    }
}
