#![warn(clippy::pedantic)]

pub mod comparison;
pub mod config;
pub mod corpus;
pub mod error;
pub mod harness;
pub mod minimize;
pub mod parallel;
pub mod report;

pub use comparison::{ComparisonResult, Divergence, Inconclusive};
pub use config::{FailureMode, HarnessConfig};
pub use corpus::{Candidate, Corpus, Origin, SEED_VALUES};
pub use error::HarnessError;
pub use harness::DifferentialHarness;
pub use parallel::run_parallel;
pub use report::{HarnessReport, Verdict};
