use crate::corpus::SEED_VALUES;

/// Configuration for a differential run.
///
/// ```text
/// ┌───────────────────┬──────────────┬───────────────────────────────────────┐
/// │ Field             │ Default      │ Purpose                               │
/// ├───────────────────┼──────────────┼───────────────────────────────────────┤
/// │ seed_values       │ SEED_VALUES  │ fixed boundary corpus, run first      │
/// │ random_iterations │ 1000         │ uniformly drawn values after seeds    │
/// │ rng_seed          │ 0            │ makes the random tail reproducible    │
/// │ failure_mode      │ CollectAll   │ stop at first divergence or keep on   │
/// │ minimize          │ true         │ shrink random divergences             │
/// │ max_shrink_probes │ 256          │ oracle queries allowed per shrink     │
/// └───────────────────┴──────────────┴───────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub seed_values: Vec<u32>,
    pub random_iterations: u64,
    pub rng_seed: u64,
    pub failure_mode: FailureMode,
    pub minimize: bool,
    pub max_shrink_probes: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed_values: SEED_VALUES.to_vec(),
            random_iterations: 1000,
            rng_seed: 0,
            failure_mode: FailureMode::CollectAll,
            minimize: true,
            max_shrink_probes: 256,
        }
    }
}

/// What the harness does after a divergence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// End the run at the first divergence.
    StopOnFirst,
    /// Keep comparing and report every divergence. Gives the minimizer
    /// more to work with.
    #[default]
    CollectAll,
}
