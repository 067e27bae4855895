use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Boundary values every run checks first.
///
/// Zero, the 7-bit edges (127/128), the first 3-byte value (2^14), a few
/// real CRCs of log lines, the largest 31-bit value and `u32::MAX`.
pub const SEED_VALUES: [u32; 10] = [
    0,
    1,
    127,
    128,
    16384,
    179_340_738,
    3_632_233_996,
    1_668_494_043,
    2_147_483_647,
    4_294_967_295,
];

/// Where a candidate came from, so a failure can be traced back to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Position in the seed list.
    Seed { index: usize },
    /// Draw number in the random tail (0-based).
    Random { iteration: u64 },
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seed { index } => write!(f, "seed #{index}"),
            Self::Random { iteration } => write!(f, "random #{iteration}"),
        }
    }
}

/// One value to compare, with its position in the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// 0-based index over the whole run: seeds first, then random draws.
    pub sequence: u64,
    pub value: u32,
    pub origin: Origin,
}

/// The ordered value sequence of a run: every seed, then
/// `random_iterations` draws from a `ChaCha8Rng` seeded with `rng_seed`.
///
/// Two corpora built from the same arguments yield the same sequence on
/// every platform.
#[derive(Clone, Debug)]
pub struct Corpus {
    seeds: Vec<u32>,
    next_seed: usize,
    rng: ChaCha8Rng,
    random_iterations: u64,
    next_iteration: u64,
    sequence: u64,
}

impl Corpus {
    #[must_use]
    pub fn new(seeds: &[u32], random_iterations: u64, rng_seed: u64) -> Self {
        Self {
            seeds: seeds.to_vec(),
            next_seed: 0,
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
            random_iterations,
            next_iteration: 0,
            sequence: 0,
        }
    }

    /// Total number of candidates the corpus yields.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.seeds.len() as u64 + self.random_iterations
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for Corpus {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let (value, origin) = if let Some(&value) = self.seeds.get(self.next_seed) {
            let origin = Origin::Seed {
                index: self.next_seed,
            };
            self.next_seed += 1;
            (value, origin)
        } else if self.next_iteration < self.random_iterations {
            let origin = Origin::Random {
                iteration: self.next_iteration,
            };
            self.next_iteration += 1;
            (self.rng.next_u32(), origin)
        } else {
            return None;
        };

        let candidate = Candidate {
            sequence: self.sequence,
            value,
            origin,
        };
        self.sequence += 1;
        Some(candidate)
    }
}
