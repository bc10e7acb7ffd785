//! Random workload generation.
//!
//! Produces the key/value record for each logical unit of work and the
//! repeat count for each worker. Keys and values are drawn character by
//! character from a fixed alphabet with no collision avoidance; two records
//! sharing a key is rare and tolerated.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Record;

/// Alphabet every key and value character is drawn from
pub const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of generated keys
pub const KEY_LEN: usize = 10;

/// Length of generated values
pub const VALUE_LEN: usize = 20;

/// Source of random records and repeat counts for one run.
///
/// Seed it once per run. [`from_entropy`](Self::from_entropy) gives a fresh
/// workload every time; [`from_seed`](Self::from_seed) replays the same one.
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    rng: StdRng,
}

impl WorkloadGenerator {
    /// Seeds from the operating system's entropy source.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeds deterministically.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A random string of `len` characters from [`LETTERS`].
    pub fn random_string(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| LETTERS[self.rng.gen_range(0..LETTERS.len())] as char)
            .collect()
    }

    /// A fresh record with a [`KEY_LEN`] key and a [`VALUE_LEN`] value.
    pub fn next_record(&mut self) -> Record {
        let key = self.random_string(KEY_LEN);
        let value = self.random_string(VALUE_LEN);
        Record::new(key, value)
    }

    /// Uniform repeat count in `[1, max_repeats]`. Zero is treated as one.
    pub fn next_repeat_count(&mut self, max_repeats: usize) -> usize {
        self.rng.gen_range(1..=max_repeats.max(1))
    }
}
