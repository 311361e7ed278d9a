//! Reviewer candidate selection.
//!
//! Selection is a pure function over an in-memory candidate list; the only
//! shared state is the random generator, which is guarded by a mutex.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Chooses reviewers out of a candidate pool.
pub trait ReviewerPicker: Send + Sync {
    /// Returns `min(limit, candidates.len())` distinct candidates.
    fn pick_many(&self, candidates: &[String], limit: usize) -> Vec<String>;

    /// Returns a single candidate, or `None` when the pool is empty.
    fn pick_one(&self, candidates: &[String]) -> Option<String> {
        self.pick_many(candidates, 1).into_iter().next()
    }
}

/// Uniform random selection without replacement.
pub struct RandomPicker {
    rng: Mutex<StdRng>,
}

impl RandomPicker {
    /// Picker seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Picker with a reproducible sequence of choices.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewerPicker for RandomPicker {
    fn pick_many(&self, candidates: &[String], limit: usize) -> Vec<String> {
        if limit == 0 || candidates.is_empty() {
            return Vec::new();
        }

        let mut shuffled = candidates.to_vec();
        {
            // A panic while holding the lock cannot leave the rng in a bad state.
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            shuffled.shuffle(&mut *rng);
        }
        shuffled.truncate(limit);
        shuffled
    }
}

/// Deterministic picker for tests: takes the lexically smallest candidates.
#[cfg(test)]
pub struct OrderedPicker;

#[cfg(test)]
impl ReviewerPicker for OrderedPicker {
    fn pick_many(&self, candidates: &[String], limit: usize) -> Vec<String> {
        let mut sorted = candidates.to_vec();
        sorted.sort();
        sorted.truncate(limit);
        sorted
    }
}
