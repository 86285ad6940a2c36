//! Workload key generation.
//!
//! Threads share one [`KeySpace`] and draw per-thread generators from it.
//! Sequential insert keys are claimed in batches so inserters rarely touch
//! the shared cursor; read keys are uniform over the keys generated so far
//! (or over the fixed bound when one is configured).

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use karix_common::{KarixError, Key, KeyDistribution, Result, WorkloadConfig};

/// Sequential keys handed to one thread at a time.
const BATCH_KEY_COUNT: u64 = 1 << 10;

/// Shared generator state.
pub struct KeySpace {
    /// Next unclaimed sequential key.
    cursor: AtomicU64,
    /// Zero means unbounded.
    max_key: u64,
    distribution: KeyDistribution,
    lognormal: Option<LogNormal<f64>>,
}

impl KeySpace {
    pub fn new(config: &WorkloadConfig) -> Result<Arc<Self>> {
        let lognormal = match config.distribution {
            KeyDistribution::Lognormal => Some(
                LogNormal::new(0.0, config.lognormal_sigma).map_err(|_| {
                    KarixError::InvalidParameter {
                        name: "lognormal_sigma".to_string(),
                        value: config.lognormal_sigma.to_string(),
                    }
                })?,
            ),
            _ => None,
        };
        Ok(Arc::new(Self {
            cursor: AtomicU64::new(0),
            max_key: config.max_key_count,
            distribution: config.distribution,
            lognormal,
        }))
    }

    /// Creates the per-thread generator. Seeding by thread id keeps runs
    /// reproducible for a fixed thread layout.
    pub fn generator(self: &Arc<Self>, thread_id: u64) -> KeyGenerator {
        KeyGenerator {
            space: self.clone(),
            rng: SmallRng::seed_from_u64(thread_id),
            batch_next: 0,
            batch_end: 0,
        }
    }

    /// Current exclusive upper bound of the generated key space.
    fn upper_bound(&self) -> u64 {
        if self.max_key != 0 {
            self.max_key
        } else {
            self.cursor.load(Ordering::Relaxed)
        }
    }
}

/// Per-thread key generator.
pub struct KeyGenerator {
    space: Arc<KeySpace>,
    rng: SmallRng,
    batch_next: u64,
    batch_end: u64,
}

impl KeyGenerator {
    /// Next key to insert.
    pub fn insert_key(&mut self) -> Key {
        match self.space.distribution {
            KeyDistribution::Sequential => {
                if self.space.max_key != 0 {
                    return self.rng.gen_range(0..self.space.max_key);
                }
                if self.batch_next == self.batch_end {
                    let start = self.space.cursor.fetch_add(BATCH_KEY_COUNT, Ordering::Relaxed);
                    self.batch_next = start;
                    self.batch_end = start + BATCH_KEY_COUNT;
                }
                let key = self.batch_next;
                self.batch_next += 1;
                key
            }
            KeyDistribution::Uniform => {
                let bound = self.space.upper_bound().max(1);
                self.record_sequential_progress();
                self.rng.gen_range(0..bound)
            }
            KeyDistribution::Lognormal => {
                let sample = match &self.space.lognormal {
                    Some(dist) => dist.sample(&mut self.rng),
                    None => 1.0,
                };
                self.record_sequential_progress();
                let bound = self.space.upper_bound().max(1);
                ((sample * bound as f64 / 10.0) as Key).min(bound - 1)
            }
        }
    }

    /// Key to look up; uniform over the visible key space.
    pub fn read_key(&mut self) -> Key {
        let bound = self.space.upper_bound().max(1);
        self.rng.gen_range(0..bound)
    }

    /// Random distributions still advance the shared cursor so an
    /// unbounded run keeps a growing read space.
    fn record_sequential_progress(&mut self) {
        if self.space.max_key == 0 {
            self.space.cursor.fetch_add(1, Ordering::Relaxed);
        }
    }
}
