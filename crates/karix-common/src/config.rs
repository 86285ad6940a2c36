//! Configuration structures for karix.

use crate::error::{KarixError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the static k-ary index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Branching factor of the inner tree. Must be at least 2.
    pub fanout: usize,
    /// Number of inner layers. Zero means pure binary search over the
    /// snapshot.
    pub num_layers: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            fanout: 8,
            num_layers: 3,
        }
    }
}

impl IndexConfig {
    /// Validates the branching factor.
    pub fn validate(&self) -> Result<()> {
        if self.fanout < 2 {
            return Err(KarixError::InvalidFanout { fanout: self.fanout });
        }
        Ok(())
    }

    /// Returns the inner-node array length `fanout^num_layers - 1`.
    ///
    /// Saturates on overflow; the rebuild's `inner < tuples` check then
    /// rejects the configuration.
    pub fn inner_node_count(&self) -> usize {
        (self.fanout as u64)
            .checked_pow(self.num_layers as u32)
            .and_then(|nodes| usize::try_from(nodes).ok())
            .map_or(usize::MAX, |nodes| nodes - 1)
    }
}

/// Key distribution driven by the workload generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDistribution {
    /// Dense sequential keys claimed in per-thread batches.
    #[default]
    Sequential,
    /// Uniform random keys below the current upper bound.
    Uniform,
    /// Lognormal-distributed insert keys, uniform reads.
    Lognormal,
}

impl std::str::FromStr for KeyDistribution {
    type Err = KarixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(KeyDistribution::Sequential),
            "uniform" => Ok(KeyDistribution::Uniform),
            "lognormal" => Ok(KeyDistribution::Lognormal),
            other => Err(KarixError::InvalidParameter {
                name: "distribution".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for KeyDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyDistribution::Sequential => "sequential",
            KeyDistribution::Uniform => "uniform",
            KeyDistribution::Lognormal => "lognormal",
        };
        write!(f, "{}", name)
    }
}

/// Configuration for the mixed insert/read workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Benchmark duration in seconds.
    pub duration_secs: u64,
    /// Profiler sampling interval in milliseconds.
    pub profile_interval_ms: u64,
    /// Tuples loaded before the timed phase starts.
    pub init_key_count: u64,
    /// Upper bound on generated keys. Zero generates an unbounded
    /// sequential key space.
    pub max_key_count: u64,
    /// Number of reader threads.
    pub reader_count: usize,
    /// Number of inserter threads.
    pub inserter_count: usize,
    /// Insert-key distribution.
    pub distribution: KeyDistribution,
    /// Shape parameter for the lognormal distribution.
    pub lognormal_sigma: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            duration_secs: 10,
            profile_interval_ms: 500,
            init_key_count: 1 << 20,
            max_key_count: 0,
            reader_count: 1,
            inserter_count: 0,
            distribution: KeyDistribution::Sequential,
            lognormal_sigma: 1.0,
        }
    }
}

impl WorkloadConfig {
    /// Total worker thread count.
    pub fn thread_count(&self) -> usize {
        self.reader_count + self.inserter_count
    }

    /// Number of profiler rounds over the whole duration.
    pub fn profile_rounds(&self) -> u64 {
        (self.duration_secs * 1000 / self.profile_interval_ms.max(1)).max(1)
    }

    /// Validates the workload parameters.
    pub fn validate(&self) -> Result<()> {
        if self.thread_count() == 0 {
            return Err(KarixError::InvalidParameter {
                name: "thread_count".to_string(),
                value: "0".to_string(),
            });
        }
        if self.max_key_count != 0 && self.init_key_count > self.max_key_count {
            return Err(KarixError::InvalidParameter {
                name: "init_key_count".to_string(),
                value: self.init_key_count.to_string(),
            });
        }
        if self.distribution == KeyDistribution::Lognormal && self.lognormal_sigma <= 0.0 {
            return Err(KarixError::InvalidParameter {
                name: "lognormal_sigma".to_string(),
                value: self.lognormal_sigma.to_string(),
            });
        }
        Ok(())
    }
}
