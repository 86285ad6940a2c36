//! karix-bench: drives an in-memory ordered index under a mixed
//! insert/read workload and reports per-interval throughput and memory.
//!
//! # Usage
//!
//! ```bash
//! # 10s read-only run against the static k-ary index
//! karix-bench --reader-count 4
//!
//! # Mixed workload, dynamic index, bounded key space
//! karix-bench --index dynamic --inserter-count 2 --reader-count 2 \
//!     --max-key-count 10000000
//! ```

mod keygen;
mod workload;

use clap::{Parser, ValueEnum};
use std::sync::Arc;

use karix_common::{IndexConfig, KeyDistribution, Result, WorkloadConfig};
use karix_index::{DynamicBTreeIndex, OrderedIndex, StaticKaryIndex};
use karix_store::TupleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IndexKind {
    /// Static k-ary search index, rebuilt once after the initial load.
    Static,
    /// Ordered map applying inserts immediately.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DistributionArg {
    Sequential,
    Uniform,
    Lognormal,
}

impl From<DistributionArg> for KeyDistribution {
    fn from(arg: DistributionArg) -> Self {
        match arg {
            DistributionArg::Sequential => KeyDistribution::Sequential,
            DistributionArg::Uniform => KeyDistribution::Uniform,
            DistributionArg::Lognormal => KeyDistribution::Lognormal,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "karix-bench",
    about = "Benchmark in-memory ordered indexes under a mixed insert/read workload"
)]
struct Cli {
    /// Benchmark duration in seconds.
    #[arg(short = 't', long, default_value_t = 10)]
    time_duration: u64,

    /// Upper bound on generated keys (0 = unbounded sequential space).
    #[arg(short = 'm', long, default_value_t = 0)]
    max_key_count: u64,

    /// Tuples loaded before the timed phase.
    #[arg(short = 'n', long, default_value_t = 1 << 20)]
    init_key_count: u64,

    /// Reader thread count.
    #[arg(short = 'r', long, default_value_t = 1)]
    reader_count: usize,

    /// Inserter thread count.
    #[arg(short = 's', long, default_value_t = 0)]
    inserter_count: usize,

    /// Branching factor of the static index.
    #[arg(short = 'k', long, default_value_t = 8)]
    fanout: usize,

    /// Inner-layer count of the static index (0 = pure binary search).
    #[arg(short = 'l', long, default_value_t = 3)]
    num_layers: usize,

    /// Index under test.
    #[arg(long, value_enum, default_value = "static")]
    index: IndexKind,

    /// Insert-key distribution.
    #[arg(long, value_enum, default_value = "sequential")]
    distribution: DistributionArg,

    /// Shape parameter for the lognormal distribution.
    #[arg(long, default_value_t = 1.0)]
    lognormal_sigma: f64,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        tracing::error!(%err, "benchmark failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = WorkloadConfig {
        duration_secs: cli.time_duration,
        init_key_count: cli.init_key_count,
        max_key_count: cli.max_key_count,
        reader_count: cli.reader_count,
        inserter_count: cli.inserter_count,
        distribution: cli.distribution.into(),
        lognormal_sigma: cli.lognormal_sigma,
        ..Default::default()
    };
    config.validate()?;

    let store = Arc::new(TupleStore::new());
    let index: Arc<dyn OrderedIndex> = match cli.index {
        IndexKind::Static => Arc::new(StaticKaryIndex::new(
            store.clone(),
            IndexConfig {
                fanout: cli.fanout,
                num_layers: cli.num_layers,
            },
        )?),
        IndexKind::Dynamic => Arc::new(DynamicBTreeIndex::new(store.clone())),
    };

    workload::run(store, index, &config)
}
