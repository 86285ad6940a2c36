//! Pinned worker threads and the interval profiler.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sysinfo::{Pid, System};

use karix_common::{Result, Value, WorkloadConfig};
use karix_index::OrderedIndex;
use karix_store::TupleStore;

use crate::keygen::KeySpace;

/// Tuple payload written by inserters; the workload only measures how fast
/// tuples are located, not what they carry.
const TUPLE_VALUE: Value = 100;

/// Bytes per stored tuple, for the estimated-size column.
const TUPLE_BYTES: u64 = 16;

pub fn run(
    store: Arc<TupleStore>,
    index: Arc<dyn OrderedIndex>,
    config: &WorkloadConfig,
) -> Result<()> {
    let key_space = KeySpace::new(config)?;

    // Initial load plus one rebuild, so readers start against a populated
    // index.
    let mut loader = key_space.generator(0);
    for _ in 0..config.init_key_count {
        let key = loader.insert_key();
        let offset = store.insert(key, TUPLE_VALUE);
        index.insert(key, offset)?;
    }
    index.reorganize()?;
    tracing::info!(tuples = config.init_key_count, "initial load complete");

    let running = Arc::new(AtomicBool::new(true));
    let thread_count = config.thread_count();
    let counters: Vec<Arc<AtomicU64>> = (0..thread_count)
        .map(|_| Arc::new(AtomicU64::new(0)))
        .collect();
    let cores = core_affinity::get_core_ids().unwrap_or_default();

    let mut workers = Vec::with_capacity(thread_count);
    for thread_id in 0..config.inserter_count {
        let store = store.clone();
        let index = index.clone();
        let running = running.clone();
        let counter = counters[thread_id].clone();
        let key_space = key_space.clone();
        let core = pick_core(&cores, thread_id);
        workers.push(thread::spawn(move || {
            if let Some(core) = core {
                core_affinity::set_for_current(core);
            }
            let mut generator = key_space.generator(thread_id as u64);
            while running.load(Ordering::Relaxed) {
                let key = generator.insert_key();
                let offset = store.insert(key, TUPLE_VALUE);
                if index.insert(key, offset).is_err() {
                    break;
                }
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }
    for thread_id in config.inserter_count..thread_count {
        let index = index.clone();
        let running = running.clone();
        let counter = counters[thread_id].clone();
        let key_space = key_space.clone();
        let core = pick_core(&cores, thread_id);
        workers.push(thread::spawn(move || {
            if let Some(core) = core {
                core_affinity::set_for_current(core);
            }
            let mut generator = key_space.generator(thread_id as u64);
            let mut values = Vec::new();
            while running.load(Ordering::Relaxed) {
                let key = generator.read_key();
                values.clear();
                index.find(key, &mut values);
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }
    tracing::info!(
        inserters = config.inserter_count,
        readers = config.reader_count,
        "workers running"
    );

    profile(&store, config, &counters);

    running.store(false, Ordering::Relaxed);
    for worker in workers {
        let _ = worker.join();
    }

    let total: u64 = counters
        .iter()
        .map(|counter| counter.load(Ordering::Relaxed))
        .sum();
    println!(
        "insert = {}, read = {}, throughput = {:.2} M ops",
        config.inserter_count,
        config.reader_count,
        total as f64 / config.duration_secs.max(1) as f64 / 1_000_000.0
    );
    Ok(())
}

/// Samples the per-thread counters every profile interval and prints one
/// row per window.
fn profile(store: &TupleStore, config: &WorkloadConfig, counters: &[Arc<AtomicU64>]) {
    let mut system = System::new();
    let pid = sysinfo::get_current_pid().ok();
    let interval_secs = config.profile_interval_ms as f64 / 1000.0;

    println!("        TIME         INSERT      READ       RAM (act.)   RAM (est.)");

    let mut previous = vec![0u64; counters.len()];
    for round in 0..config.profile_rounds() {
        thread::sleep(Duration::from_millis(config.profile_interval_ms));

        let current: Vec<u64> = counters
            .iter()
            .map(|counter| counter.load(Ordering::Relaxed))
            .collect();
        let inserts: u64 = current[..config.inserter_count]
            .iter()
            .zip(&previous[..config.inserter_count])
            .map(|(now, before)| now - before)
            .sum();
        let reads: u64 = current[config.inserter_count..]
            .iter()
            .zip(&previous[config.inserter_count..])
            .map(|(now, before)| now - before)
            .sum();

        let actual_gb = resident_gb(&mut system, pid);
        let estimated_gb =
            (store.size_approx() * TUPLE_BYTES) as f64 / (1u64 << 30) as f64;

        println!(
            "[{:5.2} - {:5.2} s]:  {:5.2} M  |  {:5.2} M  |  {:5.2} GB  |  {:5.2} GB",
            round as f64 * interval_secs,
            (round + 1) as f64 * interval_secs,
            inserts as f64 / 1_000_000.0,
            reads as f64 / 1_000_000.0,
            actual_gb,
            estimated_gb,
        );
        previous = current;
    }
}

fn pick_core(cores: &[core_affinity::CoreId], thread_id: usize) -> Option<core_affinity::CoreId> {
    if cores.is_empty() {
        None
    } else {
        Some(cores[thread_id % cores.len()])
    }
}

/// Resident memory of this process in GB, zero when unavailable.
fn resident_gb(system: &mut System, pid: Option<Pid>) -> f64 {
    let Some(pid) = pid else {
        return 0.0;
    };
    system.refresh_process(pid);
    system
        .process(pid)
        .map(|process| process.memory() as f64 / (1u64 << 30) as f64)
        .unwrap_or(0.0)
}
