//! Sample and snapshot aggregation
//!
//! Pure reduction of a frozen set of worker samples and host snapshots into
//! summary statistics. Order-independent and safely re-runnable: permuting
//! the inputs or aggregating twice yields identical output. Every ratio with
//! a possibly-zero denominator resolves to 0.

use std::collections::BTreeMap;

use crate::metrics::{
    EfficiencyMetrics, PerformanceAnalysis, Sample, SystemPerformance, SystemSnapshot,
    WorkerPerformance,
};
use crate::util::units::round_to;

/// Reduce per-worker samples and host snapshots into an aggregate view.
///
/// Callers must only invoke this after every contributing worker has stopped;
/// the inputs are treated as a frozen collection. Empty inputs produce zeroed
/// metrics, never an error.
pub fn aggregate(
    samples_by_worker: &BTreeMap<usize, Vec<Sample>>,
    snapshots: &[SystemSnapshot],
) -> PerformanceAnalysis {
    PerformanceAnalysis {
        system_performance: reduce_snapshots(snapshots),
        worker_performance: reduce_samples(samples_by_worker),
        efficiency_metrics: derive_efficiency(samples_by_worker, snapshots),
    }
}

fn reduce_snapshots(snapshots: &[SystemSnapshot]) -> SystemPerformance {
    if snapshots.is_empty() {
        return SystemPerformance::default();
    }

    let count = snapshots.len() as f64;
    let (cpu_sum, cpu_max, mem_sum, mem_max) = snapshots.iter().fold(
        (0.0f64, 0.0f64, 0.0f64, 0.0f64),
        |(cs, cm, ms, mm), s| {
            (
                cs + s.cpu_percent,
                cm.max(s.cpu_percent),
                ms + s.memory_percent,
                mm.max(s.memory_percent),
            )
        },
    );

    SystemPerformance {
        avg_cpu_percent: round_to(cpu_sum / count, 2),
        max_cpu_percent: round_to(cpu_max, 2),
        avg_memory_percent: round_to(mem_sum / count, 2),
        max_memory_percent: round_to(mem_max, 2),
    }
}

fn reduce_samples(samples_by_worker: &BTreeMap<usize, Vec<Sample>>) -> WorkerPerformance {
    // Aggregate throughput is the sum of per-worker mean rates, so workers
    // with more cycles do not dominate the total.
    let mut total_aggregate = 0.0f64;
    let mut peak_single = 0.0f64;
    let mut contributing_workers = 0usize;

    for samples in samples_by_worker.values() {
        if samples.is_empty() {
            continue;
        }
        contributing_workers += 1;
        let mean =
            samples.iter().map(|s| s.ops_per_second).sum::<f64>() / samples.len() as f64;
        total_aggregate += mean;
        for sample in samples {
            peak_single = peak_single.max(sample.ops_per_second);
        }
    }

    let avg_per_worker = if contributing_workers > 0 {
        total_aggregate / contributing_workers as f64
    } else {
        0.0
    };

    WorkerPerformance {
        total_aggregate_ops_per_second: round_to(total_aggregate, 0),
        total_aggregate_gops_per_second: round_to(total_aggregate / 1e9, 4),
        avg_ops_per_worker: round_to(avg_per_worker, 0),
        peak_single_worker_ops: round_to(peak_single, 0),
    }
}

fn derive_efficiency(
    samples_by_worker: &BTreeMap<usize, Vec<Sample>>,
    snapshots: &[SystemSnapshot],
) -> EfficiencyMetrics {
    if snapshots.is_empty() {
        return EfficiencyMetrics::default();
    }

    let count = snapshots.len() as f64;
    let avg_cpu = snapshots.iter().map(|s| s.cpu_percent).sum::<f64>() / count;
    let avg_mem = snapshots.iter().map(|s| s.memory_percent).sum::<f64>() / count;
    let total_aggregate = reduce_samples(samples_by_worker).total_aggregate_ops_per_second;

    let ops_per_cpu = if avg_cpu > 0.0 {
        total_aggregate / avg_cpu
    } else {
        0.0
    };

    EfficiencyMetrics {
        ops_per_cpu_percent: round_to(ops_per_cpu, 0),
        system_utilization_score: round_to((avg_cpu + avg_mem) / 2.0, 2),
    }
}
