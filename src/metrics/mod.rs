//! Measurement records and report data models
//!
//! Contains the immutable sample/snapshot records produced during a run, the
//! derived aggregate views, and the serializable report structures persisted
//! as JSON. Numeric report fields are rounded to a fixed precision at
//! construction so identical inputs serialize to identical output.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::units::{ops_per_sec, round_to};

pub mod sampler;

/// One timed measurement record produced by a worker.
///
/// Created once per trial (benchmark mode) or cycle (monitor mode) and never
/// mutated afterwards; the collector owns it once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Worker that produced this sample
    pub worker_id: usize,
    /// Wall-clock time at the start of the trial/cycle
    pub timestamp: DateTime<Utc>,
    /// Measured duration of the trial/cycle
    #[serde(rename = "duration_secs", with = "duration_secs_serde")]
    pub duration: Duration,
    /// Operations performed during the trial/cycle
    pub operation_count: u64,
    /// Operations per second, 0 when no time elapsed
    pub ops_per_second: f64,
    /// Millions of operations per second
    pub throughput_mops: f64,
}

impl Sample {
    /// Build a sample from one finished trial, guarding rate math against a
    /// zero-length interval.
    pub fn new(
        worker_id: usize,
        timestamp: DateTime<Utc>,
        duration: Duration,
        operation_count: u64,
    ) -> Self {
        let rate = ops_per_sec(operation_count, duration);
        Self {
            worker_id,
            timestamp,
            duration,
            operation_count,
            ops_per_second: round_to(rate, 2),
            throughput_mops: round_to(rate / 1e6, 4),
        }
    }
}

/// Point-in-time host resource snapshot produced by the metrics sampler.
///
/// Fields without a host-side source stay at 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_available_gb: f64,
    pub disk_io_read_mb: f64,
    pub disk_io_write_mb: f64,
    pub network_sent_mb: f64,
    pub network_recv_mb: f64,
}

/// Host metadata captured once at orchestrator construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceInfo {
    /// Host name, or "unknown-host" when detection fails
    pub instance_label: String,
    /// Logical CPU count
    pub cpu_count: usize,
    /// Total host memory in GiB
    pub memory_gb: f64,
    /// Number of simulated accelerator workers in this run
    pub worker_count: usize,
}

impl InstanceInfo {
    /// Detect host metadata. Detection failure degrades to zeroed fields,
    /// never an error.
    pub fn detect(worker_count: usize) -> Self {
        use sysinfo::System;

        let mut sys = System::new();
        sys.refresh_memory();

        Self {
            instance_label: System::host_name().unwrap_or_else(|| "unknown-host".to_string()),
            cpu_count: num_cpus::get(),
            memory_gb: round_to(sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0), 2),
            worker_count,
        }
    }
}

/// Host resource statistics over a monitoring window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemPerformance {
    pub avg_cpu_percent: f64,
    pub max_cpu_percent: f64,
    pub avg_memory_percent: f64,
    pub max_memory_percent: f64,
}

/// Worker throughput statistics over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerPerformance {
    /// Sum over workers of each worker's mean ops/sec
    pub total_aggregate_ops_per_second: f64,
    pub total_aggregate_gops_per_second: f64,
    pub avg_ops_per_worker: f64,
    /// Highest ops/sec observed in any single sample
    pub peak_single_worker_ops: f64,
}

/// Throughput-per-resource ratios, zero when the denominator is zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyMetrics {
    pub ops_per_cpu_percent: f64,
    pub system_utilization_score: f64,
}

/// Derived, read-only aggregate view over a frozen set of samples and
/// snapshots. Computed only after every contributing worker has stopped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    pub system_performance: SystemPerformance,
    pub worker_performance: WorkerPerformance,
    pub efficiency_metrics: EfficiencyMetrics,
}

/// Outcome of one isolated report section.
///
/// A failed section records its cause and never prevents sibling sections
/// from running or reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Completed(T),
    Failed { error: String },
}

impl<T> Section<T> {
    /// Wrap a section outcome, stringifying the failure cause
    pub fn from_result(result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Section::Completed(value),
            Err(err) => Section::Failed {
                error: err.to_string(),
            },
        }
    }

    /// The completed value, if any
    pub fn completed(&self) -> Option<&T> {
        match self {
            Section::Completed(value) => Some(value),
            Section::Failed { .. } => None,
        }
    }

    /// Whether this section failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Section::Failed { .. })
    }
}

/// Memory throughput section results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryBandwidthResult {
    pub data_size_mb: usize,
    pub read_bandwidth_gbps: f64,
    pub write_bandwidth_gbps: f64,
    pub read_time_sec: f64,
    pub write_time_sec: f64,
}

/// Transfer simulation section results (bulk vs. chunked copy)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSimulationResult {
    pub transfer_size_mb: usize,
    pub single_transfer_gbps: f64,
    pub multi_transfer_gbps: f64,
    pub single_transfer_time_sec: f64,
    pub multi_transfer_time_sec: f64,
}

/// Operations-per-second section results for one workload kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpsPerSecondResult {
    pub operation_type: String,
    pub data_size: usize,
    pub iterations: usize,
    pub total_operations: u64,
    pub elapsed_time_sec: f64,
    pub ops_per_second: f64,
    pub mega_ops_per_second: f64,
    pub giga_ops_per_second: f64,
}

/// Per-worker summary within the parallel section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRunSummary {
    pub worker_id: usize,
    pub ops_performed: u64,
    pub elapsed_time_sec: f64,
    pub ops_per_second: f64,
}

/// Parallel multi-worker section results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelResult {
    pub worker_count: usize,
    pub total_operations: u64,
    pub total_time_sec: f64,
    /// Total operations divided by total wall time
    pub aggregate_ops_per_second: f64,
    pub aggregate_gops_per_second: f64,
    pub individual_worker_results: Vec<WorkerRunSummary>,
    pub performance_analysis: PerformanceAnalysis,
}

/// Run metadata common to every benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkInfo {
    pub timestamp: DateTime<Utc>,
    pub total_benchmark_time_sec: f64,
    pub instance_info: InstanceInfo,
}

/// Derived peak/aggregate metrics over whichever sections completed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub peak_memory_bandwidth_gbps: f64,
    pub peak_transfer_throughput_gbps: f64,
    pub peak_ops_per_second: f64,
    pub aggregate_parallel_gops: f64,
}

/// Final report of a one-shot benchmark suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub benchmark_info: BenchmarkInfo,
    pub memory_bandwidth: Section<MemoryBandwidthResult>,
    pub transfer_simulation: Section<TransferSimulationResult>,
    pub operations_per_second: BTreeMap<String, Section<OpsPerSecondResult>>,
    pub parallel_simulation: Section<ParallelResult>,
    pub performance_summary: PerformanceSummary,
}

impl BenchmarkReport {
    /// One-line console summary
    pub fn summary(&self) -> String {
        format!(
            "peak memory {:.2} GB/s - peak transfer {:.2} GB/s - peak {:.0} ops/sec - parallel {:.4} GOPS",
            self.performance_summary.peak_memory_bandwidth_gbps,
            self.performance_summary.peak_transfer_throughput_gbps,
            self.performance_summary.peak_ops_per_second,
            self.performance_summary.aggregate_parallel_gops,
        )
    }

    /// Number of sections (counting each workload kind) that failed
    pub fn failed_section_count(&self) -> usize {
        let mut failed = 0;
        if self.memory_bandwidth.is_failed() {
            failed += 1;
        }
        if self.transfer_simulation.is_failed() {
            failed += 1;
        }
        failed += self
            .operations_per_second
            .values()
            .filter(|s| s.is_failed())
            .count();
        if self.parallel_simulation.is_failed() {
            failed += 1;
        }
        failed
    }
}

/// Run metadata for a monitoring window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringInfo {
    pub duration_seconds: u64,
    pub worker_count: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub instance_info: InstanceInfo,
}

/// Final report of a continuous monitoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorReport {
    pub monitoring_info: MonitoringInfo,
    pub system_metrics: Vec<SystemSnapshot>,
    #[serde(with = "worker_metrics_serde")]
    pub worker_metrics: BTreeMap<usize, Vec<Sample>>,
    pub performance_analysis: PerformanceAnalysis,
}

impl MonitorReport {
    /// One-line console summary
    pub fn summary(&self) -> String {
        format!(
            "{} workers - {:.0} aggregate ops/sec - avg CPU {:.1}% - {} snapshots",
            self.monitoring_info.worker_count,
            self.performance_analysis
                .worker_performance
                .total_aggregate_ops_per_second,
            self.performance_analysis.system_performance.avg_cpu_percent,
            self.system_metrics.len(),
        )
    }
}

// Durations serialize as fractional seconds for report readability
mod duration_secs_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        crate::util::units::round_to(duration.as_secs_f64(), 6).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if secs.is_finite() && secs >= 0.0 {
            Ok(Duration::from_secs_f64(secs))
        } else {
            Ok(Duration::ZERO)
        }
    }
}

// Serializes the same `{ "0": [...] }` shape serde_json already produces for a
// `BTreeMap<usize, _>`, but routes deserialization through string keys so the
// map survives the buffered-content path of the internally-tagged ReportRecord
// enum (serde loses integer-key typing otherwise).
mod worker_metrics_serde {
    use super::{BTreeMap, Sample};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(
        metrics: &BTreeMap<usize, Vec<Sample>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let as_strings: BTreeMap<String, &Vec<Sample>> =
            metrics.iter().map(|(id, s)| (id.to_string(), s)).collect();
        as_strings.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<usize, Vec<Sample>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let as_strings: BTreeMap<String, Vec<Sample>> = BTreeMap::deserialize(deserializer)?;
        as_strings
            .into_iter()
            .map(|(id, s)| id.parse().map(|id| (id, s)).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_calculation() {
        let sample = Sample::new(3, Utc::now(), Duration::from_millis(500), 1_000_000);
        assert_eq!(sample.worker_id, 3);
        assert_eq!(sample.operation_count, 1_000_000);
        assert!((sample.ops_per_second - 2_000_000.0).abs() < 1.0);
        assert!((sample.throughput_mops - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_sample_zero_duration_guard() {
        let sample = Sample::new(0, Utc::now(), Duration::ZERO, 1000);
        assert_eq!(sample.ops_per_second, 0.0);
        assert_eq!(sample.throughput_mops, 0.0);
    }

    #[test]
    fn test_sample_serde_round_trip() {
        let sample = Sample::new(1, Utc::now(), Duration::from_millis(250), 4000);
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("duration_secs"));
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back.worker_id, sample.worker_id);
        assert_eq!(back.operation_count, sample.operation_count);
        assert_eq!(back.ops_per_second, sample.ops_per_second);
        assert_eq!(back.duration, sample.duration);
    }

    #[test]
    fn test_section_serde_tags() {
        let ok: Section<MemoryBandwidthResult> = Section::Completed(MemoryBandwidthResult {
            data_size_mb: 64,
            read_bandwidth_gbps: 1.0,
            write_bandwidth_gbps: 2.0,
            read_time_sec: 0.5,
            write_time_sec: 0.25,
        });
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains("\"status\":\"completed\""));

        let failed: Section<MemoryBandwidthResult> = Section::Failed {
            error: "boom".to_string(),
        };
        let json = serde_json::to_string(&failed).unwrap();
        assert!(json.contains("\"status\":\"failed\""));

        let back: Section<MemoryBandwidthResult> = serde_json::from_str(&json).unwrap();
        assert!(back.is_failed());
    }

    #[test]
    fn test_section_completed_accessor() {
        let section = Section::Completed(42u32);
        assert_eq!(section.completed(), Some(&42));
        assert!(!section.is_failed());

        let failed: Section<u32> = Section::from_result(Err(
            crate::AccelBenchError::BenchmarkError("no".to_string()),
        ));
        assert!(failed.completed().is_none());
    }

    #[test]
    fn test_instance_info_detection_never_fails() {
        let info = InstanceInfo::detect(8);
        assert_eq!(info.worker_count, 8);
        assert!(!info.instance_label.is_empty());
        assert!(info.cpu_count > 0);
    }

    #[test]
    fn test_snapshot_serde_round_trip() {
        let snapshot = SystemSnapshot {
            timestamp: Utc::now(),
            cpu_percent: 42.5,
            memory_percent: 61.2,
            memory_available_gb: 5.75,
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SystemSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        // Fields without a host source stay at 0
        assert_eq!(back.disk_io_read_mb, 0.0);
        assert_eq!(back.disk_io_write_mb, 0.0);
    }
}
