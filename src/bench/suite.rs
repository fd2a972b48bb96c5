//! One-shot benchmark suite orchestrator
//!
//! Runs the fixed, ordered sequence of independent tests (memory throughput,
//! transfer simulation, operations per second, parallel workers) and merges
//! the outcomes into a single report. Every section is isolated: a failure
//! surfaces as a failed report section with its cause recorded and never
//! aborts the rest of the run.

use std::collections::BTreeMap;
use std::hint::black_box;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::bench::collector;
use crate::bench::worker::{Worker, WorkerHandle};
use crate::config::HarnessConfig;
use crate::metrics::{
    BenchmarkInfo, BenchmarkReport, InstanceInfo, MemoryBandwidthResult, OpsPerSecondResult,
    ParallelResult, PerformanceSummary, Section, TransferSimulationResult, WorkerRunSummary,
};
use crate::util::units::{bandwidth_gbps, ops_per_sec, round_to};
use crate::util::Stopwatch;
use crate::workload::WorkloadKind;
use crate::{AccelBenchError, Result};

/// Full-buffer passes in the memory throughput test
const MEMORY_ITERATIONS: u32 = 10;
/// Chunk count in the scatter-style transfer simulation
const TRANSFER_CHUNKS: usize = 64;

/// One-shot benchmark suite over a fixed worker pool
#[derive(Debug)]
pub struct BenchmarkSuite {
    config: HarnessConfig,
    instance: InstanceInfo,
}

impl BenchmarkSuite {
    /// Create a suite for the given configuration.
    ///
    /// Instance metadata is detected once here, not read ambiently during
    /// the run.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let instance = InstanceInfo::detect(config.worker_count);
        Ok(Self { config, instance })
    }

    pub fn instance_info(&self) -> &InstanceInfo {
        &self.instance
    }

    /// Run the complete suite and assemble the final report.
    ///
    /// Sections run in a fixed order; each is isolated and a fault in one
    /// surfaces as a failed section, not an aborted run.
    pub async fn run_full(&self) -> BenchmarkReport {
        let started = Utc::now();
        let stopwatch = Stopwatch::start();

        println!("1. Memory bandwidth test");
        let memory_bandwidth = Section::from_result(self.test_memory_bandwidth());
        report_section_failure("memory_bandwidth", &memory_bandwidth);

        println!("2. Transfer simulation test");
        let transfer_simulation = Section::from_result(self.test_transfer_simulation());
        report_section_failure("transfer_simulation", &transfer_simulation);

        println!("3. Operations per second tests");
        let mut operations_per_second = BTreeMap::new();
        for kind in WorkloadKind::ALL {
            let section = Section::from_result(self.test_operations_per_second(kind));
            report_section_failure(kind.name(), &section);
            operations_per_second.insert(kind.name().to_string(), section);
        }

        println!("4. Parallel worker simulation");
        let parallel_simulation = Section::from_result(self.test_parallel_workers().await);
        report_section_failure("parallel_simulation", &parallel_simulation);

        let performance_summary = build_summary(
            &memory_bandwidth,
            &transfer_simulation,
            &operations_per_second,
            &parallel_simulation,
        );

        BenchmarkReport {
            benchmark_info: BenchmarkInfo {
                timestamp: started,
                total_benchmark_time_sec: round_to(stopwatch.elapsed_secs(), 2),
                instance_info: self.instance.clone(),
            },
            memory_bandwidth,
            transfer_simulation,
            operations_per_second,
            parallel_simulation,
            performance_summary,
        }
    }

    /// Measure repeated full-buffer read (reduce) and write (copy) passes
    /// over a buffer of the configured size.
    pub fn test_memory_bandwidth(&self) -> Result<MemoryBandwidthResult> {
        let size_bytes = self.config.data_size_mb * 1024 * 1024;
        let source = random_bytes(size_bytes)?;

        let stopwatch = Stopwatch::start();
        for _ in 0..MEMORY_ITERATIONS {
            let mut acc = 0u64;
            for &byte in &source {
                acc = acc.wrapping_add(byte as u64);
            }
            black_box(acc);
        }
        let read_time = stopwatch.elapsed() / MEMORY_ITERATIONS;

        let mut dest = zeroed_bytes(size_bytes)?;
        let stopwatch = Stopwatch::start();
        for _ in 0..MEMORY_ITERATIONS {
            dest.copy_from_slice(&source);
            black_box(dest.as_slice());
        }
        let write_time = stopwatch.elapsed() / MEMORY_ITERATIONS;

        Ok(MemoryBandwidthResult {
            data_size_mb: self.config.data_size_mb,
            read_bandwidth_gbps: round_to(bandwidth_gbps(size_bytes as u64, read_time), 2),
            write_bandwidth_gbps: round_to(bandwidth_gbps(size_bytes as u64, write_time), 2),
            read_time_sec: round_to(read_time.as_secs_f64(), 4),
            write_time_sec: round_to(write_time.as_secs_f64(), 4),
        })
    }

    /// Measure one bulk copy and one chunked copy of the configured transfer
    /// size, simulating contiguous vs. scatter-gather transfer strategies.
    pub fn test_transfer_simulation(&self) -> Result<TransferSimulationResult> {
        let size_bytes = self.config.transfer_size_mb * 1024 * 1024;
        let element_count = size_bytes / 2;

        let mut rng = SmallRng::from_entropy();
        let mut host: Vec<u16> = zeroed_vec(element_count)?;
        rng.fill(host.as_mut_slice());
        let mut device: Vec<u16> = zeroed_vec(element_count)?;

        let stopwatch = Stopwatch::start();
        device.copy_from_slice(&host);
        black_box(device.as_slice());
        let single_time = stopwatch.elapsed();

        let chunk_elements = (element_count / TRANSFER_CHUNKS).max(1);
        let stopwatch = Stopwatch::start();
        for (dest, src) in device
            .chunks_mut(chunk_elements)
            .zip(host.chunks(chunk_elements))
        {
            dest.copy_from_slice(src);
        }
        black_box(device.as_slice());
        let multi_time = stopwatch.elapsed();

        Ok(TransferSimulationResult {
            transfer_size_mb: self.config.transfer_size_mb,
            single_transfer_gbps: round_to(bandwidth_gbps(size_bytes as u64, single_time), 2),
            multi_transfer_gbps: round_to(bandwidth_gbps(size_bytes as u64, multi_time), 2),
            single_transfer_time_sec: round_to(single_time.as_secs_f64(), 4),
            multi_transfer_time_sec: round_to(multi_time.as_secs_f64(), 4),
        })
    }

    /// Measure sustained operations per second for one workload kind over
    /// the configured iteration count and element count.
    pub fn test_operations_per_second(&self, kind: WorkloadKind) -> Result<OpsPerSecondResult> {
        let element_count = self.config.ops_element_count;
        let iterations = self.config.ops_iterations;
        let buffers = kind.generate(element_count)?;

        let stopwatch = Stopwatch::start();
        let mut total_operations = 0u64;
        for _ in 0..iterations {
            total_operations += kind.run(&buffers);
        }
        let elapsed = stopwatch.elapsed();

        let rate = ops_per_sec(total_operations, elapsed);
        Ok(OpsPerSecondResult {
            operation_type: kind.name().to_string(),
            data_size: element_count,
            iterations,
            total_operations,
            elapsed_time_sec: round_to(elapsed.as_secs_f64(), 4),
            ops_per_second: round_to(rate, 0),
            mega_ops_per_second: round_to(rate / 1e6, 2),
            giga_ops_per_second: round_to(rate / 1e9, 4),
        })
    }

    /// Run the operations-per-second test for a workload given by name.
    ///
    /// An unknown name is a configuration error for this test only.
    pub fn test_operations_per_second_named(&self, name: &str) -> Result<OpsPerSecondResult> {
        let kind: WorkloadKind = name.parse()?;
        self.test_operations_per_second(kind)
    }

    /// Run one worker per configured slot concurrently, each executing a
    /// fixed number of trials, then aggregate after all workers have joined.
    pub async fn test_parallel_workers(&self) -> Result<ParallelResult> {
        let worker_count = self.config.worker_count;
        let trials = self.config.trials_per_worker;
        let element_count = self.config.trial_element_count;

        // Build every worker before spawning so an allocation failure
        // surfaces as a section failure without leaking running tasks.
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            workers.push(Worker::new(
                worker_id,
                WorkloadKind::MultiplyAdd,
                element_count,
            )?);
        }

        let stopwatch = Stopwatch::start();
        let handles: Vec<WorkerHandle> = workers
            .into_iter()
            .map(|worker| WorkerHandle::spawn_trials(worker, trials))
            .collect();

        let mut samples_by_worker = BTreeMap::new();
        for handle in handles {
            let worker_id = handle.worker_id();
            match handle.join().await {
                Ok(samples) => {
                    samples_by_worker.insert(worker_id, samples);
                }
                Err(err) => {
                    eprintln!("Worker {} dropped from parallel results: {}", worker_id, err);
                }
            }
        }
        let total_time = stopwatch.elapsed();

        if samples_by_worker.is_empty() {
            return Err(AccelBenchError::WorkerError(
                "No parallel worker produced samples".to_string(),
            ));
        }

        let total_operations: u64 = samples_by_worker
            .values()
            .flatten()
            .map(|s| s.operation_count)
            .sum();

        let individual_worker_results = samples_by_worker
            .iter()
            .map(|(&worker_id, samples)| {
                let ops_performed: u64 = samples.iter().map(|s| s.operation_count).sum();
                let elapsed: Duration = samples.iter().map(|s| s.duration).sum();
                WorkerRunSummary {
                    worker_id,
                    ops_performed,
                    elapsed_time_sec: round_to(elapsed.as_secs_f64(), 4),
                    ops_per_second: round_to(ops_per_sec(ops_performed, elapsed), 0),
                }
            })
            .collect();

        let performance_analysis = collector::aggregate(&samples_by_worker, &[]);
        let rate = ops_per_sec(total_operations, total_time);

        Ok(ParallelResult {
            worker_count,
            total_operations,
            total_time_sec: round_to(total_time.as_secs_f64(), 4),
            aggregate_ops_per_second: round_to(rate, 0),
            aggregate_gops_per_second: round_to(rate / 1e9, 4),
            individual_worker_results,
            performance_analysis,
        })
    }
}

fn report_section_failure<T>(name: &str, section: &Section<T>) {
    if let Section::Failed { error } = section {
        eprintln!("Section {} failed: {}", name, error);
    }
}

fn build_summary(
    memory: &Section<MemoryBandwidthResult>,
    transfer: &Section<TransferSimulationResult>,
    ops: &BTreeMap<String, Section<OpsPerSecondResult>>,
    parallel: &Section<ParallelResult>,
) -> PerformanceSummary {
    let peak_memory = memory
        .completed()
        .map(|m| m.read_bandwidth_gbps.max(m.write_bandwidth_gbps))
        .unwrap_or(0.0);

    let peak_transfer = transfer
        .completed()
        .map(|t| t.single_transfer_gbps.max(t.multi_transfer_gbps))
        .unwrap_or(0.0);

    let peak_ops = ops
        .values()
        .filter_map(|section| section.completed())
        .map(|r| r.ops_per_second)
        .fold(0.0f64, f64::max);

    let parallel_gops = parallel
        .completed()
        .map(|p| p.aggregate_gops_per_second)
        .unwrap_or(0.0);

    PerformanceSummary {
        peak_memory_bandwidth_gbps: peak_memory,
        peak_transfer_throughput_gbps: peak_transfer,
        peak_ops_per_second: peak_ops,
        aggregate_parallel_gops: parallel_gops,
    }
}

fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buffer = zeroed_bytes(len)?;
    SmallRng::from_entropy().fill_bytes(&mut buffer);
    Ok(buffer)
}

fn zeroed_bytes(len: usize) -> Result<Vec<u8>> {
    zeroed_vec(len)
}

/// Allocate a zero-filled vector, surfacing allocation failure as a section
/// error instead of aborting the process.
fn zeroed_vec<T: Default + Clone>(len: usize) -> Result<Vec<T>> {
    let mut buffer: Vec<T> = Vec::new();
    buffer.try_reserve_exact(len).map_err(|e| {
        AccelBenchError::AllocationError(format!(
            "Failed to allocate buffer of {} elements: {}",
            len, e
        ))
    })?;
    buffer.resize(len, T::default());
    Ok(buffer)
}
