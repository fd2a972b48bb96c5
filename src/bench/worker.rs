//! Benchmark worker execution
//!
//! One worker simulates one accelerator device: it owns private workload
//! buffers and runs timed kernel passes, either a fixed number of trials
//! (benchmark mode) or continuously until signaled to stop (monitor mode).
//! The stop flag is the only state shared with the orchestrator; every worker
//! exclusively owns its sample vector and hands it over on join.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::metrics::Sample;
use crate::util::Stopwatch;
use crate::workload::{WorkloadBuffers, WorkloadKind};
use crate::{AccelBenchError, Result};

/// Default pause between continuous cycles, to avoid saturating the host
pub const DEFAULT_CYCLE_PAUSE: Duration = Duration::from_millis(100);

/// One simulated accelerator device.
///
/// A worker is single-use: `run_continuous` consumes it, and a new run
/// requires a new instance with freshly generated buffers.
pub struct Worker {
    worker_id: usize,
    kind: WorkloadKind,
    buffers: WorkloadBuffers,
}

impl Worker {
    /// Create a worker with freshly generated private buffers
    pub fn new(worker_id: usize, kind: WorkloadKind, element_count: usize) -> Result<Self> {
        let buffers = kind.generate(element_count)?;
        Ok(Self {
            worker_id,
            kind,
            buffers,
        })
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn kind(&self) -> WorkloadKind {
        self.kind
    }

    /// Execute exactly one timed trial.
    ///
    /// A zero-length interval yields `ops_per_second = 0`, never a division
    /// fault.
    pub fn run_once(&self) -> Sample {
        let timestamp = Utc::now();
        let stopwatch = Stopwatch::start();
        let operations = self.kind.run(&self.buffers);
        Sample::new(self.worker_id, timestamp, stopwatch.elapsed(), operations)
    }

    /// Run a fixed number of trials back to back (benchmark mode).
    ///
    /// Samples are strictly time-ordered within the returned vector.
    pub fn run_trials(&self, trials: usize) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(trials);
        for _ in 0..trials {
            samples.push(self.run_once());
        }
        samples
    }

    /// Run cycles until the stop flag clears (monitor mode).
    ///
    /// The flag is polled at the top of each cycle and again before each
    /// pause, so a worker mid-cycle finishes that cycle and stops within one
    /// cycle pause of the signal. Consumes the worker: a stopped run is not
    /// restartable.
    pub fn run_continuous(self, running: Arc<AtomicBool>, pause: Duration) -> Vec<Sample> {
        let mut samples = Vec::new();
        while running.load(Ordering::SeqCst) {
            samples.push(self.run_once());
            if !running.load(Ordering::SeqCst) {
                break;
            }
            std::thread::sleep(pause);
        }
        samples
    }
}

/// Orchestrator-side handle for one spawned worker.
///
/// Pairs the shared stop flag with the join handle of the worker's blocking
/// execution context. Collection is at-most-once: `join` consumes the handle.
pub struct WorkerHandle {
    worker_id: usize,
    running: Arc<AtomicBool>,
    handle: JoinHandle<Vec<Sample>>,
}

impl WorkerHandle {
    /// Spawn a continuous worker on its own blocking execution context.
    ///
    /// The `running` flag is shared across all workers of a run and written
    /// once by the orchestrator.
    pub fn spawn_continuous(worker: Worker, running: Arc<AtomicBool>, pause: Duration) -> Self {
        let worker_id = worker.worker_id();
        let flag = Arc::clone(&running);
        let handle = tokio::task::spawn_blocking(move || worker.run_continuous(flag, pause));
        Self {
            worker_id,
            running,
            handle,
        }
    }

    /// Spawn a fixed-trial worker on its own blocking execution context
    pub fn spawn_trials(worker: Worker, trials: usize) -> Self {
        let worker_id = worker.worker_id();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = tokio::task::spawn_blocking(move || {
            let samples = worker.run_trials(trials);
            flag.store(false, Ordering::SeqCst);
            samples
        });
        Self {
            worker_id,
            running,
            handle,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Signal the worker to stop after its current cycle
    pub fn signal_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the stop signal has been observed or sent
    pub fn is_stopped(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }

    /// Wait for the worker's execution context to terminate and take
    /// ownership of its samples.
    pub async fn join(self) -> Result<Vec<Sample>> {
        self.handle.await.map_err(|e| {
            AccelBenchError::WorkerError(format!("Worker {} join failed: {}", self.worker_id, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_once_op_count_is_proportional() {
        let worker = Worker::new(0, WorkloadKind::MultiplyAdd, 10_000).unwrap();
        let sample = worker.run_once();
        assert_eq!(sample.worker_id, 0);
        assert_eq!(sample.operation_count, 10_000 * 2);

        let worker = Worker::new(1, WorkloadKind::VectorSum, 5_000).unwrap();
        assert_eq!(worker.run_once().operation_count, 5_000 * 7);
    }

    #[test]
    fn test_run_once_is_deterministic_in_op_count() {
        let worker = Worker::new(0, WorkloadKind::BitwiseOps, 2_048).unwrap();
        let first = worker.run_once();
        let second = worker.run_once();
        assert_eq!(first.operation_count, second.operation_count);
        assert_eq!(first.operation_count, 2_048 * 3);
    }

    #[test]
    fn test_run_trials_count_and_ordering() {
        let worker = Worker::new(2, WorkloadKind::MultiplyAdd, 1_000).unwrap();
        let samples = worker.run_trials(10);
        assert_eq!(samples.len(), 10);
        for pair in samples.windows(2) {
            assert!(pair[1].timestamp >= pair[0].timestamp);
        }
        assert!(samples.iter().all(|s| s.worker_id == 2));
    }

    #[tokio::test]
    async fn test_continuous_worker_stops_after_signal() {
        let worker = Worker::new(0, WorkloadKind::MultiplyAdd, 1_000).unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let handle =
            WorkerHandle::spawn_continuous(worker, Arc::clone(&running), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.signal_stop();
        assert!(handle.is_stopped());

        let stopwatch = Stopwatch::start();
        let samples = handle.join().await.unwrap();
        // Cooperative stop: at most one cycle plus pause after the signal
        assert!(stopwatch.elapsed() < Duration::from_secs(1));
        assert!(!samples.is_empty());
        for pair in samples.windows(2) {
            assert!(pair[1].timestamp >= pair[0].timestamp);
        }
    }

    #[tokio::test]
    async fn test_continuous_worker_with_cleared_flag_runs_no_cycles() {
        let worker = Worker::new(0, WorkloadKind::BitwiseOps, 1_000).unwrap();
        let running = Arc::new(AtomicBool::new(false));
        let handle =
            WorkerHandle::spawn_continuous(worker, running, Duration::from_millis(10));
        let samples = handle.join().await.unwrap();
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_trial_worker_clears_flag_on_completion() {
        let worker = Worker::new(7, WorkloadKind::MultiplyAdd, 500).unwrap();
        let handle = WorkerHandle::spawn_trials(worker, 5);
        let samples = handle.join().await.unwrap();
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|s| s.worker_id == 7));
    }
}
