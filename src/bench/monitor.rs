//! Continuous throughput monitor orchestrator
//!
//! Runs a fixed pool of continuous workers for a bounded window while a
//! once-per-second sampling loop collects host snapshots and drives the
//! termination clock. Cancellation is cooperative: one shared stop flag,
//! written once when the window elapses, polled by every worker. Aggregation
//! happens strictly after every worker has joined.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::bench::collector;
use crate::bench::worker::{Worker, WorkerHandle};
use crate::config::HarnessConfig;
use crate::metrics::sampler::{MetricsSource, SystemSampler};
use crate::metrics::{InstanceInfo, MonitorReport, MonitoringInfo};
use crate::util::Stopwatch;
use crate::{AccelBenchError, Result};

/// Interval between host snapshot polls
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Monitor lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

/// Per-tick progress update emitted while the monitoring window is open
#[derive(Debug, Clone)]
pub struct MonitorProgress {
    pub elapsed: Duration,
    pub snapshots_collected: usize,
    pub cpu_percent: f64,
}

/// Continuous monitor over a fixed pool of workers.
///
/// Single-use: a finished monitor stays `Stopped` and a new run requires a
/// new instance.
pub struct ThroughputMonitor<S: MetricsSource = SystemSampler> {
    config: HarnessConfig,
    instance: InstanceInfo,
    sampler: S,
    state: MonitorState,
}

impl ThroughputMonitor<SystemSampler> {
    /// Create a monitor backed by the host metrics sampler
    pub fn new(config: HarnessConfig) -> Result<Self> {
        Self::with_sampler(config, SystemSampler::new())
    }
}

impl<S: MetricsSource> ThroughputMonitor<S> {
    /// Create a monitor with an injected metrics source
    pub fn with_sampler(config: HarnessConfig, sampler: S) -> Result<Self> {
        config.validate()?;
        let instance = InstanceInfo::detect(config.worker_count);
        Ok(Self {
            config,
            instance,
            sampler,
            state: MonitorState::Idle,
        })
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn instance_info(&self) -> &InstanceInfo {
        &self.instance
    }

    /// Run the monitoring window to completion and produce the final report.
    ///
    /// Progress updates are sent per sampler tick when a channel is given.
    /// The report is assembled only after every worker context has
    /// terminated; there is no partial collection.
    pub async fn run(
        &mut self,
        progress_tx: Option<mpsc::Sender<MonitorProgress>>,
    ) -> Result<MonitorReport> {
        if self.state != MonitorState::Idle {
            return Err(AccelBenchError::BenchmarkError(
                "Monitor runs are not restartable; create a new monitor".to_string(),
            ));
        }

        let start_time = Utc::now();
        let running = Arc::new(AtomicBool::new(true));

        // A worker that fails to start loses its contribution; the rest of
        // the pool runs regardless.
        let mut handles = Vec::with_capacity(self.config.worker_count);
        for worker_id in 0..self.config.worker_count {
            match Worker::new(
                worker_id,
                self.config.workload,
                self.config.cycle_element_count,
            ) {
                Ok(worker) => handles.push(WorkerHandle::spawn_continuous(
                    worker,
                    Arc::clone(&running),
                    self.config.cycle_pause,
                )),
                Err(err) => {
                    eprintln!("Worker {} failed to start and was dropped: {}", worker_id, err);
                }
            }
        }
        self.state = MonitorState::Running;

        // The sampling loop is not a worker; it runs on this context and
        // drives the overall termination clock.
        let mut snapshots = Vec::new();
        let stopwatch = Stopwatch::start();
        while stopwatch.elapsed() < self.config.duration {
            match self.sampler.sample() {
                Ok(snapshot) => {
                    if let Some(tx) = &progress_tx {
                        let _ = tx
                            .send(MonitorProgress {
                                elapsed: stopwatch.elapsed(),
                                snapshots_collected: snapshots.len() + 1,
                                cpu_percent: snapshot.cpu_percent,
                            })
                            .await;
                    }
                    snapshots.push(snapshot);
                }
                // A failed poll is dropped, never fatal for the window
                Err(err) => eprintln!("Dropped system snapshot: {}", err),
            }

            let remaining = self.config.duration.saturating_sub(stopwatch.elapsed());
            tokio::time::sleep(SAMPLE_INTERVAL.min(remaining)).await;
        }

        // Window elapsed: signal every worker once, then block until all of
        // them have observably stopped.
        running.store(false, Ordering::SeqCst);
        self.state = MonitorState::Stopped;

        let mut worker_metrics = BTreeMap::new();
        for handle in handles {
            let worker_id = handle.worker_id();
            match handle.join().await {
                Ok(samples) => {
                    worker_metrics.insert(worker_id, samples);
                }
                Err(err) => {
                    eprintln!("Worker {} dropped from monitor results: {}", worker_id, err);
                }
            }
        }

        // Every worker has joined; the sample set is frozen from here on.
        let performance_analysis = collector::aggregate(&worker_metrics, &snapshots);

        Ok(MonitorReport {
            monitoring_info: MonitoringInfo {
                duration_seconds: self.config.duration.as_secs(),
                worker_count: self.config.worker_count,
                start_time,
                end_time: Utc::now(),
                instance_info: self.instance.clone(),
            },
            system_metrics: snapshots,
            worker_metrics,
            performance_analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SystemSnapshot;
    use crate::workload::WorkloadKind;

    /// Scripted metrics source failing on selected ticks
    struct ScriptedSource {
        calls: usize,
        fail_on: Option<usize>,
    }

    impl ScriptedSource {
        fn new(fail_on: Option<usize>) -> Self {
            Self { calls: 0, fail_on }
        }
    }

    impl MetricsSource for ScriptedSource {
        fn sample(&mut self) -> crate::Result<SystemSnapshot> {
            self.calls += 1;
            if self.fail_on == Some(self.calls) {
                return Err(AccelBenchError::SamplerError(
                    "scripted failure".to_string(),
                ));
            }
            Ok(SystemSnapshot {
                timestamp: Utc::now(),
                cpu_percent: 50.0,
                memory_percent: 40.0,
                ..Default::default()
            })
        }
    }

    fn monitor_config() -> HarnessConfig {
        HarnessConfig::default()
            .with_duration(Duration::from_millis(1500))
            .with_worker_count(1)
            .with_workload(WorkloadKind::MultiplyAdd)
            .with_cycle_element_count(5_000)
            .with_cycle_pause(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_state_transitions_and_single_use() {
        let mut monitor =
            ThroughputMonitor::with_sampler(monitor_config(), ScriptedSource::new(None)).unwrap();
        assert_eq!(monitor.state(), MonitorState::Idle);

        let report = monitor.run(None).await.unwrap();
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert_eq!(report.monitoring_info.worker_count, 1);
        assert_eq!(report.worker_metrics.len(), 1);
        assert!(!report.worker_metrics[&0].is_empty());

        // A stopped monitor refuses to run again
        let err = monitor.run(None).await.unwrap_err();
        assert!(matches!(err, AccelBenchError::BenchmarkError(_)));
    }

    #[tokio::test]
    async fn test_failed_poll_is_dropped_not_fatal() {
        let config = monitor_config().with_duration(Duration::from_millis(2500));
        let mut monitor =
            ThroughputMonitor::with_sampler(config, ScriptedSource::new(Some(2))).unwrap();

        let report = monitor.run(None).await.unwrap();
        // Three ticks scheduled (t=0s, 1s, 2s); the second one was dropped
        assert_eq!(report.system_metrics.len(), 2);
        assert!(!report.worker_metrics.is_empty());
    }

    #[tokio::test]
    async fn test_analysis_computed_from_frozen_set() {
        let mut monitor =
            ThroughputMonitor::with_sampler(monitor_config(), ScriptedSource::new(None)).unwrap();
        let report = monitor.run(None).await.unwrap();

        let recomputed =
            collector::aggregate(&report.worker_metrics, &report.system_metrics);
        assert_eq!(report.performance_analysis, recomputed);
        assert_eq!(report.performance_analysis.system_performance.avg_cpu_percent, 50.0);
    }

    #[tokio::test]
    async fn test_progress_updates_are_emitted() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut monitor =
            ThroughputMonitor::with_sampler(monitor_config(), ScriptedSource::new(None)).unwrap();
        let report = monitor.run(Some(tx)).await.unwrap();

        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        assert_eq!(updates.len(), report.system_metrics.len());
        assert!(updates.iter().all(|u| u.cpu_percent == 50.0));
    }
}
