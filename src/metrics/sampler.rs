//! Host resource metrics sampling
//!
//! Defines the injected metrics-source seam used by the monitor orchestrator
//! and its sysinfo-backed implementation. A sample call must not block longer
//! than the poll interval; failed polls are dropped by the caller.

use chrono::Utc;
use sysinfo::{Networks, System};

use crate::metrics::SystemSnapshot;
use crate::util::units::round_to;
use crate::Result;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Point-in-time host metrics source.
///
/// Implemented by [`SystemSampler`] for real hosts; tests substitute scripted
/// sources through this trait.
pub trait MetricsSource {
    /// Take one snapshot of current host resource usage
    fn sample(&mut self) -> Result<SystemSnapshot>;
}

/// Host metrics sampler backed by `sysinfo`.
///
/// CPU usage is computed from the delta between consecutive refreshes, so the
/// first snapshot after construction may report 0%. Whole-system disk byte
/// counters have no portable source and stay at 0.
pub struct SystemSampler {
    sys: System,
    networks: Networks,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        // Prime the CPU counters so the first polled delta is meaningful
        sys.refresh_cpu_all();
        sys.refresh_memory();

        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for SystemSampler {
    fn sample(&mut self) -> Result<SystemSnapshot> {
        self.sys.refresh_cpu_all();
        self.sys.refresh_memory();
        self.networks.refresh();

        let total_memory = self.sys.total_memory();
        let available_memory = self.sys.available_memory();
        let memory_percent = if total_memory > 0 {
            (total_memory.saturating_sub(available_memory)) as f64 / total_memory as f64 * 100.0
        } else {
            0.0
        };

        let (sent, recv) = self
            .networks
            .iter()
            .fold((0u64, 0u64), |(sent, recv), (_, data)| {
                (
                    sent.saturating_add(data.total_transmitted()),
                    recv.saturating_add(data.total_received()),
                )
            });

        Ok(SystemSnapshot {
            timestamp: Utc::now(),
            cpu_percent: round_to(self.sys.global_cpu_usage() as f64, 2),
            memory_percent: round_to(memory_percent, 2),
            memory_available_gb: round_to(available_memory as f64 / BYTES_PER_GB, 2),
            disk_io_read_mb: 0.0,
            disk_io_write_mb: 0.0,
            network_sent_mb: round_to(sent as f64 / BYTES_PER_MB, 2),
            network_recv_mb: round_to(recv as f64 / BYTES_PER_MB, 2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_returns_values_in_range() {
        let mut sampler = SystemSampler::new();
        let snapshot = sampler.sample().expect("sample failed");

        assert!(snapshot.cpu_percent >= 0.0);
        assert!(snapshot.memory_percent >= 0.0 && snapshot.memory_percent <= 100.0);
        assert!(snapshot.memory_available_gb >= 0.0);
        assert!(snapshot.network_sent_mb >= 0.0);
        assert!(snapshot.network_recv_mb >= 0.0);
    }

    #[test]
    fn consecutive_samples_are_time_ordered() {
        let mut sampler = SystemSampler::new();
        let first = sampler.sample().expect("sample failed");
        let second = sampler.sample().expect("sample failed");
        assert!(second.timestamp >= first.timestamp);
    }
}
