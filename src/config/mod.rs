//! Configuration management module
//!
//! Handles loading, saving, and validation of the harness configuration.
//! Orchestrators receive an explicit config object at construction; nothing
//! is read from the ambient environment mid-run.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bench::worker::DEFAULT_CYCLE_PAUSE;
use crate::workload::WorkloadKind;
use crate::{AccelBenchError, Result, APP_NAME, CONFIG_FILE};

pub mod persistence;

/// Harness configuration covering both benchmark and monitor modes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Monitoring window length
    pub duration: Duration,
    /// Number of simulated accelerator workers
    pub worker_count: usize,
    /// Buffer size for the memory throughput test (MiB)
    pub data_size_mb: usize,
    /// Buffer size for the transfer simulation test (MiB)
    pub transfer_size_mb: usize,
    /// Workload kernel run by monitor-mode workers
    pub workload: WorkloadKind,
    /// Elements per pass in the operations-per-second test
    pub ops_element_count: usize,
    /// Kernel passes in the operations-per-second test
    pub ops_iterations: usize,
    /// Elements per trial in the parallel test
    pub trial_element_count: usize,
    /// Trials per worker in the parallel test
    pub trials_per_worker: usize,
    /// Elements per cycle in monitor mode
    pub cycle_element_count: usize,
    /// Pause between monitor-mode cycles
    pub cycle_pause: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(60),
            worker_count: 8,
            data_size_mb: 1024,
            transfer_size_mb: 512,
            workload: WorkloadKind::MultiplyAdd,
            ops_element_count: 1024 * 1024,
            ops_iterations: 100,
            trial_element_count: 512 * 1024,
            trials_per_worker: 50,
            cycle_element_count: 100_000,
            cycle_pause: DEFAULT_CYCLE_PAUSE,
        }
    }
}

impl HarnessConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.duration.is_zero() {
            return Err(AccelBenchError::ConfigError(
                "Duration must be greater than 0".to_string(),
            ));
        }

        const MAX_DURATION: Duration = Duration::from_secs(3600); // 1 hour
        if self.duration > MAX_DURATION {
            return Err(AccelBenchError::ConfigError(format!(
                "Duration too long: {}s (max: {}s)",
                self.duration.as_secs(),
                MAX_DURATION.as_secs()
            )));
        }

        if self.worker_count == 0 {
            return Err(AccelBenchError::ConfigError(
                "Worker count must be greater than 0".to_string(),
            ));
        }

        const MAX_WORKERS: usize = 64;
        if self.worker_count > MAX_WORKERS {
            return Err(AccelBenchError::ConfigError(format!(
                "Too many workers: {} (max: {})",
                self.worker_count, MAX_WORKERS
            )));
        }

        if self.data_size_mb == 0 || self.transfer_size_mb == 0 {
            return Err(AccelBenchError::ConfigError(
                "Buffer sizes must be greater than 0".to_string(),
            ));
        }

        const MAX_BUFFER_MB: usize = 16 * 1024; // 16 GiB
        if self.data_size_mb > MAX_BUFFER_MB || self.transfer_size_mb > MAX_BUFFER_MB {
            return Err(AccelBenchError::ConfigError(format!(
                "Buffer size too large (max: {} MiB)",
                MAX_BUFFER_MB
            )));
        }

        if self.ops_element_count == 0
            || self.trial_element_count == 0
            || self.cycle_element_count == 0
        {
            return Err(AccelBenchError::ConfigError(
                "Element counts must be greater than 0".to_string(),
            ));
        }

        if self.ops_iterations == 0 || self.trials_per_worker == 0 {
            return Err(AccelBenchError::ConfigError(
                "Iteration counts must be greater than 0".to_string(),
            ));
        }

        const MAX_CYCLE_PAUSE: Duration = Duration::from_secs(10);
        if self.cycle_pause > MAX_CYCLE_PAUSE {
            return Err(AccelBenchError::ConfigError(format!(
                "Cycle pause too long (max: {}s)",
                MAX_CYCLE_PAUSE.as_secs()
            )));
        }

        Ok(())
    }

    /// Set the monitoring window length
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the number of workers
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the memory test buffer size in MiB
    pub fn with_data_size_mb(mut self, size_mb: usize) -> Self {
        self.data_size_mb = size_mb;
        self
    }

    /// Set the transfer test buffer size in MiB
    pub fn with_transfer_size_mb(mut self, size_mb: usize) -> Self {
        self.transfer_size_mb = size_mb;
        self
    }

    /// Set the monitor-mode workload kernel
    pub fn with_workload(mut self, workload: WorkloadKind) -> Self {
        self.workload = workload;
        self
    }

    /// Set the operations-per-second test scale
    pub fn with_ops_scale(mut self, element_count: usize, iterations: usize) -> Self {
        self.ops_element_count = element_count;
        self.ops_iterations = iterations;
        self
    }

    /// Set the parallel test scale
    pub fn with_trial_scale(mut self, element_count: usize, trials: usize) -> Self {
        self.trial_element_count = element_count;
        self.trials_per_worker = trials;
        self
    }

    /// Set the monitor-mode per-cycle element count
    pub fn with_cycle_element_count(mut self, element_count: usize) -> Self {
        self.cycle_element_count = element_count;
        self
    }

    /// Set the pause between monitor-mode cycles
    pub fn with_cycle_pause(mut self, pause: Duration) -> Self {
        self.cycle_pause = pause;
        self
    }

    /// Load configuration from the standard config file location.
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            AccelBenchError::ConfigError(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            AccelBenchError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the standard config file location
    pub fn save(&self) -> Result<()> {
        self.validate()?;

        let config_path = Self::config_file_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AccelBenchError::ConfigError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            AccelBenchError::ConfigError(format!("Failed to serialize configuration: {}", e))
        })?;

        fs::write(&config_path, content).map_err(|e| {
            AccelBenchError::ConfigError(format!(
                "Failed to write config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/accelbench/accelbench.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            AccelBenchError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
