//! accelbench - Synthetic Accelerator Bench
//!
//! A benchmarking and continuous-monitoring harness for a fixed pool of
//! simulated accelerator devices. Workers burn CPU through named arithmetic
//! kernels and emit timed samples; a collector reduces those samples plus
//! host metrics snapshots into aggregatable JSON reports.

use std::fmt;

// Public re-exports
pub mod bench;
pub mod config;
pub mod metrics;
pub mod util;
pub mod workload;

// Common error types
#[derive(Debug)]
pub enum AccelBenchError {
    /// I/O operation failed
    IoError(std::io::Error),
    /// Configuration validation or parsing error
    ConfigError(String),
    /// Benchmark execution error
    BenchmarkError(String),
    /// Buffer allocation failed (resource exhaustion)
    AllocationError(String),
    /// Host metrics sampling failed
    SamplerError(String),
    /// Worker spawn or join error
    WorkerError(String),
    /// Report or config persistence error
    PersistenceError(String),
}

impl fmt::Display for AccelBenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccelBenchError::IoError(err) => write!(f, "I/O error: {}", err),
            AccelBenchError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AccelBenchError::BenchmarkError(msg) => write!(f, "Benchmark error: {}", msg),
            AccelBenchError::AllocationError(msg) => write!(f, "Allocation error: {}", msg),
            AccelBenchError::SamplerError(msg) => write!(f, "Sampler error: {}", msg),
            AccelBenchError::WorkerError(msg) => write!(f, "Worker error: {}", msg),
            AccelBenchError::PersistenceError(msg) => {
                write!(f, "Report persistence error: {}", msg)
            }
        }
    }
}

impl std::error::Error for AccelBenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AccelBenchError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AccelBenchError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::OutOfMemory => {
                AccelBenchError::AllocationError(format!("Out of memory: {}", err))
            }
            _ => AccelBenchError::IoError(err),
        }
    }
}

impl From<serde_json::Error> for AccelBenchError {
    fn from(err: serde_json::Error) -> Self {
        AccelBenchError::PersistenceError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for AccelBenchError {
    fn from(err: toml::de::Error) -> Self {
        AccelBenchError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for AccelBenchError {
    fn from(err: toml::ser::Error) -> Self {
        AccelBenchError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for accelbench operations
pub type Result<T> = std::result::Result<T, AccelBenchError>;

/// Error handling utilities
pub mod error {
    use super::AccelBenchError;

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &AccelBenchError) -> String {
        match error {
            AccelBenchError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            AccelBenchError::AllocationError(_) => {
                "Buffer allocation failed. Reduce the data or transfer size.".to_string()
            }
            AccelBenchError::SamplerError(_) => {
                "Host metrics sampling failed. The affected snapshot was dropped.".to_string()
            }
            AccelBenchError::PersistenceError(_) => {
                "Failed to save results. Check disk space and permissions.".to_string()
            }
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "accelbench";
pub const CONFIG_FILE: &str = "accelbench.toml";
pub const REPORTS_FILE: &str = "reports.json";
pub const MAX_REPORT_HISTORY: usize = 100;
