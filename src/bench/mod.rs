//! Benchmark engine module
//!
//! Contains the worker execution core, sample aggregation, and the
//! one-shot benchmark and continuous monitor orchestrators.

pub mod collector;
pub mod monitor;
pub mod suite;
pub mod worker;

// Re-export commonly used types
pub use collector::aggregate;
pub use monitor::{MonitorProgress, MonitorState, ThroughputMonitor};
pub use suite::BenchmarkSuite;
pub use worker::{Worker, WorkerHandle, DEFAULT_CYCLE_PAUSE};
