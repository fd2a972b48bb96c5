//! Report persistence module
//!
//! Handles saving, loading, and rotation of run reports, plus the standalone
//! pretty-printed report file the CLI emits after each run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{BenchmarkReport, MonitorReport};
use crate::{AccelBenchError, Result, APP_NAME, MAX_REPORT_HISTORY, REPORTS_FILE};

/// One persisted run, either mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportRecord {
    Benchmark(BenchmarkReport),
    Monitor(MonitorReport),
}

impl ReportRecord {
    /// When the recorded run started
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ReportRecord::Benchmark(report) => report.benchmark_info.timestamp,
            ReportRecord::Monitor(report) => report.monitoring_info.start_time,
        }
    }
}

/// Report history file structure for JSON persistence
#[derive(Debug, Serialize, Deserialize)]
struct ReportsFile {
    version: u32,
    reports: Vec<ReportRecord>,
}

impl Default for ReportsFile {
    fn default() -> Self {
        Self {
            version: 1,
            reports: Vec::new(),
        }
    }
}

/// Report history storage manager
#[derive(Debug)]
pub struct ReportStorage {
    reports_path: PathBuf,
}

impl ReportStorage {
    /// Create a new report storage manager
    pub fn new() -> Result<Self> {
        let reports_path = Self::reports_file_path()?;
        Ok(Self { reports_path })
    }

    /// Get the standard report history path
    /// Uses $DATA_HOME/accelbench/reports.json
    pub fn reports_file_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            AccelBenchError::PersistenceError("Unable to determine data directory".to_string())
        })?;

        Ok(data_dir.join(APP_NAME).join(REPORTS_FILE))
    }

    /// Load all reports from the history file
    pub fn load_reports(&self) -> Result<Vec<ReportRecord>> {
        if !self.reports_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.reports_path).map_err(|e| {
            AccelBenchError::PersistenceError(format!(
                "Failed to read reports file {}: {}",
                self.reports_path.display(),
                e
            ))
        })?;

        let reports_file: ReportsFile = serde_json::from_str(&content).map_err(|e| {
            AccelBenchError::PersistenceError(format!(
                "Failed to parse reports file {}: {}",
                self.reports_path.display(),
                e
            ))
        })?;

        Ok(reports_file.reports)
    }

    /// Append a new report to the history file.
    /// Automatically rotates old reports past MAX_REPORT_HISTORY entries.
    pub fn append_report(&self, report: ReportRecord) -> Result<()> {
        let mut reports = self.load_reports()?;

        reports.push(report);

        if reports.len() > MAX_REPORT_HISTORY {
            let skip_count = reports.len() - MAX_REPORT_HISTORY;
            reports = reports.into_iter().skip(skip_count).collect();
        }

        self.save_reports(reports)
    }

    /// Save all reports to the history file
    fn save_reports(&self, reports: Vec<ReportRecord>) -> Result<()> {
        if let Some(parent) = self.reports_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AccelBenchError::PersistenceError(format!(
                    "Failed to create reports directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let reports_file = ReportsFile {
            version: 1,
            reports,
        };

        let content = serde_json::to_string_pretty(&reports_file)?;

        fs::write(&self.reports_path, content).map_err(|e| {
            AccelBenchError::PersistenceError(format!(
                "Failed to write reports file {}: {}",
                self.reports_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the number of stored reports
    pub fn count_reports(&self) -> Result<usize> {
        let reports = self.load_reports()?;
        Ok(reports.len())
    }

    /// Clear all stored reports
    pub fn clear_reports(&self) -> Result<()> {
        if self.reports_path.exists() {
            fs::remove_file(&self.reports_path).map_err(|e| {
                AccelBenchError::PersistenceError(format!(
                    "Failed to remove reports file {}: {}",
                    self.reports_path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Get the most recent N reports, newest first
    pub fn get_recent_reports(&self, count: usize) -> Result<Vec<ReportRecord>> {
        let mut reports = self.load_reports()?;
        reports.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        reports.truncate(count);
        Ok(reports)
    }

    /// Get the history file path for external access
    pub fn get_reports_path(&self) -> &PathBuf {
        &self.reports_path
    }
}

/// Write one pretty-printed report to a standalone file
pub fn write_report_file<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                AccelBenchError::PersistenceError(format!(
                    "Failed to create report directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content).map_err(|e| {
        AccelBenchError::PersistenceError(format!(
            "Failed to write report file {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(())
}

/// Default timestamped filename for a standalone report
pub fn default_report_filename(prefix: &str) -> String {
    format!("{}_{}.json", prefix, Utc::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{
        InstanceInfo, MonitorReport, MonitoringInfo, PerformanceAnalysis, Sample, SystemSnapshot,
    };
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_monitor_report(marker: usize) -> ReportRecord {
        let mut worker_metrics = BTreeMap::new();
        worker_metrics.insert(
            0,
            vec![Sample::new(
                0,
                Utc::now(),
                Duration::from_millis(100),
                marker as u64,
            )],
        );

        ReportRecord::Monitor(MonitorReport {
            monitoring_info: MonitoringInfo {
                duration_seconds: 3,
                worker_count: 1,
                start_time: Utc::now(),
                end_time: Utc::now(),
                instance_info: InstanceInfo::detect(1),
            },
            system_metrics: vec![SystemSnapshot::default()],
            worker_metrics,
            performance_analysis: PerformanceAnalysis::default(),
        })
    }

    fn record_marker(record: &ReportRecord) -> u64 {
        match record {
            ReportRecord::Monitor(report) => report.worker_metrics[&0][0].operation_count,
            ReportRecord::Benchmark(_) => 0,
        }
    }

    #[test]
    fn test_report_storage_new() {
        let storage = ReportStorage::new();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_load_empty_reports() {
        let temp_dir = TempDir::new().unwrap();
        let reports_path = temp_dir.path().join("reports.json");

        let storage = ReportStorage { reports_path };
        let reports = storage.load_reports().unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_append_and_load_report() {
        let temp_dir = TempDir::new().unwrap();
        let reports_path = temp_dir.path().join("reports.json");

        let storage = ReportStorage { reports_path };
        storage.append_report(test_monitor_report(7)).unwrap();

        let reports = storage.load_reports().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(record_marker(&reports[0]), 7);
    }

    #[test]
    fn test_report_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let reports_path = temp_dir.path().join("reports.json");

        let storage = ReportStorage { reports_path };
        for i in 0..MAX_REPORT_HISTORY + 10 {
            storage.append_report(test_monitor_report(i)).unwrap();
        }

        let reports = storage.load_reports().unwrap();
        assert_eq!(reports.len(), MAX_REPORT_HISTORY);
        // The oldest 10 were rotated out
        assert_eq!(record_marker(&reports[0]), 10);
    }

    #[test]
    fn test_count_and_clear_reports() {
        let temp_dir = TempDir::new().unwrap();
        let reports_path = temp_dir.path().join("reports.json");

        let storage = ReportStorage { reports_path };
        assert_eq!(storage.count_reports().unwrap(), 0);

        for i in 0..3 {
            storage.append_report(test_monitor_report(i)).unwrap();
        }
        assert_eq!(storage.count_reports().unwrap(), 3);

        storage.clear_reports().unwrap();
        assert_eq!(storage.count_reports().unwrap(), 0);
    }

    #[test]
    fn test_reports_file_format_and_tags() {
        let temp_dir = TempDir::new().unwrap();
        let reports_path = temp_dir.path().join("reports.json");

        let storage = ReportStorage {
            reports_path: reports_path.clone(),
        };
        storage.append_report(test_monitor_report(1)).unwrap();

        let content = fs::read_to_string(&reports_path).unwrap();
        assert!(content.contains("\"kind\": \"monitor\""));

        let reports_file: ReportsFile = serde_json::from_str(&content).unwrap();
        assert_eq!(reports_file.version, 1);
        assert_eq!(reports_file.reports.len(), 1);
    }

    #[test]
    fn test_write_report_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("report.json");

        let record = test_monitor_report(5);
        write_report_file(&path, &record).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let back: ReportRecord = serde_json::from_str(&content).unwrap();
        assert_eq!(record_marker(&back), 5);
    }

    #[test]
    fn test_default_report_filename_shape() {
        let name = default_report_filename("accelbench_monitor");
        assert!(name.starts_with("accelbench_monitor_"));
        assert!(name.ends_with(".json"));
    }
}
