use std::time::Duration;

use accelbench::bench::BenchmarkSuite;
use accelbench::config::persistence::write_report_file;
use accelbench::config::HarnessConfig;
use accelbench::metrics::BenchmarkReport;
use accelbench::workload::WorkloadKind;
use accelbench::AccelBenchError;

fn small_config() -> HarnessConfig {
    HarnessConfig::default()
        .with_worker_count(2)
        .with_data_size_mb(2)
        .with_transfer_size_mb(2)
        .with_ops_scale(20_000, 10)
        .with_trial_scale(20_000, 5)
}

#[tokio::test]
async fn full_suite_produces_complete_report() {
    let suite = BenchmarkSuite::new(small_config()).expect("suite create");
    let report = suite.run_full().await;

    assert_eq!(report.failed_section_count(), 0);

    let memory = report.memory_bandwidth.completed().expect("memory section");
    assert_eq!(memory.data_size_mb, 2);
    assert!(memory.read_bandwidth_gbps > 0.0);
    assert!(memory.write_bandwidth_gbps > 0.0);

    let transfer = report
        .transfer_simulation
        .completed()
        .expect("transfer section");
    assert!(transfer.single_transfer_gbps > 0.0);
    assert!(transfer.multi_transfer_gbps > 0.0);

    // One ops entry per workload kind, each with an exact operation total
    assert_eq!(report.operations_per_second.len(), 3);
    for kind in WorkloadKind::ALL {
        let result = report.operations_per_second[kind.name()]
            .completed()
            .expect("ops section");
        assert_eq!(
            result.total_operations,
            20_000 * 10 * kind.ops_per_element()
        );
    }

    let parallel = report
        .parallel_simulation
        .completed()
        .expect("parallel section");
    assert_eq!(parallel.worker_count, 2);
    assert_eq!(
        parallel.total_operations,
        2 * 5 * 20_000 * WorkloadKind::MultiplyAdd.ops_per_element()
    );
    assert_eq!(parallel.individual_worker_results.len(), 2);

    assert!(report.performance_summary.peak_ops_per_second > 0.0);
    assert!(report.benchmark_info.instance_info.cpu_count > 0);
}

#[tokio::test]
async fn report_round_trips_through_persisted_json() {
    let suite = BenchmarkSuite::new(small_config()).expect("suite create");
    let report = suite.run_full().await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("benchmark_report.json");
    write_report_file(&path, &report).expect("write report");

    let content = std::fs::read_to_string(&path).expect("read report");
    assert!(content.contains("\"benchmark_info\""));
    assert!(content.contains("\"memory_bandwidth\""));
    assert!(content.contains("\"transfer_simulation\""));
    assert!(content.contains("\"operations_per_second\""));
    assert!(content.contains("\"parallel_simulation\""));
    assert!(content.contains("\"performance_summary\""));

    let back: BenchmarkReport = serde_json::from_str(&content).expect("parse report");
    assert_eq!(back.failed_section_count(), 0);
    assert_eq!(
        back.performance_summary.peak_ops_per_second,
        report.performance_summary.peak_ops_per_second
    );
}

#[tokio::test]
async fn unknown_workload_fails_without_blocking_other_sections() {
    let suite = BenchmarkSuite::new(small_config()).expect("suite create");

    let err = suite
        .test_operations_per_second_named("matrix_invert")
        .expect_err("unknown workload must fail");
    assert!(matches!(err, AccelBenchError::ConfigError(_)));

    // The failure is isolated: the suite still runs everything else
    let report = suite.run_full().await;
    assert_eq!(report.failed_section_count(), 0);
}

#[tokio::test]
async fn invalid_configuration_is_rejected_at_construction() {
    let err = BenchmarkSuite::new(HarnessConfig::default().with_worker_count(0))
        .expect_err("zero workers must be rejected");
    assert!(matches!(err, AccelBenchError::ConfigError(_)));

    let err = BenchmarkSuite::new(
        HarnessConfig::default().with_duration(Duration::ZERO),
    )
    .expect_err("zero duration must be rejected");
    assert!(matches!(err, AccelBenchError::ConfigError(_)));
}

// Default-scale operation totals. Expensive (hundreds of millions of
// operations), so it only runs with --ignored.
#[tokio::test]
#[ignore]
async fn default_scale_operation_totals() {
    let config = HarnessConfig::default().with_data_size_mb(64).with_transfer_size_mb(64);
    let suite = BenchmarkSuite::new(config).expect("suite create");

    // 1,048,576 elements x 100 iterations x 2 ops per element
    let ops = suite
        .test_operations_per_second(WorkloadKind::MultiplyAdd)
        .expect("ops test");
    assert_eq!(ops.total_operations, 209_715_200);

    // 8 workers x 50 trials x 524,288 elements x 2 ops per element
    let parallel = suite.test_parallel_workers().await.expect("parallel test");
    assert_eq!(parallel.total_operations, 419_430_400);

    // Aggregate rate equals total operations over wall time, within tolerance
    let expected_rate = parallel.total_operations as f64 / parallel.total_time_sec;
    let deviation = (parallel.aggregate_ops_per_second - expected_rate).abs() / expected_rate;
    assert!(deviation < 0.05, "rate deviation too high: {}", deviation);
}
