use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use accelbench::bench::{BenchmarkSuite, MonitorProgress, ThroughputMonitor};
use accelbench::config::persistence::{self, ReportRecord, ReportStorage};
use accelbench::config::HarnessConfig;
use accelbench::error::user_friendly_message;
use accelbench::util::units::{format_bytes, format_duration};
use accelbench::{AccelBenchError, Result};

fn print_usage() {
    println!("accelbench - synthetic accelerator throughput benchmark and monitor");
    println!();
    println!("Usage:");
    println!("  accelbench bench   [--workers N] [--data-size MB] [--transfer-size MB]");
    println!("                     [--workload NAME] [--output FILE]");
    println!("  accelbench monitor [--duration 60s] [--workers N] [--workload NAME]");
    println!("                     [--output FILE]");
    println!();
    println!("Workloads: multiply_add, vector_sum, bitwise_ops");
}

struct CliOptions {
    config: HarnessConfig,
    output: Option<PathBuf>,
    single_workload: Option<String>,
}

fn option_value<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index + 1)
        .map(|s| s.as_str())
        .ok_or_else(|| AccelBenchError::ConfigError(format!("Missing value for {}", name)))
}

fn parse_options(args: &[String]) -> Result<CliOptions> {
    let mut config = HarnessConfig::load()?;
    let mut output = None;
    let mut single_workload = None;

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--duration" => {
                let raw = option_value(args, index, "--duration")?;
                config.duration = humantime::parse_duration(raw).map_err(|e| {
                    AccelBenchError::ConfigError(format!("Invalid duration {}: {}", raw, e))
                })?;
                index += 2;
            }
            "--workers" => {
                let raw = option_value(args, index, "--workers")?;
                config.worker_count = raw.parse().map_err(|e| {
                    AccelBenchError::ConfigError(format!("Invalid worker count {}: {}", raw, e))
                })?;
                index += 2;
            }
            "--data-size" => {
                let raw = option_value(args, index, "--data-size")?;
                config.data_size_mb = raw.parse().map_err(|e| {
                    AccelBenchError::ConfigError(format!("Invalid data size {}: {}", raw, e))
                })?;
                index += 2;
            }
            "--transfer-size" => {
                let raw = option_value(args, index, "--transfer-size")?;
                config.transfer_size_mb = raw.parse().map_err(|e| {
                    AccelBenchError::ConfigError(format!("Invalid transfer size {}: {}", raw, e))
                })?;
                index += 2;
            }
            "--workload" => {
                let raw = option_value(args, index, "--workload")?;
                // Validate eagerly so an unknown name fails before any work
                config.workload = raw.parse()?;
                single_workload = Some(raw.to_string());
                index += 2;
            }
            "--output" => {
                output = Some(PathBuf::from(option_value(args, index, "--output")?));
                index += 2;
            }
            other => {
                return Err(AccelBenchError::ConfigError(format!(
                    "Unknown option: {}",
                    other
                )));
            }
        }
    }

    Ok(CliOptions {
        config,
        output,
        single_workload,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first() {
        Some(command) => command.as_str(),
        None => {
            print_usage();
            return Ok(());
        }
    };

    let outcome = match command {
        "bench" => run_bench(&args[1..]).await,
        "monitor" => run_monitor(&args[1..]).await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            Err(AccelBenchError::ConfigError(format!(
                "Unknown command: {}",
                other
            )))
        }
    };

    if let Err(err) = &outcome {
        eprintln!("{}", user_friendly_message(err));
    }
    outcome
}

async fn run_bench(args: &[String]) -> Result<()> {
    let options = parse_options(args)?;
    let suite = BenchmarkSuite::new(options.config.clone())?;

    println!("accelbench benchmark suite");
    println!("==========================");
    let info = suite.instance_info();
    println!(
        "Host: {} - {} CPUs - {:.1} GiB memory - {} workers",
        info.instance_label, info.cpu_count, info.memory_gb, info.worker_count
    );
    println!(
        "Buffers: data {} - transfer {}",
        format_bytes((options.config.data_size_mb * 1024 * 1024) as u64),
        format_bytes((options.config.transfer_size_mb * 1024 * 1024) as u64),
    );
    println!();

    // A named workload runs just that ops/sec test
    if let Some(name) = &options.single_workload {
        let result = suite.test_operations_per_second_named(name)?;
        println!(
            "{}: {} operations in {:.4}s - {:.2} MOPS",
            result.operation_type,
            result.total_operations,
            result.elapsed_time_sec,
            result.mega_ops_per_second
        );
        if let Some(path) = &options.output {
            persistence::write_report_file(path, &result)?;
            println!("Results saved to {}", path.display());
        }
        return Ok(());
    }

    let report = suite.run_full().await;

    println!();
    println!("Benchmark summary");
    println!("=================");
    let summary = &report.performance_summary;
    println!(
        "Peak memory bandwidth:   {:.2} GB/s",
        summary.peak_memory_bandwidth_gbps
    );
    println!(
        "Peak transfer throughput: {:.2} GB/s",
        summary.peak_transfer_throughput_gbps
    );
    println!("Peak operations/sec:     {:.0}", summary.peak_ops_per_second);
    println!(
        "Aggregate parallel GOPS: {:.4}",
        summary.aggregate_parallel_gops
    );
    let failed = report.failed_section_count();
    if failed > 0 {
        eprintln!("{} section(s) failed; see report for causes", failed);
    }

    let path = options
        .output
        .unwrap_or_else(|| PathBuf::from(persistence::default_report_filename("accelbench_benchmark")));
    persistence::write_report_file(&path, &report)?;
    println!("Results saved to {}", path.display());

    append_history(ReportRecord::Benchmark(report));
    Ok(())
}

async fn run_monitor(args: &[String]) -> Result<()> {
    let options = parse_options(args)?;
    let config = options.config.clone();
    let mut monitor = ThroughputMonitor::new(config.clone())?;

    println!("accelbench throughput monitor");
    println!("=============================");
    println!(
        "Monitoring {} workers ({}) for {}",
        config.worker_count,
        config.workload,
        format_duration(config.duration)
    );
    println!();

    let progress = ProgressBar::new(config.duration.as_secs());
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len}s {msg}")
    {
        progress.set_style(style);
    }

    let (tx, mut rx) = mpsc::channel::<MonitorProgress>(16);
    let bar = progress.clone();
    let display = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            bar.set_position(update.elapsed.as_secs());
            bar.set_message(format!("CPU {:.1}%", update.cpu_percent));
        }
    });

    let report = monitor.run(Some(tx)).await?;
    let _ = display.await;
    progress.finish_and_clear();

    println!("Monitoring complete!");
    println!("====================");
    let analysis = &report.performance_analysis;
    println!(
        "Average CPU usage:    {:.1}%",
        analysis.system_performance.avg_cpu_percent
    );
    println!(
        "Average memory usage: {:.1}%",
        analysis.system_performance.avg_memory_percent
    );
    println!(
        "Aggregate ops/sec:    {:.0}",
        analysis.worker_performance.total_aggregate_ops_per_second
    );
    println!(
        "Aggregate GOPS:       {:.4}",
        analysis.worker_performance.total_aggregate_gops_per_second
    );
    println!(
        "Average per worker:   {:.0} ops/sec",
        analysis.worker_performance.avg_ops_per_worker
    );
    println!(
        "Ops per CPU percent:  {:.0}",
        analysis.efficiency_metrics.ops_per_cpu_percent
    );
    println!(
        "Utilization score:    {:.1}%",
        analysis.efficiency_metrics.system_utilization_score
    );

    let path = options
        .output
        .unwrap_or_else(|| PathBuf::from(persistence::default_report_filename("accelbench_monitor")));
    persistence::write_report_file(&path, &report)?;
    println!("Results saved to {}", path.display());

    append_history(ReportRecord::Monitor(report));
    Ok(())
}

/// History persistence is best-effort; a failure never fails the run
fn append_history(record: ReportRecord) {
    match ReportStorage::new() {
        Ok(storage) => {
            if let Err(err) = storage.append_report(record) {
                eprintln!("Could not update report history: {}", err);
            }
        }
        Err(err) => eprintln!("Could not open report history: {}", err),
    }
}
