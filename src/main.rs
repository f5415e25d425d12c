/// Gaussian generator benchmark
///
/// Times each generator variant on one lane, then prints the mean, variance,
/// skewness and serial correlation reduced across the device's lanes.

use anyhow::Context;
use gpu_randomness::{BenchConfig, GpuContext, ReportSink, ResultRecord, TimingRecord, WgpuDevice};

/// Prints records to stdout as they arrive
struct StdoutReport;

impl ReportSink for StdoutReport {
    fn timing(&mut self, record: &TimingRecord) {
        println!("{}", record);
    }

    fn result(&mut self, record: &ResultRecord) {
        println!("{}", record);
    }

    fn section_break(&mut self) {
        println!();
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        log::error!("Harness aborted: {}", e);
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut config = BenchConfig::default();
    if let Some(path) = std::env::args_os().nth(1) {
        config = config.with_kernel_path(path);
    }

    let mut report = StdoutReport;
    gpu_randomness::run(
        &config,
        |program| {
            let context = GpuContext::acquire()?;
            WgpuDevice::new(context, program, rand::random())
        },
        &mut report,
    )
    .with_context(|| format!("randomness harness failed for {}", config.kernel_path.display()))
}
