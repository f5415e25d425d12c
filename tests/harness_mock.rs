/// Harness Tests Against a Recording Device
///
/// The mock reduction kernel writes `lane_index / lane_count` into every
/// bound lane, so aggregates are known in closed form.

use std::cell::{Cell, RefCell};
use std::io::Write;

use gpu_randomness::gpu::{ComputeDevice, Dispatch, Kernel};
use gpu_randomness::harness::{self, CollectingSink, SampleBudget};
use gpu_randomness::error::api_error;
use gpu_randomness::{
    ApiStatus, BenchConfig, GeneratorVariant, HarnessError, HarnessResult, MomentOrder, OutputBuffer, Sections,
    Statistic,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Bind { kernel: Kernel },
    Dispatch { kernel: Kernel, args: Vec<u32>, lanes: u32 },
    Finish,
    ReadBack { len: usize },
}

struct MockOutput {
    cells: RefCell<Vec<f32>>,
    lanes: u32,
}

struct MockDevice {
    moment_lanes: u32,
    correlation_lanes: u32,
    calls: RefCell<Vec<Call>>,
    read_backs: Cell<usize>,
    fail_read_back_at: Option<usize>,
}

impl MockDevice {
    fn new(moment_lanes: u32, correlation_lanes: u32) -> Self {
        Self {
            moment_lanes,
            correlation_lanes,
            calls: RefCell::new(Vec::new()),
            read_backs: Cell::new(0),
            fail_read_back_at: None,
        }
    }

    fn dispatches(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Dispatch { .. }))
            .cloned()
            .collect()
    }

    fn fill_lanes(output: &MockOutput) {
        let mut cells = output.cells.borrow_mut();
        let lanes = output.lanes as usize;
        for (i, cell) in cells[..lanes].iter_mut().enumerate() {
            *cell = i as f32 / lanes as f32;
        }
    }
}

impl ComputeDevice for MockDevice {
    type Output = MockOutput;

    fn max_lanes(&self, kernel: Kernel) -> HarnessResult<u32> {
        Ok(match kernel {
            Kernel::Throughput => 1,
            Kernel::Moment => self.moment_lanes,
            Kernel::Correlation => self.correlation_lanes,
        })
    }

    fn create_output(&self, lanes: u32, capacity: u32) -> HarnessResult<MockOutput> {
        // Device padding starts poisoned; it must never be read back
        let mut cells = vec![f32::NAN; capacity as usize];
        cells[..lanes as usize].fill(0.0);
        Ok(MockOutput {
            cells: RefCell::new(cells),
            lanes,
        })
    }

    fn bind(&self, dispatch: &Dispatch<'_, MockOutput>) -> HarnessResult<()> {
        self.calls.borrow_mut().push(Call::Bind {
            kernel: dispatch.kernel(),
        });
        Ok(())
    }

    fn enqueue(&self, dispatch: &Dispatch<'_, MockOutput>) -> HarnessResult<()> {
        let kernel = dispatch.kernel();
        let lanes = dispatch.global_size();
        let args = match *dispatch {
            Dispatch::Throughput { mode, sample_count } => vec![mode, sample_count],
            Dispatch::Moment {
                output,
                order,
                mode,
                samples_per_lane,
                ..
            } => {
                Self::fill_lanes(output);
                vec![order, mode, samples_per_lane]
            }
            Dispatch::Correlation {
                output,
                mode,
                samples_per_lane,
                ..
            } => {
                Self::fill_lanes(output);
                vec![mode, samples_per_lane]
            }
        };
        self.calls.borrow_mut().push(Call::Dispatch { kernel, args, lanes });
        Ok(())
    }

    fn finish(&self) -> HarnessResult<()> {
        self.calls.borrow_mut().push(Call::Finish);
        Ok(())
    }

    fn read_back(&self, output: &MockOutput, dst: &mut [f32]) -> HarnessResult<()> {
        let count = self.read_backs.get();
        self.read_backs.set(count + 1);
        if Some(count) == self.fail_read_back_at {
            return Err(api_error("enqueue read buffer", ApiStatus::BufferMap, "mock failure"));
        }

        self.calls.borrow_mut().push(Call::ReadBack { len: dst.len() });
        dst.copy_from_slice(&output.cells.borrow()[..dst.len()]);
        Ok(())
    }
}

fn kernel_source_file(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(source.as_bytes()).expect("write source");
    file
}

const KERNELS: &str = include_str!("../kernels/randomness.wgsl");

#[test]
fn test_lane_count_is_smaller_kernel_capacity() {
    let device = MockDevice::new(256, 192);
    let output = OutputBuffer::allocate(&device).expect("allocate");
    assert_eq!(output.lane_count(), 192);
    assert_eq!(output.padded_capacity(), 192);

    let device = MockDevice::new(100, 128);
    let output = OutputBuffer::allocate(&device).expect("allocate");
    assert_eq!(output.lane_count(), 100);
    assert_eq!(output.padded_capacity(), 128);
    assert_eq!(output.cells().len(), 128);
    assert_eq!(output.cells().as_ptr() as usize % 4096, 0);
}

#[test]
fn test_zero_lane_capacity_is_rejected() {
    let device = MockDevice::new(0, 256);
    let error = OutputBuffer::allocate(&device).unwrap_err();
    assert!(matches!(
        error,
        HarnessError::Api {
            status: ApiStatus::InvalidWorkSize,
            ..
        }
    ));
}

#[test]
fn test_moment_dispatch_order_and_arguments() {
    let device = MockDevice::new(256, 256);
    let mut output = OutputBuffer::allocate(&device).expect("allocate");
    let mut sink = CollectingSink::default();

    let records = harness::run_moments(&device, &mut output, 1954, &mut sink).expect("moments");

    let expected: Vec<Call> = GeneratorVariant::ALL
        .iter()
        .flat_map(|v| {
            MomentOrder::ALL.iter().map(move |m| Call::Dispatch {
                kernel: Kernel::Moment,
                args: vec![m.ordinal(), v.mode(), 1954],
                lanes: 256,
            })
        })
        .collect();
    assert_eq!(device.dispatches(), expected);

    // Every dispatch drains and reads back before the next one is bound
    let calls = device.calls.borrow();
    assert_eq!(calls.len(), 9 * 4);
    for chunk in calls.chunks(4) {
        assert_eq!(chunk[0], Call::Bind { kernel: Kernel::Moment });
        assert!(matches!(chunk[1], Call::Dispatch { .. }));
        assert_eq!(chunk[2], Call::Finish);
        assert_eq!(chunk[3], Call::ReadBack { len: 256 });
    }

    assert_eq!(records.len(), 9);
    assert_eq!(records[0].variant, GeneratorVariant::HexagonalMarsagliaPolar);
    assert_eq!(records[0].statistic, Statistic::Moment(MomentOrder::Mean));
    assert_eq!(records[8].variant, GeneratorVariant::BoxMuller);
    assert_eq!(records[8].statistic, Statistic::Moment(MomentOrder::Skewness));
    assert_eq!(sink.results.len(), 9);
    assert_eq!(sink.section_breaks, 3);
}

#[test]
fn test_synthetic_fill_mean_is_one_half() {
    let device = MockDevice::new(256, 256);
    let mut output = OutputBuffer::allocate(&device).expect("allocate");
    let samples_per_lane = SampleBudget::new(500_000).samples_per_lane(output.lane_count());
    assert_eq!(samples_per_lane, 1954);

    let mut sink = CollectingSink::default();
    let records = harness::run_moments(&device, &mut output, samples_per_lane, &mut sink).expect("moments");

    let tolerance = 1.0 / output.lane_count() as f32;
    for record in records {
        assert!((record.value - 0.5).abs() <= tolerance, "{} not close to 0.5", record);
    }
}

#[test]
fn test_host_padding_never_reaches_results() {
    let device = MockDevice::new(100, 100);
    let mut output = OutputBuffer::allocate(&device).expect("allocate");
    assert_eq!(output.padded_capacity(), 128);
    output.cells_mut()[100..].fill(f32::NAN);

    let mut sink = CollectingSink::default();
    let records = harness::run_correlation(&device, &mut output, 10, &mut sink).expect("correlation");

    assert_eq!(records.len(), 3);
    for record in &records {
        assert!(record.value.is_finite());
        assert_eq!(record.statistic, Statistic::Correlation);
    }
    assert!(output.cells()[100..].iter().all(|c| c.is_nan()));
}

#[test]
fn test_correlation_dispatches_one_per_variant() {
    let device = MockDevice::new(64, 64);
    let mut output = OutputBuffer::allocate(&device).expect("allocate");
    let mut sink = CollectingSink::default();

    harness::run_correlation(&device, &mut output, 7813, &mut sink).expect("correlation");

    let expected: Vec<Call> = GeneratorVariant::ALL
        .iter()
        .map(|v| Call::Dispatch {
            kernel: Kernel::Correlation,
            args: vec![v.mode(), 7813],
            lanes: 64,
        })
        .collect();
    assert_eq!(device.dispatches(), expected);
    assert_eq!(sink.section_breaks, 1);
}

#[test]
fn test_timing_uses_single_lane_and_full_budget() {
    let device = MockDevice::new(256, 256);
    let mut sink = CollectingSink::default();

    let records = harness::run_timing(&device, &SampleBudget::default(), &mut sink).expect("timing");

    assert_eq!(records.len(), 3);
    let dispatches = device.dispatches();
    for (call, variant) in dispatches.iter().zip(GeneratorVariant::ALL) {
        assert_eq!(
            call,
            &Call::Dispatch {
                kernel: Kernel::Throughput,
                args: vec![variant.mode(), 500_000],
                lanes: 1,
            }
        );
    }
    assert_eq!(sink.timings.iter().map(|t| t.variant).collect::<Vec<_>>(), GeneratorVariant::ALL);

    // Arguments are bound ahead of the timed enqueue and drain
    let calls = device.calls.borrow();
    for chunk in calls.chunks(3) {
        assert_eq!(chunk[0], Call::Bind { kernel: Kernel::Throughput });
        assert!(matches!(chunk[1], Call::Dispatch { kernel: Kernel::Throughput, .. }));
        assert_eq!(chunk[2], Call::Finish);
    }
}

#[test]
fn test_failed_read_back_stops_the_harness() {
    let mut device = MockDevice::new(128, 128);
    device.fail_read_back_at = Some(1);
    let mut output = OutputBuffer::allocate(&device).expect("allocate");
    let mut sink = CollectingSink::default();

    let error = harness::run_moments(&device, &mut output, 10, &mut sink).unwrap_err();

    assert!(matches!(error, HarnessError::Api { status: ApiStatus::BufferMap, .. }));
    assert_eq!(device.dispatches().len(), 2);
    assert_eq!(sink.results.len(), 1);
}

#[test]
fn test_run_executes_every_section() {
    let file = kernel_source_file(KERNELS);
    let config = BenchConfig::default()
        .with_kernel_path(file.path())
        .with_sections(Sections::ALL);
    let mut sink = CollectingSink::default();

    harness::run(&config, |_| Ok(MockDevice::new(256, 128)), &mut sink).expect("run");

    assert_eq!(sink.timings.len(), 3);
    assert_eq!(sink.results.len(), 12);
    // timing block, one block per variant of moments, correlation block
    assert_eq!(sink.section_breaks, 5);
    assert!(sink.results[9..].iter().all(|r| r.statistic == Statistic::Correlation));
}

#[test]
fn test_missing_source_never_connects() {
    let connected = Cell::new(false);
    let config = BenchConfig::default().with_kernel_path("does/not/exist/randomness.wgsl");
    let mut sink = CollectingSink::default();

    let error = harness::run(
        &config,
        |_| {
            connected.set(true);
            Ok(MockDevice::new(256, 256))
        },
        &mut sink,
    )
    .unwrap_err();

    assert!(matches!(error, HarnessError::SourceLoad { .. }));
    assert!(!connected.get());
    assert!(sink.timings.is_empty() && sink.results.is_empty());
}

#[test]
fn test_malformed_source_never_connects() {
    let file = kernel_source_file("@compute @workgroup_size(1)\nfn speed_test( {\n");
    let connected = Cell::new(false);
    let config = BenchConfig::default().with_kernel_path(file.path());
    let mut sink = CollectingSink::default();

    let error = harness::run(
        &config,
        |_| {
            connected.set(true);
            Ok(MockDevice::new(256, 256))
        },
        &mut sink,
    )
    .unwrap_err();

    match error {
        HarnessError::Build { log } => assert!(!log.is_empty()),
        other => panic!("expected build error, got {:?}", other),
    }
    assert!(!connected.get());
}
