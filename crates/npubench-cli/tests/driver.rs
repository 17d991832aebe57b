use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, ensure, Result};
use image::{Rgb, RgbImage};
use npubench::sessions::{load_accelerator, AcceleratorSession};
use npubench::{run, RunConfig};
use npubench_core::{
    Backend, BackendModel, DType, ExecutionTarget, IOName, ModelArtifact, ModelSpec, QnnOptions,
    Shape, Tensor, TensorSpec,
};

const SCORES: [f32; 5] = [1.0, 6.0, 0.5, 2.0, 0.5];
const LABELS: &str = "tabby\ntiger cat\nPersian cat\nSiamese cat\nEgyptian cat\n";

/// Stands in for ONNX Runtime: fixed latency per call, fixed scores out.
struct FakeBackend {
    qnn_fails: bool,
    cpu_delay: Duration,
    npu_delay: Duration,
    loads: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl FakeBackend {
    fn new(qnn_fails: bool) -> Self {
        Self {
            qnn_fails,
            cpu_delay: Duration::from_millis(4),
            npu_delay: Duration::from_millis(1),
            loads: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct FakeModel {
    spec: ModelSpec,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl Backend for FakeBackend {
    type Model = FakeModel;

    fn name(&self) -> &'static str {
        "fake"
    }

    fn load(&self, artifact: &ModelArtifact, target: ExecutionTarget) -> Result<Self::Model> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        ensure!(artifact.path().exists(), "no model at {}", artifact.path().display());

        let delay = match target {
            ExecutionTarget::Cpu => self.cpu_delay,
            ExecutionTarget::Qnn(_) if self.qnn_fails => {
                bail!("QNN backend library not found")
            }
            ExecutionTarget::Qnn(options) => {
                assert_eq!(options, QnnOptions::default());
                self.npu_delay
            }
        };

        Ok(FakeModel {
            spec: ModelSpec {
                inputs: vec![TensorSpec {
                    name: IOName("data".to_string()),
                    type_name: "tensor(float)".to_string(),
                    rank: 4,
                    dims: vec![Some(1), Some(3), Some(8), Some(6)],
                }],
                outputs: Vec::new(),
            },
            delay,
            calls: self.calls.clone(),
        })
    }
}

impl BackendModel for FakeModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn infer(&mut self, inputs: Vec<(IOName, Tensor)>) -> Result<Vec<Tensor>> {
        let (name, input) = &inputs[0];
        ensure!(name.0 == "data", "unexpected input {name}");
        ensure!(input.dtype() == DType::F32, "unexpected dtype {:?}", input.dtype());
        ensure!(input.shape().dims() == [1, 3, 8, 6], "unexpected shape");

        std::thread::sleep(self.delay);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Tensor::from_values(Shape::from_slice(&[1, 5]), &SCORES)?])
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    config: RunConfig,
}

fn fixture(iterations: u32) -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();

    let image = root.join("grace_hopper.bmp");
    RgbImage::from_pixel(12, 16, Rgb([40, 80, 120])).save(&image)?;
    let model_file = root.join("model.onnx");
    std::fs::write(&model_file, b"not a real model")?;
    let label_file = root.join("labels.txt");
    std::fs::write(&label_file, LABELS)?;

    Ok(Fixture {
        _dir: dir,
        config: RunConfig {
            image,
            model_file,
            label_file,
            iterations,
            ..RunConfig::default()
        },
    })
}

fn report_lines(report: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(report)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn missing_model_aborts_before_initializing() -> Result<()> {
    let fx = fixture(3)?;
    let config = RunConfig {
        model_file: PathBuf::from("/definitely/not/here/model.onnx"),
        ..fx.config.clone()
    };
    let backend = FakeBackend::new(false);
    let mut report = Vec::new();

    let err = run(&backend, &config, &mut report).unwrap_err();

    assert!(err.to_string().starts_with("Model file not found"));
    assert!(report.is_empty());
    assert_eq!(backend.loads.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn both_sessions_compare_and_classify() -> Result<()> {
    let fx = fixture(5)?;
    let backend = FakeBackend::new(false);
    let mut report = Vec::new();

    let summary = run(&backend, &fx.config, &mut report)?;

    // (1 warm-up + 5 timed) per session.
    assert_eq!(backend.calls.load(Ordering::SeqCst), 12);
    assert_eq!(backend.loads.load(Ordering::SeqCst), 2);

    let npu_avg = summary.npu_avg_ms.expect("QNN ran");
    let speedup = summary.speedup.expect("speedup reported");
    assert_eq!(speedup, summary.cpu_avg_ms / npu_avg);
    assert!(summary.cpu_avg_ms >= 4.0);
    assert!(summary.accelerator_error.is_none());

    let lines = report_lines(&report);
    assert_eq!(lines[0], "--- Initializing CPU Session ---");
    assert_eq!(lines[1], "--- Initializing QNN Session (HTP/DSP) ---");
    assert!(lines.contains(&" PERFORMANCE COMPARISON (5 Iterations)".to_string()));
    assert!(lines.contains(&"[CPU Only] Running 5 iterations...".to_string()));
    assert!(lines.contains(&"[QNN (NPU)] Running 5 iterations...".to_string()));
    assert!(lines.contains(&format!(
        " Result: QNN is {speedup:.2}x faster than CPU (Average)"
    )));
    assert!(lines.contains(&"===== Top-5 Prediction (QNN) =====".to_string()));

    let labels: Vec<&str> = summary
        .predictions
        .iter()
        .map(|p| p.label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec!["tiger cat", "Siamese cat", "tabby", "Egyptian cat", "Persian cat"]
    );
    // Equal scores list the higher class index first.
    assert_eq!(lines.last().map(String::as_str), Some("0.050000: Persian cat"));
    assert!(lines.contains(&"0.600000: tiger cat".to_string()));
    Ok(())
}

#[test]
fn failed_accelerator_degrades_to_cpu_only() -> Result<()> {
    let fx = fixture(3)?;
    let backend = FakeBackend::new(true);
    let mut report = Vec::new();

    let summary = run(&backend, &fx.config, &mut report)?;

    assert!(summary.npu_avg_ms.is_none());
    assert!(summary.speedup.is_none());
    assert!(summary.predictions.is_empty());
    assert!(summary.cpu_avg_ms >= 4.0);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 4);

    let lines = report_lines(&report);
    assert!(lines.contains(&"Error: QNN Session failed. QNN backend library not found".to_string()));
    assert!(lines.contains(&"[CPU Only] Running 3 iterations...".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("[CPU Only] Average Latency: ")));
    assert!(lines.contains(&"[Result] QNN benchmarking skipped.".to_string()));
    assert!(!lines.iter().any(|l| l.contains("faster than CPU")));
    assert!(!lines.iter().any(|l| l.contains("Prediction")));
    Ok(())
}

#[test]
fn cpu_only_run_never_reads_labels() -> Result<()> {
    let fx = fixture(1)?;
    let config = RunConfig {
        label_file: PathBuf::from("/definitely/not/here/labels.txt"),
        ..fx.config.clone()
    };
    let backend = FakeBackend::new(true);
    let mut report = Vec::new();

    run(&backend, &config, &mut report)?;
    Ok(())
}

#[test]
fn missing_labels_are_fatal_once_qnn_ran() -> Result<()> {
    let fx = fixture(1)?;
    let config = RunConfig {
        label_file: PathBuf::from("/definitely/not/here/labels.txt"),
        ..fx.config.clone()
    };
    let backend = FakeBackend::new(false);
    let mut report = Vec::new();

    let err = run(&backend, &config, &mut report).unwrap_err();
    assert!(format!("{err:#}").contains("labels.txt"));
    Ok(())
}

#[test]
fn zero_iterations_fail_before_timing() -> Result<()> {
    let fx = fixture(0)?;
    let backend = FakeBackend::new(false);
    let mut report = Vec::new();

    let err = run(&backend, &fx.config, &mut report).unwrap_err();
    assert!(format!("{err:#}").contains("iterations must be at least 1"));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert!(!report_lines(&report).iter().any(|l| l.contains("Average Latency")));
    Ok(())
}

#[test]
fn missing_image_is_fatal() -> Result<()> {
    let fx = fixture(1)?;
    let config = RunConfig {
        image: fx.config.image.with_file_name("missing.bmp"),
        ..fx.config.clone()
    };
    let backend = FakeBackend::new(false);
    let mut report = Vec::new();

    assert!(run(&backend, &config, &mut report).is_err());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn accelerator_outcome_is_tagged() -> Result<()> {
    let fx = fixture(1)?;
    let artifact = ModelArtifact::OnnxPath(fx.config.model_file.clone());

    let ready = load_accelerator(&FakeBackend::new(false), &artifact, QnnOptions::default());
    assert!(matches!(ready, AcceleratorSession::Ready(_)));

    match load_accelerator(&FakeBackend::new(true), &artifact, QnnOptions::default()) {
        AcceleratorSession::Unavailable { reason } => {
            assert_eq!(reason, "QNN backend library not found")
        }
        AcceleratorSession::Ready(_) => panic!("QNN should be unavailable"),
    }
    Ok(())
}
