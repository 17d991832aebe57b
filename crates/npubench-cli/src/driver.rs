use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use npubench_core::{Backend, BackendModel, ModelArtifact, QnnOptions};
use npubench_runtime::{
    benchmark_session, classify, load_labels, preprocess_image, write_predictions, Prediction,
};
use tracing::info;

use crate::sessions::{self, AcceleratorSession};

const RULE: &str = "========================================";

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub image: PathBuf,
    pub model_file: PathBuf,
    pub label_file: PathBuf,
    pub iterations: u32,
    pub top_k: usize,
    pub qnn: QnnOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::from("grace_hopper.bmp"),
            model_file: PathBuf::from("model.onnx"),
            label_file: PathBuf::from("labels.txt"),
            iterations: 100,
            top_k: 5,
            qnn: QnnOptions::default(),
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub cpu_avg_ms: f64,
    /// `None` when the QNN session could not be built.
    pub npu_avg_ms: Option<f64>,
    pub speedup: Option<f64>,
    pub predictions: Vec<Prediction>,
    pub accelerator_error: Option<String>,
}

/// Benchmarks the model on CPU and QNN, compares them and ranks the QNN
/// output. Everything user-facing goes to `out`.
pub fn run<B, W>(backend: &B, config: &RunConfig, out: &mut W) -> Result<RunSummary>
where
    B: Backend,
    W: Write + ?Sized,
{
    if !config.model_file.exists() {
        bail!("Model file not found: {}", config.model_file.display());
    }
    let artifact = ModelArtifact::OnnxPath(config.model_file.clone());

    writeln!(out, "--- Initializing CPU Session ---")?;
    let mut cpu = sessions::load_cpu(backend, &artifact)?;

    writeln!(out, "--- Initializing QNN Session (HTP/DSP) ---")?;
    let mut accelerator = sessions::load_accelerator(backend, &artifact, config.qnn.clone());
    let accelerator_error = match &accelerator {
        AcceleratorSession::Ready(_) => None,
        AcceleratorSession::Unavailable { reason } => {
            writeln!(out, "Error: QNN Session failed. {reason}")?;
            Some(reason.clone())
        }
    };

    // Both sessions load the same file, so the CPU metadata stands in for QNN.
    let input_spec = cpu.spec().first_input()?.clone();
    let (height, width) = input_spec.image_hw()?;
    info!(
        input = %input_spec.name,
        ty = %input_spec.type_name,
        height,
        width,
        "model input"
    );
    let input = preprocess_image(&config.image, height, width, &input_spec.type_name)?;

    writeln!(out, "\n{RULE}")?;
    writeln!(
        out,
        " PERFORMANCE COMPARISON ({} Iterations)",
        config.iterations
    )?;
    writeln!(out, "{RULE}")?;

    let cpu_run = benchmark_session(
        &mut cpu,
        &input_spec.name,
        &input,
        config.iterations,
        "CPU Only",
        out,
    )?;

    let npu_run = match &mut accelerator {
        AcceleratorSession::Ready(model) => {
            let run = benchmark_session(
                model,
                &input_spec.name,
                &input,
                config.iterations,
                "QNN (NPU)",
                out,
            )?;
            let speedup = cpu_run.avg_ms / run.avg_ms;
            writeln!(
                out,
                "\n Result: QNN is {speedup:.2}x faster than CPU (Average)"
            )?;
            Some((run, speedup))
        }
        AcceleratorSession::Unavailable { .. } => {
            writeln!(out, "\n[Result] QNN benchmarking skipped.")?;
            None
        }
    };

    let predictions = match &npu_run {
        Some((run, _)) => {
            let output = run
                .outputs
                .first()
                .context("QNN session returned no outputs")?;
            let labels = load_labels(&config.label_file)?;
            let predictions = classify(output, &labels, config.top_k)?;
            write_predictions(
                out,
                &format!("Top-{} Prediction (QNN)", config.top_k),
                &predictions,
            )?;
            predictions
        }
        None => Vec::new(),
    };

    Ok(RunSummary {
        cpu_avg_ms: cpu_run.avg_ms,
        npu_avg_ms: npu_run.as_ref().map(|(run, _)| run.avg_ms),
        speedup: npu_run.as_ref().map(|(_, speedup)| *speedup),
        predictions,
        accelerator_error,
    })
}
