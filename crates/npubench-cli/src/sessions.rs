use anyhow::{Context, Result};
use npubench_core::{Backend, ExecutionTarget, ModelArtifact, QnnOptions};
use tracing::{info, warn};

/// Outcome of building the accelerator session. The accelerator is optional
/// hardware, so failing to build it is a state rather than an error.
pub enum AcceleratorSession<M> {
    Ready(M),
    Unavailable { reason: String },
}

pub fn load_cpu<B: Backend>(backend: &B, artifact: &ModelArtifact) -> Result<B::Model> {
    let model = backend
        .load(artifact, ExecutionTarget::Cpu)
        .with_context(|| format!("failed to initialize {} CPU session", backend.name()))?;
    info!(backend = backend.name(), "CPU session initialized");
    Ok(model)
}

pub fn load_accelerator<B: Backend>(
    backend: &B,
    artifact: &ModelArtifact,
    options: QnnOptions,
) -> AcceleratorSession<B::Model> {
    match backend.load(artifact, ExecutionTarget::Qnn(options)) {
        Ok(model) => {
            info!(backend = backend.name(), "QNN session initialized");
            AcceleratorSession::Ready(model)
        }
        Err(err) => {
            let reason = format!("{err:#}");
            warn!(backend = backend.name(), %reason, "QNN session unavailable, continuing CPU-only");
            AcceleratorSession::Unavailable { reason }
        }
    }
}
