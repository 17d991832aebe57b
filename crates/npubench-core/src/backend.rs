use anyhow::Result;

use crate::{ExecutionTarget, IOName, ModelArtifact, ModelSpec, Tensor};

pub trait Backend: Send + Sync + 'static {
    type Model: BackendModel;

    fn name(&self) -> &'static str;
    fn load(&self, artifact: &ModelArtifact, target: ExecutionTarget) -> Result<Self::Model>;
}

pub trait BackendModel: Send + 'static {
    fn spec(&self) -> &ModelSpec;

    /// Runs one inference call. Outputs come back in the model's declared order.
    fn infer(&mut self, inputs: Vec<(IOName, Tensor)>) -> Result<Vec<Tensor>>;
}
