use anyhow::{bail, ensure, Context, Result};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IOName(pub String);

impl std::fmt::Display for IOName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
pub struct TensorSpec {
    pub name: IOName,
    /// ONNX type descriptor, e.g. `tensor(float)` or `tensor(uint8)`.
    pub type_name: String,
    pub rank: usize,
    pub dims: Vec<Option<usize>>, // None = dynamic
}

impl TensorSpec {
    /// Height and width of an NCHW input.
    pub fn image_hw(&self) -> Result<(u32, u32)> {
        ensure!(
            self.rank >= 4,
            "input `{}` has rank {}, expected an NCHW image tensor",
            self.name,
            self.rank
        );

        let dim = |axis: usize, what: &str| -> Result<u32> {
            let Some(size) = self.dims.get(axis).copied().flatten() else {
                bail!("input `{}` has a dynamic {what} dimension", self.name);
            };
            u32::try_from(size).with_context(|| format!("input {what} {size} is too large"))
        };

        Ok((dim(2, "height")?, dim(3, "width")?))
    }
}

#[derive(Clone, Debug)]
pub struct ModelSpec {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

impl ModelSpec {
    pub fn first_input(&self) -> Result<&TensorSpec> {
        self.inputs.first().context("model declares no inputs")
    }
}
