use anyhow::{bail, ensure, Context, Result};
use npubench_core::{
    Backend, BackendModel, DType, ExecutionTarget, IOName, ModelArtifact, ModelSpec, QnnOptions,
    Shape, Tensor, TensorSpec,
};
use ort::{
    execution_providers::CPUExecutionProvider,
    session::{builder::SessionBuilder, Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, ValueType},
};
use tracing::{debug, info};

pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OrtModel {
    spec: ModelSpec,
    session: Session,
    input_names: Vec<String>,
}

impl Backend for OrtBackend {
    type Model = OrtModel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(&self, artifact: &ModelArtifact, target: ExecutionTarget) -> Result<Self::Model> {
        let path = artifact.path();

        let builder = Session::builder().context("failed to create ORT session builder")?;
        let builder = configure_session_builder(builder, &target)?;

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?;

        let input_names = session
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect();

        let spec = build_model_spec(&session)?;
        info!(
            provider = target.label(),
            model = %path.display(),
            inputs = spec.inputs.len(),
            outputs = spec.outputs.len(),
            "onnxruntime session ready"
        );

        Ok(OrtModel {
            spec,
            session,
            input_names,
        })
    }
}

impl BackendModel for OrtModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn infer(&mut self, inputs: Vec<(IOName, Tensor)>) -> Result<Vec<Tensor>> {
        ensure!(
            inputs.len() == self.input_names.len(),
            "expected {} inputs, got {}",
            self.input_names.len(),
            inputs.len()
        );

        let mut ort_inputs = Vec::with_capacity(inputs.len());
        for (name, input) in inputs {
            ensure!(
                self.input_names.contains(&name.0),
                "model has no input named `{name}`"
            );
            let value = tensor_to_ort_value(input)?;
            ort_inputs.push((name.0, SessionInputValue::from(value)));
        }

        let outputs = self.session.run(ort_inputs)?;
        let mut out_tensors = Vec::with_capacity(outputs.len());
        for (_, value) in outputs.iter() {
            out_tensors.push(ort_value_to_tensor(&value)?);
        }

        Ok(out_tensors)
    }
}

fn build_model_spec(session: &Session) -> Result<ModelSpec> {
    let inputs = session
        .inputs
        .iter()
        .map(|input| tensor_spec_from_value_type(&input.name, &input.input_type))
        .collect::<Result<Vec<_>>>()?;

    let outputs = session
        .outputs
        .iter()
        .map(|output| tensor_spec_from_value_type(&output.name, &output.output_type))
        .collect::<Result<Vec<_>>>()?;

    Ok(ModelSpec { inputs, outputs })
}

fn configure_session_builder(
    builder: SessionBuilder,
    target: &ExecutionTarget,
) -> Result<SessionBuilder> {
    match target {
        ExecutionTarget::Cpu => builder
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("failed to enable ORT CPU execution provider"),
        ExecutionTarget::Qnn(options) => configure_qnn(builder, options),
    }
}

fn configure_qnn(builder: SessionBuilder, options: &QnnOptions) -> Result<SessionBuilder> {
    #[cfg(feature = "qnn")]
    {
        use ort::execution_providers::{
            ArbitrarilyConfigurableExecutionProvider, QNNExecutionProvider,
        };

        let mut ep = QNNExecutionProvider::default();
        for (key, value) in options.provider_options() {
            debug!(%key, %value, "qnn provider option");
            ep = ep.with_arbitrary_config(key, value);
        }

        // Without this ORT quietly drops back to the CPU provider.
        builder
            .with_execution_providers([ep.build().error_on_failure()])
            .context("failed to enable ORT QNN execution provider")
    }
    #[cfg(not(feature = "qnn"))]
    {
        let _ = builder;
        debug!(options = ?options.provider_options(), "qnn provider not compiled in");
        bail!("QNN requested but npubench-backend-ort was built without the `qnn` feature")
    }
}

fn tensor_spec_from_value_type(name: &str, value_type: &ValueType) -> Result<TensorSpec> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("unsupported non-tensor IO value type for `{name}`");
    };

    let dims = shape
        .iter()
        .map(|d| if *d < 0 { None } else { Some(*d as usize) })
        .collect::<Vec<_>>();

    Ok(TensorSpec {
        name: IOName(name.to_string()),
        type_name: onnx_type_name(*ty),
        rank: shape.len(),
        dims,
    })
}

/// The descriptor ONNX Runtime's own bindings report, e.g. `tensor(float)`.
fn onnx_type_name(ty: TensorElementType) -> String {
    let elem = match ty {
        TensorElementType::Float32 => "float",
        TensorElementType::Float16 => "float16",
        TensorElementType::Bfloat16 => "bfloat16",
        TensorElementType::Float64 => "double",
        TensorElementType::Int8 => "int8",
        TensorElementType::Int16 => "int16",
        TensorElementType::Int32 => "int32",
        TensorElementType::Int64 => "int64",
        TensorElementType::Uint8 => "uint8",
        TensorElementType::Uint16 => "uint16",
        TensorElementType::Uint32 => "uint32",
        TensorElementType::Uint64 => "uint64",
        TensorElementType::Bool => "bool",
        TensorElementType::String => "string",
        other => return format!("tensor({other})"),
    };
    format!("tensor({elem})")
}

fn tensor_to_ort_value(tensor: Tensor) -> Result<DynValue> {
    let shape: Vec<usize> = tensor.shape().dims().to_vec();
    let expected_bytes = tensor.shape().numel() * tensor.dtype().byte_size();
    ensure!(
        tensor.bytes.len() == expected_bytes,
        "input byte size mismatch: got {}, expected {}",
        tensor.bytes.len(),
        expected_bytes
    );

    let value = match tensor.dtype() {
        DType::F32 => ort::value::Tensor::from_array((shape, tensor.values::<f32>()?))?.into_dyn(),
        DType::I64 => ort::value::Tensor::from_array((shape, tensor.values::<i64>()?))?.into_dyn(),
        DType::I32 => ort::value::Tensor::from_array((shape, tensor.values::<i32>()?))?.into_dyn(),
        DType::U16 => ort::value::Tensor::from_array((shape, tensor.values::<u16>()?))?.into_dyn(),
        DType::U8 => ort::value::Tensor::from_array((shape, tensor.bytes.to_vec()))?.into_dyn(),
    };

    Ok(value)
}

fn ort_value_to_tensor(value: &ort::value::ValueRef<'_>) -> Result<Tensor> {
    let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
        bail!("non-tensor outputs are not supported");
    };

    let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
    let shape = Shape::from_slice(&dims);

    match *ty {
        TensorElementType::Float32 => {
            let array = value.try_extract_array::<f32>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Tensor::from_values(shape, slice)
        }
        TensorElementType::Int64 => {
            let array = value.try_extract_array::<i64>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Tensor::from_values(shape, slice)
        }
        TensorElementType::Int32 => {
            let array = value.try_extract_array::<i32>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Tensor::from_values(shape, slice)
        }
        TensorElementType::Uint16 => {
            let array = value.try_extract_array::<u16>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Tensor::from_values(shape, slice)
        }
        TensorElementType::Uint8 => {
            let array = value.try_extract_array::<u8>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Tensor::from_values(shape, slice)
        }
        _ => bail!("unsupported output tensor element type: {ty}"),
    }
}
