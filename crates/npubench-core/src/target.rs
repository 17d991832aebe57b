/// Where a session executes.
#[derive(Clone, Debug)]
pub enum ExecutionTarget {
    Cpu,
    Qnn(QnnOptions),
}

impl ExecutionTarget {
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionTarget::Cpu => "cpu",
            ExecutionTarget::Qnn(_) => "qnn",
        }
    }
}

/// QNN execution provider tuning. Defaults target the HTP (Hexagon) path
/// in burst mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QnnOptions {
    pub backend_type: String,
    pub performance_mode: String,
    pub device_id: u32,
    pub graph_finalization_optimization_mode: u8,
    pub soc_model: u32,
    pub htp_arch: u32,
    pub vtcm_mb: u32,
    /// Raw `key=value` provider options, applied after the typed ones.
    pub extra: Vec<(String, String)>,
}

impl Default for QnnOptions {
    fn default() -> Self {
        Self {
            backend_type: "htp".to_string(),
            performance_mode: "burst".to_string(),
            device_id: 0,
            graph_finalization_optimization_mode: 3,
            soc_model: 35,
            htp_arch: 68,
            vtcm_mb: 2,
            extra: Vec::new(),
        }
    }
}

impl QnnOptions {
    /// Flattens into the string options ONNX Runtime's QNN provider accepts.
    /// A key from `extra` replaces a typed entry with the same key.
    pub fn provider_options(&self) -> Vec<(String, String)> {
        let mut options = vec![
            ("backend_type".to_string(), self.backend_type.clone()),
            (
                "htp_performance_mode".to_string(),
                self.performance_mode.clone(),
            ),
            ("device_id".to_string(), self.device_id.to_string()),
            (
                "htp_graph_finalization_optimization_mode".to_string(),
                self.graph_finalization_optimization_mode.to_string(),
            ),
            ("soc_model".to_string(), self.soc_model.to_string()),
            ("htp_arch".to_string(), self.htp_arch.to_string()),
            ("vtcm_mb".to_string(), self.vtcm_mb.to_string()),
        ];

        for (key, value) in &self.extra {
            match options.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value.clone(),
                None => options.push((key.clone(), value.clone())),
            }
        }

        options
    }
}
