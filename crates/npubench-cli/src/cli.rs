use std::path::PathBuf;

use clap::Parser;
use npubench_core::QnnOptions;

use crate::driver::RunConfig;

#[derive(Parser, Debug)]
#[command(
    name = "npubench",
    version,
    about = "ONNX Runtime latency benchmark: CPU vs. QNN (HTP)"
)]
pub struct Cli {
    /// Input image
    #[arg(short = 'i', long = "image", default_value = "grace_hopper.bmp")]
    pub image: PathBuf,

    /// Path to ONNX model file
    #[arg(short = 'm', long = "model_file", default_value = "model.onnx")]
    pub model_file: PathBuf,

    /// Newline-delimited class labels
    #[arg(short = 'l', long = "label_file", default_value = "labels.txt")]
    pub label_file: PathBuf,

    /// Timed iterations per session
    #[arg(short = 'n', long = "iterations", default_value_t = 100)]
    pub iterations: u32,

    /// Number of predictions printed
    #[arg(short = 'k', long = "top_k", default_value_t = 5)]
    pub top_k: usize,

    /// Extra QNN provider option, e.g. `backend_path=QnnHtp.dll` (repeatable)
    #[arg(long = "qnn_option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub qnn_options: Vec<(String, String)>,

    /// Log filter (RUST_LOG syntax); RUST_LOG wins when set
    #[arg(long, default_value = "warn")]
    pub log: String,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            image: self.image.clone(),
            model_file: self.model_file.clone(),
            label_file: self.label_file.clone(),
            iterations: self.iterations,
            top_k: self.top_k,
            qnn: QnnOptions {
                extra: self.qnn_options.clone(),
                ..QnnOptions::default()
            },
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty option key in `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
