use std::io::Write;
use std::time::Instant;

use anyhow::{ensure, Result};
use npubench_core::{BackendModel, IOName, Tensor};
use tracing::debug;

/// What one benchmarked session produced.
#[derive(Debug)]
pub struct BenchmarkOutcome {
    /// Outputs of the last timed call.
    pub outputs: Vec<Tensor>,
    pub total_ms: f64,
    pub avg_ms: f64,
}

/// Runs one untimed warm-up call, then `iterations` timed calls on the same
/// input, and reports total and average latency to `out`. `iterations`
/// must be at least 1.
pub fn benchmark_session<M, W>(
    model: &mut M,
    input_name: &IOName,
    input: &Tensor,
    iterations: u32,
    label: &str,
    out: &mut W,
) -> Result<BenchmarkOutcome>
where
    M: BackendModel + ?Sized,
    W: Write + ?Sized,
{
    ensure!(iterations > 0, "[{label}] iterations must be at least 1");

    // Absorbs graph finalization and the accelerator's power-up.
    let mut outputs = model.infer(vec![(input_name.clone(), input.clone())])?;
    debug!(label, "warm-up call finished");

    writeln!(out, "[{label}] Running {iterations} iterations...")?;
    let start = Instant::now();

    for _ in 0..iterations {
        outputs = model.infer(vec![(input_name.clone(), input.clone())])?;
    }

    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
    let avg_ms = total_ms / f64::from(iterations);

    writeln!(out, "[{label}] Total Time: {total_ms:.2} ms")?;
    writeln!(out, "[{label}] Average Latency: {avg_ms:.4} ms")?;
    debug!(label, iterations, total_ms, avg_ms, "benchmark finished");

    Ok(BenchmarkOutcome {
        outputs,
        total_ms,
        avg_ms,
    })
}
