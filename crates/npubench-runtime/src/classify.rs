use std::cmp::Ordering;
use std::io::Write;

use anyhow::{bail, ensure, Result};
use npubench_core::Tensor;

#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub score: f32,
    pub label: String,
}

/// First batch row of a `[batch, ...]` output, as `f32`. Outputs without
/// a batch axis (rank below 2) are returned whole.
pub fn first_row(tensor: &Tensor) -> Result<Vec<f32>> {
    let mut values = tensor.to_f32_vec()?;
    let dims = tensor.shape().dims();
    if dims.len() < 2 {
        return Ok(values);
    }
    let batch = dims[0];
    ensure!(batch > 0, "output tensor has an empty batch dimension");

    values.truncate(values.len() / batch);
    Ok(values)
}

/// Divides every score by the sum of all scores. This is not a softmax:
/// negative inputs give negative results and a zero sum gives NaN.
pub fn normalize(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    scores.iter().map(|s| s / sum).collect()
}

/// Indices of the `k` highest scores, best first. NaN ranks above every
/// number and equal scores come out highest index first, matching a
/// reversed ascending argsort.
pub fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        let (sa, sb) = (scores[a], scores[b]);
        match (sa.is_nan(), sb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => sa.partial_cmp(&sb).unwrap_or(Ordering::Equal),
        }
    });
    order.reverse();
    order.truncate(k);
    order
}

/// Ranks the first batch row of `output` against `labels`.
pub fn classify(output: &Tensor, labels: &[String], k: usize) -> Result<Vec<Prediction>> {
    let probs = normalize(&first_row(output)?);

    top_k(&probs, k)
        .into_iter()
        .map(|index| {
            let Some(label) = labels.get(index) else {
                bail!(
                    "class index {index} is out of range for a table of {} labels",
                    labels.len()
                );
            };
            Ok(Prediction {
                index,
                score: probs[index],
                label: label.clone(),
            })
        })
        .collect()
}

pub fn write_predictions<W: Write + ?Sized>(
    out: &mut W,
    title: &str,
    predictions: &[Prediction],
) -> Result<()> {
    writeln!(out, "\n===== {title} =====")?;
    for p in predictions {
        writeln!(out, "{:.6}: {}", p.score, p.label)?;
    }
    Ok(())
}
