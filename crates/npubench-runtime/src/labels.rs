use std::path::Path;

use anyhow::{Context, Result};

/// One entry per line, trimmed, in file order. Blank lines are kept so
/// indices stay aligned with the model's class dimension. `\n`, `\r\n` and
/// a lone `\r` all end a line.
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read label file {}", path.display()))?;

    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    Ok(text.lines().map(|line| line.trim().to_string()).collect())
}
