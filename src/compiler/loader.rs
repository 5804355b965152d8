use anyhow::{Context as AnyhowContext, Result};
use std::fs;
use std::path::Path;

use crate::dsl::ProcessDoc;

/// Reads process records that were already decoded and saved as YAML or
/// JSON (chosen by extension, YAML otherwise).
pub fn load_process(file_path: &Path) -> Result<ProcessDoc> {
    let content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read process file from {}", file_path.display()))?;

    let is_json = file_path.extension().and_then(|e| e.to_str()) == Some("json");
    let process: ProcessDoc = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to deserialize JSON content from {}", file_path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to deserialize YAML content from {}", file_path.display()))?
    };

    Ok(process)
}
