//! Prompt loading from JSON Lines files.

use crate::models::Prompt;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Load every prompt from a JSONL file, skipping blank lines.
pub fn load_prompts(path: &Path) -> Result<Vec<Prompt>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompts file: {}", path.display()))?;

    let prompts = parse_prompts(&content)
        .with_context(|| format!("Failed to parse prompts file: {}", path.display()))?;

    debug!("Loaded {} prompts from {}", prompts.len(), path.display());
    Ok(prompts)
}

/// Parse JSONL content into prompts.
pub fn parse_prompts(content: &str) -> Result<Vec<Prompt>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str::<Prompt>(line)
                .with_context(|| format!("Invalid prompt on line {}", number + 1))
        })
        .collect()
}
