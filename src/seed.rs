//! Seeding a conversation from a local file.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Extensions the file picker suggests. Anything else is still read.
pub const ADVISORY_EXTENSIONS: &[&str] = &[
    "txt", "md", "json", "csv", "js", "ts", "jsx", "tsx", "html", "css",
];

pub const SEED_PREFIX: &str = "I uploaded a file with the following content:";

pub const ANALYSIS_INSTRUCTION: &str =
    "Please analyze the content of this file and give me a summary.";

pub fn read_seed_file(path: &Path) -> Result<String> {
    if !has_advisory_extension(path) {
        warn!(path = %path.display(), "uploading file with an unlisted extension");
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    info!(path = %path.display(), bytes = content.len(), "file read for upload");
    Ok(content)
}

pub fn has_advisory_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| ADVISORY_EXTENSIONS.contains(&ext.as_str()))
}

/// The user entry that carries an uploaded file.
pub fn seed_message(content: &str) -> String {
    format!("{SEED_PREFIX}\n\n```\n{content}\n```")
}
