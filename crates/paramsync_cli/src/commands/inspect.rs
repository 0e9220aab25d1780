//! Inspect command implementation.

use paramsync_engine::{DiskCache, VersionedState};
use serde::Serialize;
use std::path::Path;

/// Cache file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Cache file path.
    pub path: String,
    /// Cached version (0 means the file did not exist on the server).
    pub version: u64,
    /// Whether the file existed on the server.
    pub exists: bool,
    /// Creation date in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_date: Option<i64>,
    /// Modification date in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_date: Option<i64>,
    /// Content length in bytes.
    pub content_length: usize,
    /// Content (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl InspectResult {
    /// Builds a result from a decoded cache state.
    pub fn from_state(path: &Path, state: &VersionedState, with_content: bool) -> Self {
        Self {
            path: path.display().to_string(),
            version: state.version(),
            exists: state.exists(),
            create_date: state.creation_date(),
            mod_date: state.modification_date(),
            content_length: state.content().map_or(0, str::len),
            content: if with_content {
                state.content().map(str::to_string)
            } else {
                None
            },
        }
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, show_content: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No cache file found at {:?}", path).into());
    }

    let state = DiskCache::read_record(path)?;
    let result = InspectResult::from_state(path, &state, show_content);

    // Output
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print!("{}", render_text(&result));
        }
    }

    Ok(())
}

fn render_text(result: &InspectResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Cache file: {}\n", result.path));
    if !result.exists {
        out.push_str("Version:    0 (no such file)\n");
        return out;
    }
    out.push_str(&format!("Version:    {}\n", result.version));
    if let Some(created) = result.create_date {
        out.push_str(&format!("Created:    {} ms\n", created));
    }
    if let Some(modified) = result.mod_date {
        out.push_str(&format!("Modified:   {} ms\n", modified));
    }
    out.push_str(&format!("Content:    {} bytes\n", result.content_length));
    if let Some(content) = &result.content {
        out.push_str("---\n");
        out.push_str(content);
        if !content.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
