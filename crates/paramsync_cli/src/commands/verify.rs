//! Verify command implementation.

use paramsync_engine::DiskCache;
use std::fs;
use std::path::Path;
use tracing::info;

/// Result of checking one cache file.
#[derive(Debug)]
pub struct FileCheck {
    /// File name inside the cache directory.
    pub name: String,
    /// Decoded version, or the decode error.
    pub outcome: Result<u64, String>,
}

/// Checks every regular file in a cache directory.
///
/// A temporary file left behind by an interrupted write is checked like
/// any other file.
pub fn check_dir(cache_dir: &Path) -> Result<Vec<FileCheck>, Box<dyn std::error::Error>> {
    let mut checks = Vec::new();
    for entry in fs::read_dir(cache_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let outcome = DiskCache::read_record(&entry.path())
            .map(|state| state.version())
            .map_err(|e| e.to_string());
        checks.push(FileCheck { name, outcome });
    }
    checks.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(checks)
}

/// Runs the verify command.
pub fn run(cache_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Verifying cache directory {:?}", cache_dir);

    let checks = check_dir(cache_dir)?;
    let mut failures = 0;
    for check in &checks {
        match &check.outcome {
            Ok(version) => println!("OK   {} (version {})", check.name.replace('|', "/"), version),
            Err(e) => {
                failures += 1;
                println!("FAIL {}: {}", check.name.replace('|', "/"), e);
            }
        }
    }

    println!("{} files checked, {} failed", checks.len(), failures);
    if failures > 0 {
        return Err(format!("{} corrupt cache files", failures).into());
    }
    Ok(())
}
