use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub(crate) static DAY_STAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("static regex"));

/// Every file under `root` whose name matches `pattern` and carries a
/// `YYYY-MM-DD` stamp somewhere in it, sorted by path.
pub fn list_log_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = glob::Pattern::new(pattern).with_context(|| format!("invalid file pattern {:?}", pattern))?;
    if !root.is_dir() {
        anyhow::bail!("input directory {:?} does not exist", root);
    }
    let mut files = Vec::new();
    let mut skipped = 0usize;
    for entry in WalkDir::new(root).into_iter() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                skipped += 1;
                tracing::warn!(path = ?err.path(), error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() { continue; }
        let p = entry.path();
        if let Some(name) = p.file_name().and_then(|s| s.to_str()) {
            if pattern.matches(name) && DAY_STAMP.is_match(name) {
                files.push(p.to_path_buf());
            } else {
                tracing::debug!(file = ?p, "skipping file without day stamp");
            }
        }
    }
    files.sort();
    if skipped > 0 {
        tracing::warn!(root = ?root, skipped = skipped, "some entries could not be walked");
    }
    Ok(files)
}
