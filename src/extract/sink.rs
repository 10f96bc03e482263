//! Writes an extracted mapping to `<dir>/<safe-label>.sql` files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::extract::error::PersistError;
use crate::model::{unique_name, SqlMapping};

/// Extension of persisted query files.
pub const SQL_EXTENSION: &str = "sql";

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Persists each entry of `mapping` as one file under `dir`.
///
/// The directory is created if needed. Existing files with the same name are
/// overwritten. When two labels sanitize to the same file name, the later one
/// gets a numeric suffix so no entry is lost.
///
/// Returns the written paths in mapping order.
///
/// # Errors
///
/// Stops at the first failure; files written before it remain on disk.
pub fn persist(mapping: &SqlMapping, dir: &Path) -> Result<Vec<PathBuf>, PersistError> {
    fs::create_dir_all(dir).map_err(|source| PersistError::CreateDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut used: HashSet<String> = HashSet::new();
    let mut written = Vec::with_capacity(mapping.len());

    for entry in mapping {
        let safe = sanitize_label(&entry.label);
        let file_stem = unique_name(&safe, |candidate| used.contains(candidate));
        let path = dir.join(format!("{file_stem}.{SQL_EXTENSION}"));

        fs::write(&path, &entry.sql).map_err(|source| PersistError::WriteFile {
            path: path.clone(),
            source,
        })?;

        info!(label = %entry.label, path = %path.display(), "Saved SQL");
        used.insert(file_stem);
        written.push(path);
    }

    Ok(written)
}
