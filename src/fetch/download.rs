use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{info, warn};

/// Archive bytes downloaded to a temporary file.
///
/// # RAII Cleanup
///
/// The file is deleted when this value is dropped, on success and error paths
/// alike. A failed deletion is logged and otherwise ignored.
#[derive(Debug)]
pub struct DownloadedArchive {
    path: PathBuf,
    temp: Option<TempPath>,

    /// URL the archive was downloaded from
    pub url: String,

    /// Number of bytes written
    pub size_bytes: u64,
}

impl DownloadedArchive {
    pub fn new(temp: TempPath, url: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path: temp.to_path_buf(),
            temp: Some(temp),
            url: url.into(),
            size_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DownloadedArchive {
    fn drop(&mut self) {
        let Some(temp) = self.temp.take() else {
            return;
        };

        match temp.close() {
            Ok(()) => info!(path = %self.path.display(), "Cleaned up temporary file"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove temporary file"
            ),
        }
    }
}
