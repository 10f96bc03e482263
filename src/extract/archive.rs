//! Packaged data source archive access.
//!
//! A `.tdsx` file is a zip container; the descriptor documents are the
//! entries whose names end in `.tds` (usually `Data/Datasources/*.tds`).

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::extract::error::ExtractError;

/// Default suffix of descriptor entries inside the archive.
pub const DESCRIPTOR_SUFFIX: &str = ".tds";

/// Upper bound on the buffer reserved up front for one entry; the declared
/// size comes from the archive headers and is not trusted beyond this.
const MAX_PREALLOC: u64 = 1 << 20;

/// Read-only view over one packaged data source archive.
///
/// The underlying reader is released when this value is dropped.
pub struct TdsxArchive<R: Read + Seek> {
    source_name: String,
    suffix: String,
    archive: ZipArchive<R>,
}

impl TdsxArchive<File> {
    /// Opens the archive at `path`.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::NotFound`] if the file is missing or unreadable
    /// - [`ExtractError::NotAnArchive`] if it is not a zip container
    pub fn open(path: &Path, suffix: &str) -> Result<Self, ExtractError> {
        Self::open_as(path, path.display().to_string(), suffix)
    }

    /// Opens the archive at `path`, reporting errors under `source_name`
    /// (e.g. the URL a temporary file was downloaded from).
    pub fn open_as(
        path: &Path,
        source_name: impl Into<String>,
        suffix: &str,
    ) -> Result<Self, ExtractError> {
        let file = File::open(path).map_err(|source| ExtractError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(source_name, file, suffix)
    }
}

impl TdsxArchive<Cursor<Vec<u8>>> {
    /// Wraps archive bytes already held in memory.
    pub fn from_bytes(
        source_name: impl Into<String>,
        bytes: Vec<u8>,
        suffix: &str,
    ) -> Result<Self, ExtractError> {
        Self::from_reader(source_name, Cursor::new(bytes), suffix)
    }
}

impl<R: Read + Seek> TdsxArchive<R> {
    pub fn from_reader(
        source_name: impl Into<String>,
        reader: R,
        suffix: &str,
    ) -> Result<Self, ExtractError> {
        let source_name = source_name.into();
        let archive = ZipArchive::new(reader)
            .map_err(|e| ExtractError::not_an_archive(&source_name, e))?;

        debug!(source = %source_name, entries = archive.len(), "Opened archive");

        Ok(Self {
            source_name,
            suffix: suffix.to_string(),
            archive,
        })
    }

    pub(crate) fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Names of descriptor entries, in archive listing order.
    ///
    /// Each call starts a fresh pass over the central directory.
    pub fn descriptor_names(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.archive.len())
            .filter_map(move |index| self.archive.name_for_index(index))
            .filter(move |name| name.ends_with(self.suffix.as_str()))
    }

    /// Reads one descriptor entry and decodes it as UTF-8 text.
    ///
    /// A leading byte-order mark is dropped.
    pub fn read_descriptor(&mut self, name: &str) -> Result<String, ExtractError> {
        let mut entry = self
            .archive
            .by_name(name)
            .map_err(|e| ExtractError::not_an_archive(&self.source_name, e))?;

        let mut bytes = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| ExtractError::not_an_archive(&self.source_name, e))?;

        let text = String::from_utf8(bytes)
            .map_err(|e| ExtractError::malformed(&self.source_name, name, e))?;

        Ok(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Builds an in-memory zip with the given `(name, text)` entries.
    pub(crate) fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let raw: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(name, text)| (*name, text.as_bytes()))
            .collect();
        zip_raw(&raw)
    }

    pub(crate) fn zip_raw(entries: &[(&str, &[u8])]) -> Vec<u8> {
        zip_with_options(entries, SimpleFileOptions::default())
    }

    pub(crate) fn zip_with_options(entries: &[(&str, &[u8])], options: SimpleFileOptions) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}
