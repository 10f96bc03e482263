//! SQL extraction pipeline.
//!
//! [`SqlExtractor`] runs the stages for one archive:
//! 1. **Open**: validate the zip container
//! 2. **Discover**: list descriptor entries (`*.tds`)
//! 3. **Scan**: parse each descriptor and collect labelled SQL
//! 4. **Persist** (optional): write one `.sql` file per entry
//!
//! Each call is independent; the archive handle is dropped before returning.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use crate::extract::archive::{TdsxArchive, DESCRIPTOR_SUFFIX};
use crate::extract::descriptor::{parse_descriptor, SqlKind};
use crate::extract::error::ExtractError;
use crate::extract::sink;
use crate::model::SqlMapping;

// ============================================================================
// Pipeline Types
// ============================================================================

/// Options for one extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory receiving one `.sql` file per entry; nothing is written when `None`
    pub output_dir: Option<PathBuf>,

    /// Suffix identifying descriptor entries (default: `.tds`)
    pub descriptor_suffix: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            descriptor_suffix: DESCRIPTOR_SUFFIX.to_string(),
        }
    }
}

impl ExtractOptions {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_descriptor_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.descriptor_suffix = suffix.into();
        self
    }
}

/// Result of one extraction.
#[derive(Debug)]
pub struct Extraction {
    /// Extracted label → SQL mapping
    pub mapping: SqlMapping,

    /// Files written to the output directory, in mapping order
    pub written: Vec<PathBuf>,

    /// Processing statistics
    pub stats: ExtractStats,
}

/// Statistics about one extraction.
#[derive(Debug, Default, Clone)]
pub struct ExtractStats {
    /// Descriptor documents parsed
    pub descriptors_processed: usize,

    /// Entries taken from `type="text"` relations
    pub custom_sql: usize,

    /// Entries taken from `one-time-sql` attributes
    pub initial_sql: usize,

    /// Entries whose label was suffixed to avoid a collision
    pub renamed_labels: usize,

    /// Wall time for the whole call (milliseconds)
    pub total_duration_ms: u64,
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Extracts custom SQL from packaged data source archives.
#[derive(Debug, Clone, Default)]
pub struct SqlExtractor {
    options: ExtractOptions,
}

impl SqlExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Extracts SQL from the archive file at `path`.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::NotFound`] before any parsing if `path` cannot be opened
    /// - [`ExtractError::NotAnArchive`] if the file is not a zip container
    /// - [`ExtractError::MalformedDocument`] if any descriptor fails to parse
    /// - [`ExtractError::Persistence`] if writing to the output directory fails
    pub fn extract_path(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let archive = TdsxArchive::open(path, &self.options.descriptor_suffix)?;
        self.extract_archive(archive)
    }

    /// Like [`extract_path`](Self::extract_path), but names the archive
    /// `source_name` in logs and errors.
    pub fn extract_file(&self, path: &Path, source_name: &str) -> Result<Extraction, ExtractError> {
        let archive = TdsxArchive::open_as(path, source_name, &self.options.descriptor_suffix)?;
        self.extract_archive(archive)
    }

    /// Extracts SQL from archive bytes held in memory.
    pub fn extract_bytes(
        &self,
        source_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Extraction, ExtractError> {
        let archive = TdsxArchive::from_bytes(source_name, bytes, &self.options.descriptor_suffix)?;
        self.extract_archive(archive)
    }

    /// Extracts SQL from an opened archive, consuming it.
    pub fn extract_archive<R: Read + Seek>(
        &self,
        mut archive: TdsxArchive<R>,
    ) -> Result<Extraction, ExtractError> {
        let start = Instant::now();
        let mut stats = ExtractStats::default();
        let mut mapping = SqlMapping::new();

        // ====================================================================
        // Stage 1: Discover
        // ====================================================================

        let descriptors: Vec<String> = archive.descriptor_names().map(str::to_owned).collect();

        if descriptors.is_empty() {
            warn!(
                source = archive.source_name(),
                suffix = %self.options.descriptor_suffix,
                "No descriptor found in the packaged data source"
            );
        }

        // ====================================================================
        // Stage 2: Scan
        // ====================================================================

        for document in &descriptors {
            info!(source = archive.source_name(), document = %document, "Processing descriptor");

            let text = archive.read_descriptor(document)?;
            let found = parse_descriptor(archive.source_name(), document, &text)?;
            stats.descriptors_processed += 1;

            for item in found {
                match item.kind {
                    SqlKind::CustomSql => stats.custom_sql += 1,
                    SqlKind::InitialSql => stats.initial_sql += 1,
                }

                let label = mapping.insert(item.label.as_str(), item.sql);
                if label != item.label {
                    stats.renamed_labels += 1;
                    warn!(
                        document = %document,
                        requested = %item.label,
                        label = %label,
                        "Duplicate label, keeping both entries"
                    );
                }
                info!(document = %document, label = %label, "Found SQL");
            }
        }

        // ====================================================================
        // Stage 3: Persist
        // ====================================================================

        // Release the archive before touching the output directory.
        drop(archive);

        let written = match &self.options.output_dir {
            Some(dir) if !mapping.is_empty() => sink::persist(&mapping, dir)?,
            _ => Vec::new(),
        };

        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            entries = mapping.len(),
            descriptors = stats.descriptors_processed,
            written = written.len(),
            duration_ms = stats.total_duration_ms,
            "Extraction completed"
        );

        Ok(Extraction {
            mapping,
            written,
            stats,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
