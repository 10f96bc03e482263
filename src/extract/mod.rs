//! Extract module - custom SQL extraction from packaged data sources.
//!
//! This module provides the core of the extractor:
//! - **Archive**: zip container access and descriptor discovery via [`TdsxArchive`]
//! - **Descriptor**: XML walk and label derivation via [`parse_descriptor`]
//! - **Pipeline**: one-call extraction via [`SqlExtractor`]
//! - **Sink**: `.sql` file persistence via [`persist`]
//! - **Errors**: [`ExtractError`] and [`PersistError`]

pub mod archive;
pub mod descriptor;
pub mod error;
pub mod pipeline;
pub mod sink;

// Re-export commonly used types
pub use archive::{TdsxArchive, DESCRIPTOR_SUFFIX};
pub use descriptor::{parse_descriptor, scan_document, FoundSql, SqlKind};
pub use error::{ExtractError, PersistError};
pub use pipeline::{ExtractOptions, ExtractStats, Extraction, SqlExtractor};
pub use sink::{persist, sanitize_label, SQL_EXTENSION};
