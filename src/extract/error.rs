//! Error taxonomy for SQL extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort one extraction call.
///
/// None of these carry a partial mapping: an archive either yields its full
/// mapping or an error.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Archive path does not exist or cannot be read
    #[error("Archive not found or unreadable: {}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Byte stream is not a valid zip container
    #[error("{source_name} is not a valid packaged data source archive: {reason}")]
    NotAnArchive { source_name: String, reason: String },

    /// Descriptor entry is not UTF-8 or not well-formed XML
    #[error("Failed to parse descriptor '{document}' in {source_name}: {reason}")]
    MalformedDocument {
        source_name: String,
        document: String,
        reason: String,
    },

    /// Writing extracted SQL to the output directory failed
    #[error(transparent)]
    Persistence(#[from] PersistError),
}

/// Errors raised while writing the mapping to disk.
///
/// Files written before the failure stay on disk.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to create output directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    pub(crate) fn not_an_archive(source_name: &str, reason: impl ToString) -> Self {
        Self::NotAnArchive {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(source_name: &str, document: &str, reason: impl ToString) -> Self {
        Self::MalformedDocument {
            source_name: source_name.to_string(),
            document: document.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_source_and_document() {
        let err = ExtractError::malformed("sales.tdsx", "Data/sales.tds", "unexpected end of stream");
        let message = err.to_string();
        assert!(message.contains("sales.tdsx"));
        assert!(message.contains("Data/sales.tds"));

        let err = ExtractError::not_an_archive("broken.tdsx", "invalid Zip archive");
        assert!(err.to_string().contains("broken.tdsx"));
    }

    #[test]
    fn test_persist_error_converts() {
        let persist = PersistError::WriteFile {
            path: PathBuf::from("/out/q.sql"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let err: ExtractError = persist.into();
        assert!(matches!(err, ExtractError::Persistence(PersistError::WriteFile { .. })));
        assert!(err.to_string().contains("/out/q.sql"));
    }
}
