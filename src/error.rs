//! Error types.
//!
//! Only the precondition variants abort a run. Every other `OrganizeError`
//! is scoped to a single file: it is logged, recorded in the run report and
//! the run moves on to the next file.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while organizing a source tree.
#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("Source directory does not exist: {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("Source path is not a directory: {}", path.display())]
    SourceNotDirectory { path: PathBuf },

    #[error("Destination is the source directory: {}", path.display())]
    DestinationIsSource { path: PathBuf },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {}: {reason}", path.display())]
    Walk { path: PathBuf, reason: String },

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl OrganizeError {
    /// True for errors that stop the run before any file is touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::SourceMissing { .. }
                | Self::SourceNotDirectory { .. }
                | Self::DestinationIsSource { .. }
        )
    }
}

/// Reasons embedded capture-time metadata could not be used.
///
/// These never leave the `timestamp` module; the resolver falls back to the
/// file's modification time instead.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("cannot open file: {0}")]
    Open(#[from] std::io::Error),

    #[error("no readable EXIF block: {0}")]
    Exif(#[from] exif::Error),

    #[error("no capture date field")]
    MissingDate,

    #[error("unparsable capture date {value:?}")]
    InvalidDate { value: String },
}

/// Top-level error for the command-line front end.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Organize(#[from] OrganizeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for organizer operations.
pub type OrganizeResult<T> = std::result::Result<T, OrganizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_errors() {
        let missing = OrganizeError::SourceMissing {
            path: PathBuf::from("/nope"),
        };
        assert!(missing.is_precondition());

        let same = OrganizeError::DestinationIsSource {
            path: PathBuf::from("/photos"),
        };
        assert!(same.is_precondition());

        let copy = OrganizeError::Copy {
            from: PathBuf::from("/a/b.jpg"),
            to: PathBuf::from("/c/b.jpg"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!copy.is_precondition());
    }

    #[test]
    fn test_copy_error_mentions_both_paths() {
        let error = OrganizeError::Copy {
            from: PathBuf::from("/src/clip.mov"),
            to: PathBuf::from("/dst/videos/clip.mov"),
            source: std::io::Error::other("disk full"),
        };
        let message = error.to_string();
        assert!(message.contains("/src/clip.mov"));
        assert!(message.contains("/dst/videos/clip.mov"));
        assert!(message.contains("disk full"));
    }
}
