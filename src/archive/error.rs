//! Error types for archive building.
//!
//! Filesystem failures carry the path and the operation that failed, added
//! through the [`ErrorExt`] trait.

use std::{io, path::PathBuf};
use thiserror::Error as DeriveError;

/// Errors returned while building a release archive.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum ArchiveError {
    /// File system error with path context.
    ///
    /// Covers unreadable source trees and failed writes, including a full disk.
    #[error("{context} {path}: {error}")]
    Io {
        /// Operation that failed (e.g., "reading source file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// The source tree contains no entries.
    #[error("source tree {path} is empty, refusing to build an empty archive")]
    EmptyInput {
        /// Source root that was walked
        path: PathBuf,
    },

    /// The source root exists but is not a directory.
    #[error("source root {path} is not a directory")]
    NotADirectory {
        /// Offending path
        path: PathBuf,
    },

    /// Error walking the source tree.
    #[error("{0}")]
    Walk(#[from] walkdir::Error),

    /// ZIP archive writing error.
    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    /// Blocking archive task was cancelled or panicked.
    #[error("archive task failed: {0}")]
    Task(String),
}

impl ArchiveError {
    /// Whether the error originated from the local filesystem.
    pub fn is_io(&self) -> bool {
        match self {
            ArchiveError::Io { .. } => true,
            ArchiveError::Walk(e) => e.io_error().is_some(),
            ArchiveError::Zip(zip::result::ZipError::Io(_)) => true,
            _ => false,
        }
    }
}

/// Convenient type alias for archive results.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Extension trait for filesystem operations with automatic path context.
///
/// ```no_run
/// # use std::path::Path;
/// use release_packager::archive::{ErrorExt, Result};
///
/// fn read_manifest(path: &Path) -> Result<String> {
///     std::fs::read_to_string(path).fs_context("reading manifest", path)
/// }
/// ```
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| ArchiveError::Io {
            context,
            path: path.into(),
            error,
        })
    }
}
