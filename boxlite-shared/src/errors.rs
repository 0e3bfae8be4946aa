//! Error types used across the storage layer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Coarse classification of a [`StorageError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedDriver,
    MountFailure,
    ImageFailure,
    CopyFailure,
    Filesystem,
    InvalidIdentifier,
    Config,
    Metadata,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unsupported storage driver: {0}")]
    UnsupportedDriver(String),

    #[error("mount operation on {} failed: {source}", target.display())]
    Mount {
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("block image operation on {} failed: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to inject file {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("metadata store error: {0}")]
    Metadata(String),
}

impl StorageError {
    pub fn mount(target: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        StorageError::Mount {
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn image(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        StorageError::Image {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn copy(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        StorageError::Copy {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        StorageError::Filesystem {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::UnsupportedDriver(_) => ErrorKind::UnsupportedDriver,
            StorageError::Mount { .. } => ErrorKind::MountFailure,
            StorageError::Image { .. } => ErrorKind::ImageFailure,
            StorageError::Copy { .. } => ErrorKind::CopyFailure,
            StorageError::Filesystem { .. } => ErrorKind::Filesystem,
            StorageError::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
            StorageError::Config(_) => ErrorKind::Config,
            StorageError::Metadata(_) => ErrorKind::Metadata,
        }
    }

    /// The OS-level error underneath, when there is one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            StorageError::Mount { source, .. }
            | StorageError::Image { source, .. }
            | StorageError::Copy { source, .. }
            | StorageError::Filesystem { source, .. } => Some(source),
            _ => None,
        }
    }
}
