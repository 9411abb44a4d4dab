//! Errors surfaced by book storage operations

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{ChapterId, TreeError};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("Chapter not found: {0}")]
    ChapterNotFound(ChapterId),

    #[error("No gtbook metadata document at {0}")]
    DocumentNotFound(PathBuf),

    #[error("Malformed metadata document: {0}")]
    MalformedDocument(String),

    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("Failed to serialize book: {0}")]
    Serialize(String),

    /// The in-memory tree already holds the change; only the write failed.
    #[error("Failed to persist {path}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("A gtbook already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BookError {
    /// True for unknown chapter ids and missing metadata documents
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BookError::ChapterNotFound(_) | BookError::DocumentNotFound(_)
        )
    }
}

impl From<TreeError> for BookError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::ChapterNotFound(id) => BookError::ChapterNotFound(id),
            TreeError::InvalidTitle(raw) => {
                BookError::InvalidTitle(format!("{raw:?} (titles cannot be empty)"))
            }
        }
    }
}
