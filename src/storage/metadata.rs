//! Metadata document codec
//!
//! Each book keeps its chapter forest in a single YAML document,
//! `<book root>/gtbook.yaml`:
//!
//! ```yaml
//! # gtbook metadata
//! title: My Book
//! createdTime: 1700000000000
//! updatedTime: 1700000000000
//! chapters:
//! - id: m2k9x0ab-3f9c1e
//!   title: Introduction
//!   createdTime: 1700000000000
//!   updatedTime: 1700000000000
//!   chapters: []
//! ```
//!
//! Writes go to a locked temp file which is then renamed over the document.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::error::BookError;
use crate::domain::{Book, Title};

/// File name of the metadata document inside a book root
pub const METADATA_FILE: &str = "gtbook.yaml";

const HEADER: &str = "# gtbook metadata\n";

/// Returns the metadata document path for a book root
pub fn metadata_path(root: &Path) -> PathBuf {
    root.join(METADATA_FILE)
}

/// Parses a metadata document
///
/// Missing `chapters` lists and timestamps fall back to defaults at every
/// level. A blank document, a document whose top level is not a mapping,
/// or one without a `title` is malformed.
pub fn decode(text: &str) -> Result<Book, BookError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| BookError::MalformedDocument(e.to_string()))?;

    match value {
        serde_yaml::Value::Null => Err(BookError::MalformedDocument(
            "document is empty".to_string(),
        )),
        serde_yaml::Value::Mapping(_) => serde_yaml::from_value(value)
            .map_err(|e| BookError::MalformedDocument(e.to_string())),
        _ => Err(BookError::MalformedDocument(
            "top level must be a mapping".to_string(),
        )),
    }
}

/// Stamps `updated_at` and serializes the book
pub fn encode(book: &mut Book) -> Result<String, BookError> {
    book.touch();
    let body = serde_yaml::to_string(&*book)
        .map_err(|e| BookError::Serialize(e.to_string()))?;
    Ok(format!("{HEADER}{body}"))
}

/// A minimal document for a new, empty book
pub fn fresh_document(title: &Title) -> Result<String, BookError> {
    encode(&mut Book::new(title.clone()))
}

/// Reads the raw metadata document of a book root
pub fn read_document(root: &Path) -> Result<String, BookError> {
    let path = metadata_path(root);
    fs::read_to_string(&path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => BookError::DocumentNotFound(path.clone()),
        _ => BookError::Io {
            path: path.clone(),
            source,
        },
    })
}

/// Reads and decodes the metadata document of a book root
pub fn load_book(root: &Path) -> Result<Book, BookError> {
    decode(&read_document(root)?)
}

/// Atomically replaces the document at `path` with `text`
pub fn write_document(path: &Path, text: &str) -> Result<(), BookError> {
    write_atomic(path, text).map_err(|source| BookError::PersistenceFailure {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "wrote metadata document");
    Ok(())
}

fn write_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("yaml.tmp");
    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        file.lock_exclusive()?;

        let mut writer = BufWriter::new(&file);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)
}
