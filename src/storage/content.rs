//! Chapter content files
//!
//! Every chapter may own a markdown file at `<book root>/chapters/<id>.md`.
//! The contents are opaque to gtbook; only creation of a stub, removal of
//! deleted chapters' files and orphan detection happen here.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::BookError;
use crate::domain::{ChapterId, HierarchyIndex, Title};

/// Directory holding content files inside a book root
pub const CONTENT_DIR: &str = "chapters";

/// Initial contents written for a new chapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StubStyle {
    /// `# <title>`
    #[default]
    Heading,
    /// A single newline
    Blank,
}

impl StubStyle {
    pub fn render(&self, title: &Title) -> String {
        match self {
            StubStyle::Heading => format!("# {title}\n"),
            StubStyle::Blank => "\n".to_string(),
        }
    }
}

/// Content file access for one book
#[derive(Debug, Clone)]
pub struct ContentFiles {
    dir: PathBuf,
}

impl ContentFiles {
    pub fn new(book_root: &Path) -> Self {
        Self {
            dir: book_root.join(CONTENT_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the content file for a chapter
    pub fn path_for(&self, id: &ChapterId) -> PathBuf {
        self.dir.join(id.file_name())
    }

    /// Writes the stub for a new chapter
    ///
    /// An existing file is left untouched; returns whether a file was written.
    pub fn create_stub(
        &self,
        id: &ChapterId,
        title: &Title,
        style: StubStyle,
    ) -> Result<bool, BookError> {
        let path = self.path_for(id);
        let persist_err = |source: io::Error| BookError::PersistenceFailure {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(persist_err)?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path.display(), "content file already exists");
                return Ok(false);
            }
            Err(e) => return Err(persist_err(e)),
        };
        file.write_all(style.render(title).as_bytes())
            .map_err(persist_err)?;

        Ok(true)
    }

    /// Deletes the content files of the given chapters
    ///
    /// Missing files are skipped. Returns the paths actually removed.
    pub fn remove(&self, ids: &[ChapterId]) -> Result<Vec<PathBuf>, BookError> {
        let mut removed = Vec::new();
        for id in ids {
            let path = self.path_for(id);
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(BookError::PersistenceFailure { path, source }),
            }
        }
        Ok(removed)
    }

    /// Content files whose chapter is no longer in the book, sorted by path
    pub fn orphans(&self, index: &HierarchyIndex) -> Result<Vec<PathBuf>, BookError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(BookError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut orphans = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| BookError::Io {
                    path: self.dir.clone(),
                    source,
                })?
                .path();

            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let known = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<ChapterId>().ok())
                .is_some_and(|id| index.contains(&id));
            if !known {
                orphans.push(path);
            }
        }

        orphans.sort();
        Ok(orphans)
    }
}
