//! # Storage Layer
//!
//! Persistence for gtbook books using plain, git-friendly files.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Chapter tree | YAML | `<book>/gtbook.yaml` |
//! | Chapter content | Markdown | `<book>/chapters/{id}.md` |
//! | Config | TOML | `~/.config/gtbook/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - A book is mutated through `&mut` [`TreeStore`], one writer at a time
//! - Metadata writes are atomic (locked temp file + rename)
//!
//! ## Book Structure
//!
//! ```text
//! My Book/
//! ├── gtbook.yaml            # Title, timestamps, chapter forest
//! └── chapters/
//!     ├── m2k9x0ab-3f9c1e.md # One file per chapter
//!     └── m2k9x0ac-71d0aa.md
//! ```
//!
//! ## Key Types
//!
//! - [`BookRegistry`] - Entry point; loads and caches books by root path
//! - [`TreeStore`] - A loaded book with the mutation API
//! - [`ContentFiles`] - Chapter markdown files
//! - [`Config`] - User configuration

mod error;
mod metadata;
mod tree_store;
mod registry;
mod content;
mod vcs;
mod config;

pub use error::BookError;
pub use metadata::{decode, encode, fresh_document, load_book, metadata_path, METADATA_FILE};
pub use tree_store::TreeStore;
pub use registry::{
    find_book_root, validate_book_folder_name, BookEvent, BookRegistry, ListenerId,
    INVALID_FOLDER_CHARS,
};
pub use content::{ContentFiles, StubStyle, CONTENT_DIR};
pub use vcs::{GitCli, RepoStatus, VersionControl};
pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, CONFIG_ENV};
