//! gtbook - a book organized as a tree of markdown chapters
//!
//! A book is a folder holding `gtbook.yaml`, which records the book title
//! and an ordered forest of chapters, plus one markdown file per chapter
//! under `chapters/`. The library keeps the forest and its parent index in
//! sync through every edit (create, rename, delete, reorder, reparent) and
//! writes the document after each change.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{Book, Chapter, ChapterId, ChapterTree, Direction, Title};
pub use storage::{BookError, BookRegistry, TreeStore};
