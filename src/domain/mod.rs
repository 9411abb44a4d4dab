//! Domain models for gtbook
//!
//! Contains the chapter hierarchy engine without any I/O concerns.

mod id;
mod chapter;
mod hierarchy;
mod tree;

pub use id::{ChapterId, IdError};
pub use chapter::{now_millis, Book, Chapter, Title};
pub use hierarchy::HierarchyIndex;
pub use tree::{ChapterTree, Direction, TreeError};
