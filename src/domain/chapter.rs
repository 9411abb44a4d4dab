//! Chapter and book domain model
//!
//! A book is an ordered forest of chapters. Each chapter owns its
//! sub-chapters; parentage is never stored on the node itself and is
//! derived by the [`HierarchyIndex`](super::HierarchyIndex).
//!
//! The serde shape of these types is the metadata document format:
//! camelCase keys, epoch-millisecond timestamps, and a recursive
//! `chapters` list that defaults to empty when absent.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::ChapterId;
use super::tree::TreeError;

/// Returns the current time truncated to millisecond precision
///
/// Timestamps are persisted as epoch milliseconds, so anything finer
/// would not survive a save/load cycle.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// A validated, non-blank display title
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Title(String);

impl Title {
    /// Validates and trims a raw title
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TreeError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TreeError::InvalidTitle(raw.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Title {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A node of the chapter forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,

    pub title: String,

    #[serde(rename = "createdTime", with = "ts_milliseconds", default)]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedTime", with = "ts_milliseconds", default)]
    pub updated_at: DateTime<Utc>,

    /// Sub-chapters in reading order
    #[serde(rename = "chapters", default)]
    pub children: Vec<Chapter>,
}

impl Chapter {
    /// Creates a leaf chapter stamped with the current time
    pub fn new(id: ChapterId, title: Title) -> Self {
        let now = now_millis();
        Self {
            id,
            title: title.into_string(),
            created_at: now,
            updated_at: now,
            children: Vec::new(),
        }
    }

    /// Replaces the title and bumps `updated_at`
    pub fn rename(&mut self, title: Title) {
        self.title = title.into_string();
        self.updated_at = now_millis();
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Ids of this chapter and all of its descendants, in pre-order
    pub fn subtree_ids(&self) -> Vec<ChapterId> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.id.clone());
            stack.extend(node.children.iter().rev());
        }
        ids
    }
}

/// Root aggregate: book-level metadata plus the top-level chapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,

    #[serde(rename = "createdTime", with = "ts_milliseconds", default)]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedTime", with = "ts_milliseconds", default)]
    pub updated_at: DateTime<Utc>,

    #[serde(rename = "chapters", default)]
    pub roots: Vec<Chapter>,
}

impl Book {
    /// Creates an empty book
    pub fn new(title: Title) -> Self {
        let now = now_millis();
        Self {
            title: title.into_string(),
            created_at: now,
            updated_at: now,
            roots: Vec::new(),
        }
    }

    /// Stamps `updated_at` with the current time
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    /// Total number of chapters at every level
    pub fn chapter_count(&self) -> usize {
        self.roots.iter().map(|c| c.subtree_ids().len()).sum()
    }
}
