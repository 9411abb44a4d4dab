//! Derived parent index over a chapter forest
//!
//! The forest is the source of truth. This index only caches
//! `id -> parent id` so that parent lookups are O(1) and ancestry checks
//! are upward walks bounded by tree depth. It is rebuilt on load and
//! patched incrementally by every mutation in [`ChapterTree`](super::ChapterTree).

use std::collections::{HashMap, HashSet};

use super::chapter::Chapter;
use super::id::ChapterId;
use super::tree::TreeError;

/// Parent map for every chapter in a book
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyIndex {
    /// `None` for top-level chapters
    parent_of: HashMap<ChapterId, Option<ChapterId>>,
}

impl HierarchyIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index for the given forest
    pub fn from_forest(forest: &[Chapter]) -> Self {
        let mut index = Self::new();
        index.rebuild(forest);
        index
    }

    /// Clears and repopulates the index by a pre-order traversal
    ///
    /// Duplicate ids keep their first-seen parent. Each duplicate is logged
    /// and returned so callers can surface it.
    pub fn rebuild(&mut self, forest: &[Chapter]) -> Vec<ChapterId> {
        self.parent_of.clear();
        let mut duplicates = Vec::new();

        let mut stack: Vec<(&Chapter, Option<&ChapterId>)> =
            forest.iter().rev().map(|c| (c, None)).collect();

        while let Some((node, parent)) = stack.pop() {
            if self.parent_of.contains_key(&node.id) {
                tracing::warn!("chapter id is repeated: {}", node.id);
                duplicates.push(node.id.clone());
            } else {
                self.parent_of.insert(node.id.clone(), parent.cloned());
            }
            stack.extend(node.children.iter().rev().map(|c| (c, Some(&node.id))));
        }

        duplicates
    }

    /// Registers a newly attached chapter
    pub fn insert(&mut self, id: ChapterId, parent: Option<ChapterId>) {
        self.parent_of.insert(id, parent);
    }

    /// Drops a chapter from the index
    pub fn remove(&mut self, id: &ChapterId) -> bool {
        self.parent_of.remove(id).is_some()
    }

    /// Records that `id` now hangs under `new_parent`
    ///
    /// The caller must already have spliced the node into its new sequence.
    pub fn record_move(&mut self, id: &ChapterId, new_parent: Option<ChapterId>) {
        if let Some(parent) = self.parent_of.get_mut(id) {
            *parent = new_parent;
        }
    }

    /// Returns true if the chapter is indexed
    pub fn contains(&self, id: &ChapterId) -> bool {
        self.parent_of.contains_key(id)
    }

    /// Number of indexed chapters
    pub fn len(&self) -> usize {
        self.parent_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent_of.is_empty()
    }

    /// Iterates over all indexed ids, in no particular order
    pub fn ids(&self) -> impl Iterator<Item = &ChapterId> {
        self.parent_of.keys()
    }

    /// Returns the parent id, `None` for top-level chapters
    pub fn parent(&self, id: &ChapterId) -> Result<Option<&ChapterId>, TreeError> {
        self.parent_of
            .get(id)
            .map(Option::as_ref)
            .ok_or_else(|| TreeError::ChapterNotFound(id.clone()))
    }

    /// Returns true if `parent` is the direct parent of `child`
    pub fn is_direct_parent(&self, parent: &ChapterId, child: &ChapterId) -> bool {
        matches!(self.parent_of.get(child), Some(Some(p)) if p == parent)
    }

    /// Returns true if the subtree rooted at `ancestor` contains `node`
    ///
    /// A chapter counts as its own ancestor.
    pub fn is_ancestor_of(&self, ancestor: &ChapterId, node: &ChapterId) -> bool {
        if ancestor == node {
            return true;
        }
        self.ancestors(node).iter().any(|id| id == ancestor)
    }

    /// Ancestors of `id`, nearest first
    ///
    /// The walk stops if it revisits a node, so a corrupted index cannot
    /// loop forever.
    pub fn ancestors(&self, id: &ChapterId) -> Vec<ChapterId> {
        let mut chain = Vec::new();
        let mut visited: HashSet<&ChapterId> = HashSet::new();
        visited.insert(id);

        let mut current = id;
        while let Some(Some(parent)) = self.parent_of.get(current) {
            if !visited.insert(parent) {
                tracing::warn!("cycle detected in chapter hierarchy at {}", parent);
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }

        chain
    }

    /// Ids from the top-level ancestor down to `id` inclusive
    pub fn path(&self, id: &ChapterId) -> Option<Vec<ChapterId>> {
        if !self.contains(id) {
            return None;
        }
        let mut path = self.ancestors(id);
        path.reverse();
        path.push(id.clone());
        Some(path)
    }

    /// Nesting depth, `0` for top-level chapters
    pub fn depth(&self, id: &ChapterId) -> Option<usize> {
        self.contains(id).then(|| self.ancestors(id).len())
    }
}
