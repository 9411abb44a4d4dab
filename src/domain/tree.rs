//! In-memory chapter tree
//!
//! [`ChapterTree`] pairs a [`Book`] with its [`HierarchyIndex`] and is the
//! only type that mutates the forest. Every mutation validates its inputs
//! before touching anything, then splices the forest and patches the index
//! so the two never diverge. No I/O happens here; persistence is layered on
//! top by the storage module.

use std::collections::HashSet;

use thiserror::Error;

use super::chapter::{Book, Chapter, Title};
use super::hierarchy::HierarchyIndex;
use super::id::ChapterId;

#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("Chapter not found: {0}")]
    ChapterNotFound(ChapterId),

    #[error("Invalid title: {0:?} (titles cannot be empty)")]
    InvalidTitle(String),
}

/// Direction for moving a chapter among its siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A book together with its derived parent index
#[derive(Debug, Clone)]
pub struct ChapterTree {
    book: Book,
    index: HierarchyIndex,
    /// Set when the forest holds a repeated id; such trees are reindexed
    /// after structural edits instead of patched.
    has_duplicates: bool,
}

impl ChapterTree {
    /// Wraps a book and builds its index
    pub fn new(book: Book) -> Self {
        let mut index = HierarchyIndex::new();
        let has_duplicates = !index.rebuild(&book.roots).is_empty();
        Self {
            book,
            index,
            has_duplicates,
        }
    }

    /// Returns the underlying book
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Mutable access for book-level fields only; the index is rebuilt
    /// by [`ChapterTree::reindex`] if the forest itself changes.
    pub(crate) fn book_mut(&mut self) -> &mut Book {
        &mut self.book
    }

    /// Consumes the tree, returning the book
    pub fn into_book(self) -> Book {
        self.book
    }

    /// Returns the parent index
    pub fn index(&self) -> &HierarchyIndex {
        &self.index
    }

    /// Top-level chapters in order
    pub fn roots(&self) -> &[Chapter] {
        &self.book.roots
    }

    /// Rebuilds the index from scratch, returning duplicate ids
    pub fn reindex(&mut self) -> Vec<ChapterId> {
        let duplicates = self.index.rebuild(&self.book.roots);
        self.has_duplicates = !duplicates.is_empty();
        duplicates
    }

    /// Returns true if the index matches a fresh rebuild of the forest
    pub fn is_coherent(&self) -> bool {
        HierarchyIndex::from_forest(&self.book.roots) == self.index
    }

    pub fn contains(&self, id: &ChapterId) -> bool {
        self.index.contains(id)
    }

    /// Looks up a chapter by id
    ///
    /// Only parents are indexed, so this walks the path from the top and
    /// scans each level's siblings: O(depth x siblings).
    pub fn chapter(&self, id: &ChapterId) -> Option<&Chapter> {
        let path = self.index.path(id)?;
        let mut level: &[Chapter] = &self.book.roots;
        let mut found = None;
        for step in &path {
            let node = level.iter().find(|c| &c.id == step)?;
            level = &node.children;
            found = Some(node);
        }
        found
    }

    fn chapter_mut(&mut self, id: &ChapterId) -> Option<&mut Chapter> {
        let path = self.index.path(id)?;
        let (last, prefix) = path.split_last()?;
        let mut level = &mut self.book.roots;
        for step in prefix {
            level = &mut level.iter_mut().find(|c| &c.id == step)?.children;
        }
        level.iter_mut().find(|c| &c.id == last)
    }

    /// The sequence owning the children of `parent` (`roots` for `None`)
    fn sequence_mut(&mut self, parent: Option<&ChapterId>) -> Result<&mut Vec<Chapter>, TreeError> {
        match parent {
            None => Ok(&mut self.book.roots),
            Some(id) => self
                .chapter_mut(id)
                .map(|c| &mut c.children)
                .ok_or_else(|| TreeError::ChapterNotFound(id.clone())),
        }
    }

    /// Returns the parent chapter, `None` for top-level chapters
    pub fn parent(&self, id: &ChapterId) -> Result<Option<&Chapter>, TreeError> {
        match self.index.parent(id)? {
            Some(parent_id) => Ok(self.chapter(parent_id)),
            None => Ok(None),
        }
    }

    /// Chapters in display order with their nesting depth
    pub fn walk(&self) -> Vec<(usize, &Chapter)> {
        let mut out = Vec::with_capacity(self.index.len());
        let mut stack: Vec<(usize, &Chapter)> =
            self.book.roots.iter().rev().map(|c| (0, c)).collect();
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
        }
        out
    }

    /// Appends a new chapter under `parent` (or at the top level)
    pub fn create(
        &mut self,
        parent: Option<&ChapterId>,
        title: Title,
    ) -> Result<Chapter, TreeError> {
        if let Some(parent_id) = parent {
            if !self.index.contains(parent_id) {
                return Err(TreeError::ChapterNotFound(parent_id.clone()));
            }
        }

        let mut id = ChapterId::new();
        while self.index.contains(&id) {
            id = ChapterId::new();
        }

        let chapter = Chapter::new(id, title);
        self.sequence_mut(parent)?.push(chapter.clone());
        self.index.insert(chapter.id.clone(), parent.cloned());

        tracing::debug!(id = %chapter.id, parent = ?parent.map(ChapterId::as_str), "created chapter");
        Ok(chapter)
    }

    /// Changes a chapter's title
    pub fn rename(&mut self, id: &ChapterId, title: Title) -> Result<(), TreeError> {
        let chapter = self
            .chapter_mut(id)
            .ok_or_else(|| TreeError::ChapterNotFound(id.clone()))?;
        chapter.rename(title);
        tracing::debug!(%id, "renamed chapter");
        Ok(())
    }

    /// Removes a chapter and its whole subtree
    ///
    /// Returns every removed id in pre-order, so the caller can reap the
    /// matching content files.
    pub fn delete(&mut self, id: &ChapterId) -> Result<Vec<ChapterId>, TreeError> {
        let removed = self.detach(id)?;
        let ids = removed.subtree_ids();
        if self.has_duplicates {
            // Another copy of a removed id may still sit elsewhere.
            self.reindex();
        } else {
            for removed_id in &ids {
                self.index.remove(removed_id);
            }
        }
        tracing::debug!(%id, count = ids.len(), "deleted chapter subtree");
        Ok(ids)
    }

    /// Swaps a chapter with its previous or next sibling
    ///
    /// Returns false, changing nothing, if the id is unknown or the chapter
    /// is already first (`Up`) or last (`Down`).
    pub fn move_sibling(&mut self, id: &ChapterId, direction: Direction) -> bool {
        let Ok(parent) = self.index.parent(id) else {
            return false;
        };
        let parent = parent.cloned();
        let Ok(siblings) = self.sequence_mut(parent.as_ref()) else {
            return false;
        };
        let Some(pos) = siblings.iter().position(|c| &c.id == id) else {
            return false;
        };

        let other = match direction {
            Direction::Up if pos > 0 => pos - 1,
            Direction::Down if pos + 1 < siblings.len() => pos + 1,
            _ => return false,
        };
        siblings.swap(pos, other);
        tracing::debug!(%id, ?direction, "moved chapter among siblings");
        true
    }

    /// Reduces a selection to its local roots
    ///
    /// A selected chapter whose direct parent is also selected moves along
    /// with that parent and is dropped. Unknown and repeated ids are
    /// dropped too. Selection order is preserved.
    pub fn local_roots(&self, sources: &[ChapterId]) -> Vec<ChapterId> {
        let selected: HashSet<&ChapterId> = sources
            .iter()
            .filter(|id| self.index.contains(id))
            .collect();
        let mut seen = HashSet::new();

        sources
            .iter()
            .filter(|id| self.index.contains(id))
            .filter(|id| seen.insert(*id))
            .filter(|id| match self.index.parent(id) {
                Ok(Some(parent)) => !selected.contains(parent),
                _ => true,
            })
            .cloned()
            .collect()
    }

    /// Reparents a selection of chapters under `target` (top level if `None`)
    ///
    /// The selection is first reduced to local roots. For a top-level
    /// target, roots already at the top are skipped. Otherwise roots that
    /// contain the target (moving them would create a cycle) are skipped,
    /// then roots already directly under the target. The rest are appended
    /// to the target in selection order. Returns the ids actually moved.
    pub fn move_subtree(
        &mut self,
        target: Option<&ChapterId>,
        sources: &[ChapterId],
    ) -> Result<Vec<ChapterId>, TreeError> {
        if let Some(target_id) = target {
            if !self.index.contains(target_id) {
                return Err(TreeError::ChapterNotFound(target_id.clone()));
            }
        }

        let mut to_move = self.local_roots(sources);

        match target {
            None => to_move.retain(|id| !matches!(self.index.parent(id), Ok(None))),
            Some(target_id) => {
                to_move.retain(|id| !self.index.is_ancestor_of(id, target_id));
                to_move.retain(|id| !self.index.is_direct_parent(target_id, id));
            }
        }

        for id in &to_move {
            self.reparent(id, target)?;
        }
        if self.has_duplicates && !to_move.is_empty() {
            self.reindex();
        }

        if !to_move.is_empty() {
            tracing::debug!(
                count = to_move.len(),
                target = ?target.map(ChapterId::as_str),
                "moved chapter subtrees"
            );
        }
        Ok(to_move)
    }

    fn reparent(&mut self, id: &ChapterId, target: Option<&ChapterId>) -> Result<(), TreeError> {
        debug_assert!(target.map_or(true, |t| !self.index.is_ancestor_of(id, t)));

        let node = self.detach(id)?;
        match self.sequence_mut(target) {
            Ok(sequence) => {
                sequence.push(node);
                self.index.record_move(id, target.cloned());
                Ok(())
            }
            Err(err) => {
                // Target vanished: keep the node reachable at the top level.
                self.book.roots.push(node);
                self.index.record_move(id, None);
                Err(err)
            }
        }
    }

    /// Removes a chapter from its owning sequence without touching the index
    fn detach(&mut self, id: &ChapterId) -> Result<Chapter, TreeError> {
        let parent = self.index.parent(id)?.cloned();
        let sequence = self.sequence_mut(parent.as_ref())?;
        let pos = sequence
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| TreeError::ChapterNotFound(id.clone()))?;
        Ok(sequence.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ChapterId {
        s.parse().unwrap()
    }

    fn node(name: &str, children: Vec<Chapter>) -> Chapter {
        let mut c = Chapter::new(id(name), Title::new(name).unwrap());
        c.children = children;
        c
    }

    fn tree(roots: Vec<Chapter>) -> ChapterTree {
        let mut book = Book::new(Title::new("Book").unwrap());
        book.roots = roots;
        ChapterTree::new(book)
    }

    fn ids(chapters: &[Chapter]) -> Vec<String> {
        chapters.iter().map(|c| c.id.to_string()).collect()
    }

    /// roots [A], A.children = [B, C]
    fn abc() -> ChapterTree {
        tree(vec![node("A", vec![node("B", vec![]), node("C", vec![])])])
    }

    #[test]
    fn create_top_level_and_nested() {
        let mut t = tree(vec![]);
        let top = t.create(None, Title::new("Top").unwrap()).unwrap();
        let child = t.create(Some(&top.id), Title::new("Child").unwrap()).unwrap();

        assert_eq!(t.roots().len(), 1);
        assert_eq!(t.chapter(&child.id).unwrap().title, "Child");
        assert_eq!(t.parent(&child.id).unwrap().unwrap().id, top.id);
        assert!(t.is_coherent());
    }

    #[test]
    fn create_appends_in_order() {
        let mut t = abc();
        let d = t.create(Some(&id("A")), Title::new("D").unwrap()).unwrap();

        assert_eq!(
            ids(&t.chapter(&id("A")).unwrap().children),
            vec!["B".to_string(), "C".to_string(), d.id.to_string()]
        );
    }

    #[test]
    fn create_under_unknown_parent_fails_untouched() {
        let mut t = abc();
        let before = t.book().clone();

        let err = t.create(Some(&id("nope")), Title::new("X").unwrap()).unwrap_err();

        assert_eq!(err, TreeError::ChapterNotFound(id("nope")));
        assert_eq!(t.book(), &before);
    }

    #[test]
    fn rename_changes_title() {
        let mut t = abc();
        t.rename(&id("C"), Title::new("Renamed").unwrap()).unwrap();

        assert_eq!(t.chapter(&id("C")).unwrap().title, "Renamed");
        assert_eq!(
            t.rename(&id("zz"), Title::new("X").unwrap()),
            Err(TreeError::ChapterNotFound(id("zz")))
        );
    }

    #[test]
    fn delete_removes_subtree_from_index() {
        let mut t = tree(vec![
            node("A", vec![node("B", vec![node("D", vec![])]), node("C", vec![])]),
            node("E", vec![]),
        ]);

        let removed = t.delete(&id("B")).unwrap();

        assert_eq!(removed, vec![id("B"), id("D")]);
        assert!(t.index().parent(&id("D")).is_err());
        assert!(t.chapter(&id("B")).is_none());
        assert_eq!(ids(&t.chapter(&id("A")).unwrap().children), vec!["C"]);
        assert!(t.is_coherent());
    }

    #[test]
    fn delete_top_level() {
        let mut t = abc();
        let removed = t.delete(&id("A")).unwrap();

        assert_eq!(removed.len(), 3);
        assert!(t.roots().is_empty());
        assert!(t.index().is_empty());
    }

    #[test]
    fn delete_repeated_id_keeps_other_copy_indexed() {
        let mut t = tree(vec![
            node("a", vec![node("x", vec![])]),
            node("b", vec![node("x", vec![])]),
        ]);
        assert!(t.is_coherent());

        let removed = t.delete(&id("x")).unwrap();

        assert_eq!(removed, vec![id("x")]);
        assert!(t.chapter(&id("a")).unwrap().is_leaf());
        assert!(t.index().is_direct_parent(&id("b"), &id("x")));
        assert!(t.is_coherent());

        t.rename(&id("x"), Title::new("Survivor").unwrap()).unwrap();
        assert_eq!(t.chapter(&id("x")).unwrap().title, "Survivor");
    }

    #[test]
    fn move_repeated_id_stays_coherent() {
        let mut t = tree(vec![
            node("a", vec![node("x", vec![])]),
            node("b", vec![node("x", vec![])]),
            node("c", vec![]),
        ]);

        let moved = t.move_subtree(Some(&id("c")), &[id("x")]).unwrap();

        assert_eq!(moved, vec![id("x")]);
        assert!(t.chapter(&id("a")).unwrap().is_leaf());
        assert!(t.is_coherent());
    }

    #[test]
    fn delete_unknown_fails() {
        let mut t = abc();
        assert_eq!(t.delete(&id("x")), Err(TreeError::ChapterNotFound(id("x"))));
    }

    #[test]
    fn move_sibling_scenario() {
        let mut t = abc();

        assert!(t.move_sibling(&id("C"), Direction::Up));
        assert_eq!(ids(&t.chapter(&id("A")).unwrap().children), vec!["C", "B"]);

        let moved = t.move_subtree(None, &[id("B")]).unwrap();
        assert_eq!(moved, vec![id("B")]);
        assert_eq!(ids(t.roots()), vec!["A", "B"]);
        assert_eq!(ids(&t.chapter(&id("A")).unwrap().children), vec!["C"]);
        assert!(t.is_coherent());
    }

    #[test]
    fn move_sibling_at_edges_is_noop() {
        let mut t = abc();

        assert!(!t.move_sibling(&id("B"), Direction::Up));
        assert!(!t.move_sibling(&id("C"), Direction::Down));
        assert!(!t.move_sibling(&id("A"), Direction::Up));
        assert!(!t.move_sibling(&id("missing"), Direction::Down));
        assert_eq!(ids(&t.chapter(&id("A")).unwrap().children), vec!["B", "C"]);
    }

    #[test]
    fn move_sibling_among_roots() {
        let mut t = tree(vec![node("A", vec![]), node("B", vec![])]);

        assert!(t.move_sibling(&id("A"), Direction::Down));
        assert_eq!(ids(t.roots()), vec!["B", "A"]);
    }

    #[test]
    fn move_top_level_to_root_is_noop() {
        let mut t = abc();
        let before = t.book().clone();

        let moved = t.move_subtree(None, &[id("A")]).unwrap();

        assert!(moved.is_empty());
        assert_eq!(t.book(), &before);
    }

    #[test]
    fn move_into_own_descendant_is_rejected() {
        let mut t = tree(vec![node("A", vec![node("B", vec![node("T", vec![])])])]);

        let moved = t.move_subtree(Some(&id("T")), &[id("A")]).unwrap();

        assert!(moved.is_empty());
        assert!(t.index().is_ancestor_of(&id("A"), &id("T")));
        assert!(t.is_coherent());
    }

    #[test]
    fn move_onto_itself_is_rejected() {
        let mut t = abc();
        let moved = t.move_subtree(Some(&id("B")), &[id("B")]).unwrap();

        assert!(moved.is_empty());
    }

    #[test]
    fn move_under_current_parent_is_noop() {
        let mut t = abc();
        let moved = t.move_subtree(Some(&id("A")), &[id("C")]).unwrap();

        assert!(moved.is_empty());
        assert_eq!(ids(&t.chapter(&id("A")).unwrap().children), vec!["B", "C"]);
    }

    #[test]
    fn nested_selection_moves_only_local_root() {
        let mut t = tree(vec![
            node("P", vec![node("Q", vec![])]),
            node("R", vec![]),
        ]);

        let moved = t.move_subtree(Some(&id("R")), &[id("Q"), id("P")]).unwrap();

        assert_eq!(moved, vec![id("P")]);
        assert_eq!(ids(t.roots()), vec!["R"]);
        let p = t.chapter(&id("P")).unwrap();
        assert_eq!(ids(&p.children), vec!["Q"]);
        assert!(t.index().is_direct_parent(&id("R"), &id("P")));
        assert!(t.index().is_direct_parent(&id("P"), &id("Q")));
        assert!(t.is_coherent());
    }

    #[test]
    fn batch_move_keeps_selection_order() {
        let mut t = tree(vec![
            node("A", vec![node("X", vec![]), node("Y", vec![])]),
            node("T", vec![]),
        ]);

        let moved = t.move_subtree(Some(&id("T")), &[id("Y"), id("X")]).unwrap();

        assert_eq!(moved, vec![id("Y"), id("X")]);
        assert_eq!(ids(&t.chapter(&id("T")).unwrap().children), vec!["Y", "X"]);
        assert!(t.chapter(&id("A")).unwrap().is_leaf());
    }

    #[test]
    fn move_to_unknown_target_fails_untouched() {
        let mut t = abc();
        let before = t.book().clone();

        let err = t.move_subtree(Some(&id("ghost")), &[id("B")]).unwrap_err();

        assert_eq!(err, TreeError::ChapterNotFound(id("ghost")));
        assert_eq!(t.book(), &before);
    }

    #[test]
    fn unknown_sources_are_ignored() {
        let mut t = abc();
        let moved = t.move_subtree(None, &[id("ghost"), id("B"), id("B")]).unwrap();

        assert_eq!(moved, vec![id("B")]);
        assert_eq!(ids(t.roots()), vec!["A", "B"]);
    }

    #[test]
    fn walk_is_display_order() {
        let t = tree(vec![
            node("A", vec![node("B", vec![node("D", vec![])]), node("C", vec![])]),
            node("E", vec![]),
        ]);

        let walked: Vec<(usize, String)> = t
            .walk()
            .into_iter()
            .map(|(depth, c)| (depth, c.id.to_string()))
            .collect();

        assert_eq!(
            walked,
            vec![
                (0, "A".to_string()),
                (1, "B".to_string()),
                (2, "D".to_string()),
                (1, "C".to_string()),
                (0, "E".to_string()),
            ]
        );
    }
}
