//! A loaded book bound to its metadata document
//!
//! [`TreeStore`] wraps the in-memory [`ChapterTree`] and writes the document
//! after every successful mutation. A failed write is reported as
//! [`BookError::PersistenceFailure`] but the mutation stays applied in
//! memory; call [`TreeStore::persist`] to retry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::content::ContentFiles;
use super::error::BookError;
use super::metadata;
use super::vcs::{RepoStatus, VersionControl};
use crate::domain::{Book, Chapter, ChapterId, ChapterTree, Direction, Title};

#[derive(Debug)]
pub struct TreeStore {
    root: PathBuf,
    tree: ChapterTree,
    vcs: Option<Arc<dyn VersionControl>>,
    /// Bumped by every mutation that changed the in-memory tree
    revision: u64,
}

impl TreeStore {
    /// Loads the book at `root`
    pub fn open(root: impl AsRef<Path>) -> Result<Self, BookError> {
        let root = root.as_ref();
        let book = metadata::load_book(root)?;
        let store = Self::from_book(root, book);
        tracing::debug!(
            root = %root.display(),
            chapters = store.tree.index().len(),
            "loaded book"
        );
        Ok(store)
    }

    /// Binds an already decoded book to a root without touching disk
    pub fn from_book(root: impl Into<PathBuf>, book: Book) -> Self {
        Self {
            root: root.into(),
            tree: ChapterTree::new(book),
            vcs: None,
            revision: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_path(&self) -> PathBuf {
        metadata::metadata_path(&self.root)
    }

    pub fn tree(&self) -> &ChapterTree {
        &self.tree
    }

    pub fn book(&self) -> &Book {
        self.tree.book()
    }

    pub fn title(&self) -> &str {
        &self.tree.book().title
    }

    /// Content files of this book
    pub fn content(&self) -> ContentFiles {
        ContentFiles::new(&self.root)
    }

    /// Counter of in-memory changes since the book was opened
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Encodes the current tree and writes it to the metadata document
    pub fn persist(&mut self) -> Result<(), BookError> {
        let text = metadata::encode(self.tree.book_mut())?;
        metadata::write_document(&self.metadata_path(), &text)
    }

    /// Appends a new chapter under `parent`, or at the top level
    pub fn create_chapter(
        &mut self,
        parent: Option<&ChapterId>,
        title: Title,
    ) -> Result<Chapter, BookError> {
        let chapter = self.tree.create(parent, title)?;
        self.revision += 1;
        self.persist()?;
        Ok(chapter)
    }

    pub fn rename_chapter(&mut self, id: &ChapterId, title: Title) -> Result<(), BookError> {
        self.tree.rename(id, title)?;
        self.revision += 1;
        self.persist()
    }

    /// Deletes a chapter and its subtree, returning the removed ids in pre-order
    pub fn delete_chapter(&mut self, id: &ChapterId) -> Result<Vec<ChapterId>, BookError> {
        let removed = self.tree.delete(id)?;
        self.revision += 1;
        self.persist()?;
        Ok(removed)
    }

    /// Swaps a chapter with an adjacent sibling
    ///
    /// Returns `Ok(false)` without writing when nothing moved.
    pub fn move_sibling(&mut self, id: &ChapterId, direction: Direction) -> Result<bool, BookError> {
        if !self.tree.move_sibling(id, direction) {
            return Ok(false);
        }
        self.revision += 1;
        self.persist()?;
        Ok(true)
    }

    /// Reparents a selection under `target`; writes only if something moved
    pub fn move_subtree(
        &mut self,
        target: Option<&ChapterId>,
        sources: &[ChapterId],
    ) -> Result<Vec<ChapterId>, BookError> {
        let moved = self.tree.move_subtree(target, sources)?;
        if !moved.is_empty() {
            self.revision += 1;
            self.persist()?;
        }
        Ok(moved)
    }

    pub fn chapter(&self, id: &ChapterId) -> Option<&Chapter> {
        self.tree.chapter(id)
    }

    pub fn parent(&self, id: &ChapterId) -> Result<Option<&Chapter>, BookError> {
        Ok(self.tree.parent(id)?)
    }

    pub fn is_ancestor_of(&self, ancestor: &ChapterId, node: &ChapterId) -> bool {
        self.tree.index().is_ancestor_of(ancestor, node)
    }

    pub fn is_direct_parent(&self, parent: &ChapterId, child: &ChapterId) -> bool {
        self.tree.index().is_direct_parent(parent, child)
    }

    pub fn ancestors(&self, id: &ChapterId) -> Vec<ChapterId> {
        self.tree.index().ancestors(id)
    }

    pub fn path(&self, id: &ChapterId) -> Option<Vec<ChapterId>> {
        self.tree.index().path(id)
    }

    pub fn roots(&self) -> &[Chapter] {
        self.tree.roots()
    }

    pub fn walk(&self) -> Vec<(usize, &Chapter)> {
        self.tree.walk()
    }

    pub fn set_vcs(&mut self, vcs: Option<Arc<dyn VersionControl>>) {
        self.vcs = vcs;
    }

    /// Repository status of the book root, if a version-control handle is set
    pub fn vcs_status(&self) -> Option<RepoStatus> {
        self.vcs.as_ref()?.status(&self.root)
    }
}
