//! Registry of loaded books
//!
//! The registry is the entry point for callers that work with one or more
//! book roots. Books are loaded lazily on first access and cached by root
//! path in load order. Observers subscribe explicitly and are told about
//! loads, reloads, evictions and mutations made through
//! [`BookRegistry::update`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::BookError;
use super::metadata::{self, METADATA_FILE};
use super::tree_store::TreeStore;
use super::vcs::VersionControl;
use crate::domain::Title;

/// Characters that cannot appear in a book folder name
pub const INVALID_FOLDER_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Change notification sent to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookEvent {
    Loaded(PathBuf),
    Reloaded(PathBuf),
    Evicted(PathBuf),
    Changed(PathBuf),
}

impl BookEvent {
    pub fn root(&self) -> &Path {
        match self {
            BookEvent::Loaded(root)
            | BookEvent::Reloaded(root)
            | BookEvent::Evicted(root)
            | BookEvent::Changed(root) => root,
        }
    }
}

/// Handle returned by [`BookRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&BookEvent) + Send + Sync>;

pub struct BookRegistry {
    books: Vec<TreeStore>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    vcs: Option<Arc<dyn VersionControl>>,
}

impl Default for BookRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BookRegistry {
    /// Creates an empty registry; `vcs` is handed to every loaded book
    pub fn new(vcs: Option<Arc<dyn VersionControl>>) -> Self {
        Self {
            books: Vec::new(),
            listeners: Vec::new(),
            next_listener: 0,
            vcs,
        }
    }

    /// Returns the cached book for `root`, loading it on first access
    pub fn load(&mut self, root: impl AsRef<Path>) -> Result<&TreeStore, BookError> {
        let key = cache_key(root.as_ref());
        if let Some(pos) = self.position(&key) {
            return Ok(&self.books[pos]);
        }

        let mut store = TreeStore::open(&key)?;
        store.set_vcs(self.vcs.clone());
        self.books.push(store);
        self.notify(&BookEvent::Loaded(key));

        let last = self.books.len() - 1;
        Ok(&self.books[last])
    }

    /// Loads every root of a workspace, reporting each result separately
    ///
    /// A broken book does not prevent the others from loading.
    pub fn load_all<I, P>(&mut self, roots: I) -> Vec<(PathBuf, Result<(), BookError>)>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        roots
            .into_iter()
            .map(|root| {
                let root = root.as_ref().to_path_buf();
                let result = self.load(&root).map(|_| ());
                if let Err(e) = &result {
                    tracing::warn!(root = %root.display(), error = %e, "failed to load book");
                }
                (root, result)
            })
            .collect()
    }

    /// Cached book for `root`, without I/O
    pub fn get(&self, root: impl AsRef<Path>) -> Option<&TreeStore> {
        let pos = self.position(&cache_key(root.as_ref()))?;
        self.books.get(pos)
    }

    pub fn get_mut(&mut self, root: impl AsRef<Path>) -> Option<&mut TreeStore> {
        let pos = self.position(&cache_key(root.as_ref()))?;
        self.books.get_mut(pos)
    }

    /// Loaded books in load order
    pub fn list(&self) -> &[TreeStore] {
        &self.books
    }

    /// Runs a mutation against a loaded book
    ///
    /// Subscribers get [`BookEvent::Changed`] whenever the in-memory tree
    /// changed, including when the write that followed failed. Rejected
    /// calls and no-op moves send nothing.
    pub fn update<R>(
        &mut self,
        root: impl AsRef<Path>,
        mutate: impl FnOnce(&mut TreeStore) -> Result<R, BookError>,
    ) -> Result<R, BookError> {
        let key = cache_key(root.as_ref());
        let pos = match self.position(&key) {
            Some(pos) => pos,
            None => {
                self.load(&key)?;
                self.books.len() - 1
            }
        };

        let before = self.books[pos].revision();
        let result = mutate(&mut self.books[pos]);
        if self.books[pos].revision() != before {
            self.notify(&BookEvent::Changed(key));
        }
        result
    }

    /// Drops a book from the cache; returns false if it was not loaded
    pub fn evict(&mut self, root: impl AsRef<Path>) -> bool {
        let key = cache_key(root.as_ref());
        let Some(pos) = self.position(&key) else {
            return false;
        };
        self.books.remove(pos);
        self.notify(&BookEvent::Evicted(key));
        true
    }

    /// Discards any cached state for `root` and loads it again from disk
    ///
    /// If the document can no longer be loaded the stale copy is evicted
    /// before the error is returned.
    pub fn reload(&mut self, root: impl AsRef<Path>) -> Result<&TreeStore, BookError> {
        let key = cache_key(root.as_ref());
        let mut store = match TreeStore::open(&key) {
            Ok(store) => store,
            Err(err) => {
                self.evict(&key);
                return Err(err);
            }
        };
        store.set_vcs(self.vcs.clone());

        let pos = match self.position(&key) {
            Some(pos) => {
                self.books[pos] = store;
                pos
            }
            None => {
                self.books.push(store);
                self.books.len() - 1
            }
        };
        self.notify(&BookEvent::Reloaded(key));
        Ok(&self.books[pos])
    }

    pub fn subscribe(&mut self, listener: impl Fn(&BookEvent) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Writes a fresh metadata document into `dir`, creating it if needed
    ///
    /// Refuses to overwrite an existing document. The new book is not loaded.
    pub fn create_new(dir: impl AsRef<Path>, title: &Title) -> Result<PathBuf, BookError> {
        let dir = dir.as_ref();
        let path = metadata::metadata_path(dir);
        if path.exists() {
            return Err(BookError::AlreadyExists(path));
        }

        fs::create_dir_all(dir).map_err(|source| BookError::PersistenceFailure {
            path: dir.to_path_buf(),
            source,
        })?;
        metadata::write_document(&path, &metadata::fresh_document(title)?)?;

        tracing::debug!(path = %path.display(), "created book");
        Ok(path)
    }

    /// Creates `<parent>/<title>/` holding a fresh book
    ///
    /// The title doubles as the folder name, so it must be a valid one and
    /// the folder must not exist yet.
    pub fn create_book_folder(parent: impl AsRef<Path>, title: &str) -> Result<PathBuf, BookError> {
        let title = validate_book_folder_name(title)?;
        let dir = parent.as_ref().join(title.as_str());
        if dir.exists() {
            return Err(BookError::AlreadyExists(dir));
        }
        Self::create_new(&dir, &title)?;
        Ok(dir)
    }

    fn position(&self, key: &Path) -> Option<usize> {
        self.books.iter().position(|book| book.root() == key)
    }

    fn notify(&self, event: &BookEvent) {
        tracing::debug!(?event, "book registry event");
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }
}

/// Checks that a book title can be used as its folder name
pub fn validate_book_folder_name(raw: &str) -> Result<Title, BookError> {
    let title = Title::new(raw)?;
    let name = title.as_str();

    if name == "." || name == ".." {
        return Err(BookError::InvalidTitle(format!(
            "{name:?} cannot be used as a folder name"
        )));
    }
    if name.contains(INVALID_FOLDER_CHARS) {
        return Err(BookError::InvalidTitle(format!(
            "{name:?} cannot contain any of / \\ : * ? \" < > |"
        )));
    }
    Ok(title)
}

/// Walks up from `start` to the nearest directory holding a metadata document
pub fn find_book_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(METADATA_FILE).is_file() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

fn cache_key(root: &Path) -> PathBuf {
    fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn title(s: &str) -> Title {
        Title::new(s).unwrap()
    }

    fn book_at(dir: &Path, name: &str) -> PathBuf {
        let root = dir.join(name);
        BookRegistry::create_new(&root, &title(name)).unwrap();
        root
    }

    fn recorder(registry: &mut BookRegistry) -> (ListenerId, Arc<Mutex<Vec<BookEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let id = registry.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        (id, events)
    }

    #[test]
    fn load_is_lazy_and_cached() {
        let dir = TempDir::new().unwrap();
        let root = book_at(dir.path(), "novel");
        let mut registry = BookRegistry::default();

        assert!(registry.get(&root).is_none());
        assert_eq!(registry.load(&root).unwrap().title(), "novel");

        // A change on disk is invisible until reload.
        fs::write(root.join(METADATA_FILE), "title: Changed\n").unwrap();
        assert_eq!(registry.load(&root).unwrap().title(), "novel");
        assert_eq!(registry.list().len(), 1);

        assert_eq!(registry.reload(&root).unwrap().title(), "Changed");
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn load_missing_or_malformed_caches_nothing() {
        let dir = TempDir::new().unwrap();
        let mut registry = BookRegistry::default();

        assert!(matches!(
            registry.load(dir.path()),
            Err(BookError::DocumentNotFound(_))
        ));

        fs::write(dir.path().join(METADATA_FILE), "").unwrap();
        assert!(matches!(
            registry.load(dir.path()),
            Err(BookError::MalformedDocument(_))
        ));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn load_all_reports_each_root() {
        let dir = TempDir::new().unwrap();
        let a = book_at(dir.path(), "a");
        let b = book_at(dir.path(), "b");
        let missing = dir.path().join("missing");
        let mut registry = BookRegistry::default();

        let results = registry.load_all([&a, &missing, &b]);

        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
        let titles: Vec<_> = registry.list().iter().map(TreeStore::title).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn create_new_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let root = book_at(dir.path(), "book");

        assert!(matches!(
            BookRegistry::create_new(&root, &title("Again")),
            Err(BookError::AlreadyExists(_))
        ));
    }

    #[test]
    fn create_book_folder_validates_name() {
        let dir = TempDir::new().unwrap();

        let root = BookRegistry::create_book_folder(dir.path(), "  My Book ").unwrap();
        assert_eq!(root, dir.path().join("My Book"));
        assert!(root.join(METADATA_FILE).is_file());

        for bad in ["", "  ", ".", "..", "a/b", "what?", "x:y", "pipe|d"] {
            assert!(
                matches!(
                    BookRegistry::create_book_folder(dir.path(), bad),
                    Err(BookError::InvalidTitle(_))
                ),
                "expected rejection for {bad:?}"
            );
        }

        assert!(matches!(
            BookRegistry::create_book_folder(dir.path(), "My Book"),
            Err(BookError::AlreadyExists(_))
        ));
    }

    #[test]
    fn subscribers_see_lifecycle_events() {
        let dir = TempDir::new().unwrap();
        let root = book_at(dir.path(), "book");
        let key = fs::canonicalize(&root).unwrap();
        let mut registry = BookRegistry::default();
        let (listener, events) = recorder(&mut registry);

        registry.load(&root).unwrap();
        registry.load(&root).unwrap();
        registry
            .update(&root, |store| store.create_chapter(None, title("One")))
            .unwrap();
        registry.reload(&root).unwrap();
        assert!(registry.evict(&root));
        assert!(!registry.evict(&root));

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                BookEvent::Loaded(key.clone()),
                BookEvent::Changed(key.clone()),
                BookEvent::Reloaded(key.clone()),
                BookEvent::Evicted(key),
            ]
        );

        assert!(registry.unsubscribe(listener));
        registry.load(&root).unwrap();
        assert_eq!(events.lock().unwrap().len(), 4);
    }

    #[test]
    fn failed_update_sends_no_event() {
        let dir = TempDir::new().unwrap();
        let root = book_at(dir.path(), "book");
        let mut registry = BookRegistry::default();
        registry.load(&root).unwrap();
        let (_, events) = recorder(&mut registry);

        let ghost = "ghost".parse().unwrap();
        assert!(registry
            .update(&root, |store| store.rename_chapter(&ghost, title("X")))
            .is_err());

        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_reload_evicts_stale_book() {
        let dir = TempDir::new().unwrap();
        let root = book_at(dir.path(), "Old");
        let key = fs::canonicalize(&root).unwrap();
        let mut registry = BookRegistry::default();
        registry.load(&root).unwrap();
        let (_, events) = recorder(&mut registry);

        fs::write(root.join(METADATA_FILE), "- not a map\n").unwrap();

        assert!(matches!(
            registry.reload(&root),
            Err(BookError::MalformedDocument(_))
        ));
        assert!(registry.get(&root).is_none());
        assert_eq!(*events.lock().unwrap(), vec![BookEvent::Evicted(key)]);
    }

    #[test]
    fn failed_write_still_reports_change() {
        let dir = TempDir::new().unwrap();
        let root = book_at(dir.path(), "book");
        let key = fs::canonicalize(&root).unwrap();
        let mut registry = BookRegistry::default();
        registry.load(&root).unwrap();
        let (_, events) = recorder(&mut registry);

        // A directory in place of the document makes the rename fail.
        fs::remove_file(root.join(METADATA_FILE)).unwrap();
        fs::create_dir(root.join(METADATA_FILE)).unwrap();

        let result = registry.update(&root, |store| store.create_chapter(None, title("One")));

        assert!(matches!(result, Err(BookError::PersistenceFailure { .. })));
        assert_eq!(registry.get(&root).unwrap().roots().len(), 1);
        assert_eq!(*events.lock().unwrap(), vec![BookEvent::Changed(key)]);
    }

    #[test]
    fn noop_moves_send_no_event() {
        let dir = TempDir::new().unwrap();
        let root = book_at(dir.path(), "book");
        let mut registry = BookRegistry::default();
        let only = registry
            .update(&root, |store| store.create_chapter(None, title("Only")))
            .unwrap();
        let (_, events) = recorder(&mut registry);

        let stepped = registry
            .update(&root, |store| store.move_sibling(&only.id, Direction::Up))
            .unwrap();
        let moved = registry
            .update(&root, |store| store.move_subtree(None, &[only.id.clone()]))
            .unwrap();

        assert!(!stepped);
        assert!(moved.is_empty());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn get_mut_mutations_are_visible_through_get() {
        let dir = TempDir::new().unwrap();
        let root = book_at(dir.path(), "book");
        let mut registry = BookRegistry::default();
        registry.load(&root).unwrap();

        let chapter = registry
            .get_mut(&root)
            .unwrap()
            .create_chapter(None, title("Intro"))
            .unwrap();

        assert!(registry.get(&root).unwrap().chapter(&chapter.id).is_some());
    }

    #[test]
    fn find_book_root_walks_up() {
        let dir = TempDir::new().unwrap();
        let root = book_at(dir.path(), "book");
        let nested = root.join("chapters").join("deep");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_book_root(&nested), Some(root));
    }
}
