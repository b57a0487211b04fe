//! The buffer pool and the process-wide `Database` catalog that owns it.
//!
//! `BufferPool::get_page` must resolve a page's file through the very
//! catalog that owns the pool, so the two live in one crate: splitting them
//! would force the dependency through an unsafe global or a callback
//! indirection that buys nothing here.

use std::sync::{Mutex, MutexGuard, OnceLock};

use ahash::RandomState;
use common::{DbError, DbResult, PageId};
use hashbrown::{HashMap, HashSet};
use storage::{DbFile, Page};

type Map<K, V> = HashMap<K, V, RandomState>;
type Set<K> = HashSet<K, RandomState>;

/// Fixed-capacity, page-granular cache with strict LRU eviction and
/// explicit dirty tracking and write-back.
pub struct BufferPool {
    capacity: usize,
    pages: Map<PageId, Page>,
    dirty: Set<PageId>,
    lru: Vec<PageId>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pages: Map::default(),
            dirty: Set::default(),
            lru: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, pid: &PageId) -> bool {
        self.pages.contains_key(pid)
    }

    /// Membership in the dirty set. Fails if `pid` is not resident.
    pub fn is_dirty(&self, pid: &PageId) -> DbResult<bool> {
        if !self.contains(pid) {
            return Err(DbError::NotResident(pid.clone()));
        }
        Ok(self.dirty.contains(pid))
    }

    /// Marks a page dirty. Idempotent; precondition is residency, not
    /// enforced on the hot path (matches the historical contract).
    pub fn mark_dirty(&mut self, pid: &PageId) {
        debug_assert!(
            self.contains(pid),
            "mark_dirty called on non-resident page {pid:?}"
        );
        self.dirty.insert(pid.clone());
    }

    /// Removes `pid` from residency without writing it back. No-op if absent.
    pub fn discard_page(&mut self, pid: &PageId) {
        self.pages.remove(pid);
        self.dirty.remove(pid);
        if let Some(i) = self.lru.iter().position(|p| p == pid) {
            self.lru.remove(i);
        }
    }

    fn update_lru(&mut self, pid: &PageId) {
        if self.lru.last() == Some(pid) {
            return;
        }
        if let Some(i) = self.lru.iter().position(|p| p == pid) {
            self.lru.remove(i);
        }
        self.lru.push(pid.clone());
    }

    fn lru_victim(&self) -> Option<PageId> {
        self.lru.first().cloned()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(common::DEFAULT_NUM_PAGES)
    }
}

/// Process-wide registry that owns every `DbFile` and the `BufferPool`
/// fronting them.
pub struct Database {
    files: Map<String, Box<dyn DbFile + Send>>,
    buffer_pool: BufferPool,
}

static DATABASE: OnceLock<Mutex<Database>> = OnceLock::new();

impl Database {
    pub fn new(buffer_pool_pages: usize) -> Self {
        Self {
            files: Map::default(),
            buffer_pool: BufferPool::new(buffer_pool_pages),
        }
    }

    /// The lazily-constructed, process-wide singleton.
    pub fn singleton() -> &'static Mutex<Database> {
        DATABASE.get_or_init(|| Mutex::new(Database::new(common::DEFAULT_NUM_PAGES)))
    }

    /// Resets the singleton for test isolation: flushes dirty pages first
    /// (matching teardown semantics), then drops every registered file.
    pub fn reset_for_test() {
        let mut db = Database::lock_singleton();
        let _ = db.flush_all();
        db.files.clear();
    }

    fn lock_singleton() -> MutexGuard<'static, Database> {
        Database::singleton()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a file under its own name. Fails if the name is taken.
    pub fn add(&mut self, file: Box<dyn DbFile + Send>) -> DbResult<()> {
        let name = file.name().to_string();
        if self.files.contains_key(&name) {
            return Err(DbError::DuplicateName(name));
        }
        self.files.insert(name, file);
        Ok(())
    }

    /// Removes a registered file, flushing its dirty pages first.
    pub fn remove(&mut self, name: &str) -> DbResult<Box<dyn DbFile + Send>> {
        if !self.files.contains_key(name) {
            return Err(DbError::UnknownName(name.to_string()));
        }
        self.flush_file(name)?;
        Ok(self.files.remove(name).expect("presence checked above"))
    }

    pub fn get(&self, name: &str) -> DbResult<&(dyn DbFile + Send)> {
        self.files
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| DbError::UnknownName(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> DbResult<&mut (dyn DbFile + Send)> {
        self.files
            .get_mut(name)
            .map(|f| f.as_mut())
            .ok_or_else(|| DbError::UnknownName(name.to_string()))
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn buffer_pool_mut(&mut self) -> &mut BufferPool {
        &mut self.buffer_pool
    }

    /// Fetches the resident page with identity `pid`, reading it through
    /// the catalog on a miss and evicting the LRU victim if the pool is
    /// already at capacity.
    pub fn get_page(&mut self, pid: &PageId) -> DbResult<&mut Page> {
        self.buffer_pool.update_lru(pid);

        if !self.buffer_pool.contains(pid) {
            if self.buffer_pool.len() >= self.buffer_pool.capacity {
                let victim = self
                    .buffer_pool
                    .lru_victim()
                    .expect("lru nonempty when pool is at capacity");
                if self.buffer_pool.dirty.contains(&victim) {
                    self.flush_page(&victim)?;
                }
                self.buffer_pool.discard_page(&victim);
            }

            let file = self
                .files
                .get_mut(&pid.file)
                .ok_or_else(|| DbError::CatalogMiss(pid.file.clone()))?;
            let mut image = Page::new();
            file.read_page(&mut image, pid.page)?;
            self.buffer_pool.pages.insert(pid.clone(), image);
        }

        Ok(self
            .buffer_pool
            .pages
            .get_mut(pid)
            .expect("page resident after miss resolution"))
    }

    /// Writes a resident, dirty page back to its file. No-op otherwise.
    pub fn flush_page(&mut self, pid: &PageId) -> DbResult<()> {
        if !self.buffer_pool.contains(pid) || !self.buffer_pool.dirty.contains(pid) {
            return Ok(());
        }
        let file = self
            .files
            .get_mut(&pid.file)
            .ok_or_else(|| DbError::CatalogMiss(pid.file.clone()))?;
        let page = self
            .buffer_pool
            .pages
            .get(pid)
            .expect("residency checked above");
        println!("Flushing page {} to file {}", pid.page, pid.file);
        file.write_page(page, pid.page)?;
        self.buffer_pool.dirty.remove(pid);
        Ok(())
    }

    /// Flushes every dirty page belonging to `name`. Snapshots the dirty
    /// set first to avoid mutating it while iterating.
    pub fn flush_file(&mut self, name: &str) -> DbResult<()> {
        let pids: Vec<PageId> = self
            .buffer_pool
            .dirty
            .iter()
            .filter(|pid| pid.file == name)
            .cloned()
            .collect();
        for pid in pids {
            self.flush_page(&pid)?;
        }
        Ok(())
    }

    /// Flushes every dirty page, best-effort: continues past individual
    /// I/O failures and reports the last one encountered.
    pub fn flush_all(&mut self) -> DbResult<()> {
        let pids: Vec<PageId> = self.buffer_pool.dirty.iter().cloned().collect();
        let mut last_err = None;
        for pid in pids {
            if let Err(e) = self.flush_page(&pid) {
                last_err = Some(e);
            }
        }
        self.buffer_pool.pages.clear();
        self.buffer_pool.dirty.clear();
        self.buffer_pool.lru.clear();
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests;
