use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
};

use log::debug;

use crate::{
    common::Database,
    error::DbError,
    storage::{
        heap_page::HeapPage,
        page_id::HeapPageID,
        tuple::{Tuple, WrappedTuple},
    },
    transaction::{ConcurrentStatus, Permission, Transaction},
    types::{DbResult, Pod, ResultPod},
    utils::HandyRwLock,
};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Default number of pages the pool holds.
pub const DEFAULT_PAGES: usize = 50;

const NIL: usize = usize::MAX;

struct LruNode {
    pid: HeapPageID,
    prev: usize,
    next: usize,
}

/// Recency list backed by an arena of nodes addressed by index, head
/// is the most-recently-used end.
struct LruList {
    nodes: Vec<LruNode>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl LruList {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    fn push_front(&mut self, pid: HeapPageID) -> usize {
        let node = LruNode {
            pid,
            prev: NIL,
            next: NIL,
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        self.attach_front(index);
        index
    }

    fn attach_front(&mut self, index: usize) {
        self.nodes[index].prev = NIL;
        self.nodes[index].next = self.head;

        if self.head != NIL {
            self.nodes[self.head].prev = index;
        } else {
            self.tail = index;
        }
        self.head = index;
    }

    fn detach(&mut self, index: usize) {
        let prev = self.nodes[index].prev;
        let next = self.nodes[index].next;

        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn touch(&mut self, index: usize) {
        self.detach(index);
        self.attach_front(index);
    }

    fn remove(&mut self, index: usize) {
        self.detach(index);
        self.free.push(index);
    }

    fn tail_index(&self) -> usize {
        self.tail
    }

    fn prev_of(&self, index: usize) -> usize {
        self.nodes[index].prev
    }

    fn pid_of(&self, index: usize) -> HeapPageID {
        self.nodes[index].pid
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }
}

struct PoolInner {
    capacity: usize,
    pages: HashMap<HeapPageID, Pod<HeapPage>>,
    slots: HashMap<HeapPageID, usize>,
    lru: LruList,
}

impl PoolInner {
    fn touch(&mut self, pid: &HeapPageID) {
        if let Some(&index) = self.slots.get(pid) {
            self.lru.touch(index);
        }
    }

    /// Put a page into the pool at the most-recently-used position,
    /// evicting the least-recently-used clean page when full. Dirty
    /// pages are never evicted (NO-STEAL), so a pool of only dirty
    /// pages refuses the insert.
    fn install(&mut self, pid: HeapPageID, page_rc: Pod<HeapPage>) -> DbResult {
        if self.pages.contains_key(&pid) {
            self.pages.insert(pid, page_rc);
            self.touch(&pid);
            return Ok(());
        }

        if self.pages.len() >= self.capacity {
            self.evict_one()?;
        }

        self.pages.insert(pid, page_rc);
        let index = self.lru.push_front(pid);
        self.slots.insert(pid, index);
        Ok(())
    }

    fn evict_one(&mut self) -> DbResult {
        let mut index = self.lru.tail_index();
        while index != NIL {
            let pid = self.lru.pid_of(index);
            let dirty = self.pages[&pid].rl().is_dirty();
            if !dirty {
                debug!("evicting page {}", pid);
                self.remove(&pid);
                return Ok(());
            }
            index = self.lru.prev_of(index);
        }

        Err(DbError::NoCleanPage)
    }

    fn remove(&mut self, pid: &HeapPageID) {
        self.pages.remove(pid);
        if let Some(index) = self.slots.remove(pid) {
            self.lru.remove(index);
        }
    }

    fn clear(&mut self) {
        self.pages.clear();
        self.slots.clear();
        self.lru.clear();
    }
}

/// Bounded page cache shared by every transaction in the process.
///
/// The map and the recency list are only touched under the pool's own
/// mutex; lock acquisition happens before that mutex is taken, so a
/// blocked lock request never stalls unrelated cache traffic.
pub struct BufferPool {
    inner: Mutex<PoolInner>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                capacity: DEFAULT_PAGES,
                pages: HashMap::new(),
                slots: HashMap::new(),
                lru: LruList::new(),
            }),
        }
    }

    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    pub fn set_capacity(&self, capacity: usize) {
        self.inner.lock().unwrap().capacity = capacity;
    }

    pub fn get_capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }

    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().pages.len()
    }

    pub fn contains(&self, pid: &HeapPageID) -> bool {
        self.inner.lock().unwrap().pages.contains_key(pid)
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    /// Retrieve the specified page with the associated permissions.
    /// Will acquire a lock and may block if that lock is held by
    /// another transaction; exhausting the lock retries surfaces
    /// `LockTimeout`, upon which the caller must abort.
    ///
    /// The page is looked up in the pool first. On a miss it is read
    /// through the heap file and installed, which may evict the
    /// least-recently-used clean page.
    pub fn get_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &HeapPageID,
    ) -> ResultPod<HeapPage> {
        ConcurrentStatus::acquire_lock(tx, &perm.to_lock(), pid)?;

        let mut inner = self.inner.lock().unwrap();

        if let Some(page_rc) = inner.pages.get(pid) {
            let page_rc = page_rc.clone();
            inner.touch(pid);
            return Ok(page_rc);
        }

        debug!("page {} missing from the pool, reading from disk", pid);
        let page = Self::load_page(pid)?;
        let page_rc: Pod<HeapPage> = Arc::new(RwLock::new(page));
        inner.install(*pid, page_rc.clone())?;
        Ok(page_rc)
    }

    fn load_page(pid: &HeapPageID) -> Result<HeapPage, DbError> {
        let table_rc = Database::catalog()
            .get_table(&pid.get_table_id())
            .ok_or_else(|| {
                DbError::NoSuchTable(format!("table id {}", pid.get_table_id()))
            })?;
        let page = table_rc.rl().read_page(pid.page_index)?;
        Ok(page)
    }

    /// Add the tuple to the table on behalf of the transaction. The
    /// mutated pages come back marked dirty and sit at the
    /// most-recently-used end of the pool.
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        table_id: u32,
        tuple: &Tuple,
    ) -> DbResult {
        let table_rc = Database::catalog()
            .get_table(&table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", table_id)))?;

        let dirtied = table_rc.rl().insert_tuple(tx, tuple)?;
        self.mark_dirty(tx, dirtied)
    }

    /// Remove the tuple addressed by its record id, symmetric to
    /// `insert_tuple`.
    pub fn delete_tuple(&self, tx: &Transaction, tuple: &WrappedTuple) -> DbResult {
        let table_id = tuple.get_pid().get_table_id();
        let table_rc = Database::catalog()
            .get_table(&table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", table_id)))?;

        let page_rc = table_rc.rl().delete_tuple(tx, tuple)?;
        self.mark_dirty(tx, vec![page_rc])
    }

    fn mark_dirty(&self, tx: &Transaction, dirtied: Vec<Pod<HeapPage>>) -> DbResult {
        let mut inner = self.inner.lock().unwrap();
        for page_rc in dirtied {
            let pid = {
                let mut page = page_rc.wl();
                page.set_dirty(Some(*tx));
                page.get_pid()
            };
            inner.install(pid, page_rc)?;
        }
        Ok(())
    }

    /// Commit or roll back the transaction's cached writes.
    ///
    /// On commit every page dirtied by the transaction is logged
    /// (before/after images), written through to the heap file and its
    /// before-image refreshed. On abort those pages are discarded;
    /// the next access re-reads the pre-transaction state from disk.
    pub fn tx_complete(&self, tx: &Transaction, commit: bool) -> DbResult {
        let mut inner = self.inner.lock().unwrap();

        let dirtied: Vec<(HeapPageID, Pod<HeapPage>)> = inner
            .pages
            .iter()
            .filter(|(_, page_rc)| page_rc.rl().get_dirtier() == Some(*tx))
            .map(|(pid, page_rc)| (*pid, page_rc.clone()))
            .collect();

        if commit {
            for (pid, page_rc) in &dirtied {
                debug!("flushing page {} for {}", pid, tx);
                Self::flush_pod(page_rc)?;
                page_rc.wl().set_before_image();
            }
        } else {
            for (pid, _) in &dirtied {
                debug!("discarding page {} on abort of {}", pid, tx);
                inner.remove(pid);
            }
        }

        Ok(())
    }

    /// Write one cached page through to disk if it is dirty.
    pub fn flush_page(&self, pid: &HeapPageID) -> DbResult {
        let page_rc = {
            let inner = self.inner.lock().unwrap();
            match inner.pages.get(pid) {
                Some(page_rc) => page_rc.clone(),
                None => return Ok(()),
            }
        };

        if page_rc.rl().is_dirty() {
            Self::flush_pod(&page_rc)?;
        }
        Ok(())
    }

    /// Flush every dirty page in the pool.
    ///
    /// NB: be careful using this routine. It writes dirty data to
    /// disk, ignoring the NO-STEAL discipline that `tx_complete`
    /// maintains for uncommitted transactions.
    pub fn flush_all_pages(&self) -> DbResult {
        let pods: Vec<Pod<HeapPage>> = {
            let inner = self.inner.lock().unwrap();
            inner.pages.values().cloned().collect()
        };

        for page_rc in pods {
            if page_rc.rl().is_dirty() {
                Self::flush_pod(&page_rc)?;
            }
        }
        Ok(())
    }

    fn flush_pod(page_rc: &Pod<HeapPage>) -> DbResult {
        let (pid, before, after, dirtier) = {
            let page = page_rc.rl();
            (
                page.get_pid(),
                page.get_before_image_data(),
                page.get_page_data(),
                page.get_dirtier(),
            )
        };

        if let Some(tx) = dirtier {
            Database::mut_log_manager().log_write(&tx, &before, &after)?;
        }

        let table_rc = Database::catalog()
            .get_table(&pid.get_table_id())
            .ok_or_else(|| {
                DbError::NoSuchTable(format!("table id {}", pid.get_table_id()))
            })?;

        let mut page = page_rc.wl();
        table_rc.rl().write_page(&mut page)?;
        Ok(())
    }

    /// Remove the page from the pool without writing it.
    pub fn discard_page(&self, pid: &HeapPageID) {
        self.inner.lock().unwrap().remove(pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(i: u32) -> HeapPageID {
        HeapPageID::new(1, i)
    }

    #[test]
    fn test_lru_order() {
        let mut lru = LruList::new();
        let a = lru.push_front(pid(0));
        let _b = lru.push_front(pid(1));
        let c = lru.push_front(pid(2));

        // tail is the least recently used
        assert_eq!(lru.pid_of(lru.tail_index()), pid(0));

        lru.touch(a);
        assert_eq!(lru.pid_of(lru.tail_index()), pid(1));

        lru.remove(c);
        // walk from tail to head
        let mut order = Vec::new();
        let mut index = lru.tail_index();
        while index != NIL {
            order.push(lru.pid_of(index));
            index = lru.prev_of(index);
        }
        assert_eq!(order, vec![pid(1), pid(0)]);
    }

    #[test]
    fn test_lru_reuses_free_slots() {
        let mut lru = LruList::new();
        let a = lru.push_front(pid(0));
        lru.remove(a);
        let b = lru.push_front(pid(1));
        assert_eq!(a, b);
        assert_eq!(lru.pid_of(lru.tail_index()), pid(1));
    }
}
