use core::fmt;
use std::{
    collections::{HashMap, HashSet},
    thread::sleep,
    time::Duration,
};

use log::debug;

use crate::{
    common::Database, error::DbError, storage::page_id::HeapPageID,
    transaction::Transaction, types::DbResult,
};

/// How many times a lock request is retried before the transaction
/// gives up and aborts.
pub const MAX_LOCK_RETRIES: usize = 3;

/// How long a denied request sleeps before retrying.
pub const LOCK_RETRY_SLEEP_MS: u64 = 10;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Lock {
    XLock,
    SLock,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

/// Page-granularity lock table.
///
/// Per page it keeps the map of holders and their modes; at most one
/// holder may be exclusive, and shared holders only coexist with each
/// other. A holder may upgrade S to X when it is alone on the page.
///
/// There is exactly one instance, owned by the `Database`; every map
/// mutation happens under that instance's write lock.
pub struct ConcurrentStatus {
    lock_table: HashMap<HeapPageID, HashMap<Transaction, Lock>>,

    hold_pages: HashMap<Transaction, HashSet<HeapPageID>>,
}

impl ConcurrentStatus {
    pub fn new() -> Self {
        Self {
            lock_table: HashMap::new(),
            hold_pages: HashMap::new(),
        }
    }

    /// Block until the lock is granted, retrying with a bounded sleep.
    /// Deadlocks resolve through retry exhaustion: the caller receives
    /// `LockTimeout` and must abort its transaction.
    pub fn acquire_lock(
        tx: &Transaction,
        lock: &Lock,
        page_id: &HeapPageID,
    ) -> DbResult {
        Self::acquire_lock_with_retry(tx, lock, page_id, 0)
    }

    fn acquire_lock_with_retry(
        tx: &Transaction,
        lock: &Lock,
        page_id: &HeapPageID,
        retry: usize,
    ) -> DbResult {
        if retry == MAX_LOCK_RETRIES {
            let err = DbError::LockTimeout(format!(
                "tx: {}, lock: {:?}, page_id: {:?}, status: {:?}",
                tx,
                lock,
                page_id,
                Database::concurrent_status(),
            ));
            return Err(err);
        }

        {
            let mut concurrent_status = Database::mut_concurrent_status();
            if concurrent_status.add_lock(tx, lock, page_id) {
                return Ok(());
            }
        }

        debug!(
            "lock busy, retry {}/{}: tx: {}, lock: {:?}, page_id: {:?}",
            retry + 1,
            MAX_LOCK_RETRIES,
            tx,
            lock,
            page_id
        );
        sleep(Duration::from_millis(LOCK_RETRY_SLEEP_MS));
        Self::acquire_lock_with_retry(tx, lock, page_id, retry + 1)
    }

    // Try to add a lock to the given page. This api is idempotent.
    //
    // # Return
    //
    // Whether the lock was granted. A denied request leaves the table
    // untouched so the caller can retry.
    pub(crate) fn add_lock(
        &mut self,
        tx: &Transaction,
        lock: &Lock,
        page_id: &HeapPageID,
    ) -> bool {
        let holders = self
            .lock_table
            .entry(*page_id)
            .or_insert_with(HashMap::new);

        let granted: bool;
        if holders.is_empty() {
            holders.insert(*tx, *lock);
            granted = true;
        } else if holders.contains_key(tx) {
            match lock {
                Lock::SLock => {
                    // a lone holder may also downgrade X to S here
                    holders.insert(*tx, Lock::SLock);
                    granted = true;
                }
                Lock::XLock => {
                    if holders[tx] == Lock::XLock {
                        granted = true;
                    } else if holders.len() == 1 {
                        // sole holder, upgrade S -> X
                        holders.insert(*tx, Lock::XLock);
                        granted = true;
                    } else {
                        granted = false;
                    }
                }
            }
        } else {
            match lock {
                Lock::SLock => {
                    if holders.values().all(|l| *l == Lock::SLock) {
                        holders.insert(*tx, Lock::SLock);
                        granted = true;
                    } else {
                        granted = false;
                    }
                }
                Lock::XLock => {
                    granted = false;
                }
            }
        }

        if granted {
            self.hold_pages
                .entry(*tx)
                .or_insert_with(HashSet::new)
                .insert(*page_id);

            debug!(
                "lock acquired, tx: {}, lock: {:?}, page_id: {:?}",
                tx, lock, page_id
            );
        }

        granted
    }

    pub fn release_lock(&mut self, tx: &Transaction, page_id: &HeapPageID) {
        if let Some(holders) = self.lock_table.get_mut(page_id) {
            holders.remove(tx);
            if holders.is_empty() {
                self.lock_table.remove(page_id);
            }
        }

        if let Some(pages) = self.hold_pages.get_mut(tx) {
            pages.remove(page_id);
            if pages.is_empty() {
                self.hold_pages.remove(tx);
            }
        }
    }

    /// Release every lock the transaction holds (commit/abort path).
    pub fn release_lock_by_tx(&mut self, tx: &Transaction) -> DbResult {
        if !self.hold_pages.contains_key(tx) {
            return Ok(());
        }

        let hold_pages = self.hold_pages.get(tx).unwrap().clone();
        for page_id in hold_pages {
            if let Some(holders) = self.lock_table.get_mut(&page_id) {
                holders.remove(tx);
                if holders.is_empty() {
                    self.lock_table.remove(&page_id);
                }
            }
        }

        self.hold_pages.remove(tx);

        Ok(())
    }

    pub fn holds_lock(&self, tx: &Transaction, page_id: &HeapPageID) -> bool {
        self.lock_table
            .get(page_id)
            .map_or(false, |holders| holders.contains_key(tx))
    }

    pub fn get_lock_mode(
        &self,
        tx: &Transaction,
        page_id: &HeapPageID,
    ) -> Option<Lock> {
        self.lock_table
            .get(page_id)
            .and_then(|holders| holders.get(tx).copied())
    }

    pub fn clear(&mut self) {
        self.lock_table.clear();
        self.hold_pages.clear();
    }
}

impl fmt::Display for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut depiction = "\n".to_string();

        depiction.push_str("lock_table: {");
        for (page_id, holders) in self.lock_table.iter() {
            depiction.push_str(&format!("\n\t{} -> [", page_id.get_short_repr()));
            for (tx, lock) in holders {
                depiction.push_str(&format!("\n\t\t{} ({:?}), ", tx, lock));
            }
            depiction.push_str("\n\t]");
        }
        depiction.push_str("\n}\n");

        depiction.push_str("hold_pages: {");
        for (tx, pages) in self.hold_pages.iter() {
            depiction.push_str(&format!("\n\t{} -> [", tx));
            for page_id in pages {
                depiction.push_str(&format!("\n\t\t{}, ", page_id.get_short_repr()));
            }
            depiction.push_str("\n\t]\n");
        }
        depiction.push_str("}");

        write!(f, "{}", depiction)
    }
}

impl fmt::Debug for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(i: u32) -> HeapPageID {
        HeapPageID::new(7, i)
    }

    #[test]
    fn test_shared_locks_coexist() {
        let mut status = ConcurrentStatus::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(status.add_lock(&t1, &Lock::SLock, &page(0)));
        assert!(status.add_lock(&t2, &Lock::SLock, &page(0)));
        assert!(status.holds_lock(&t1, &page(0)));
        assert!(status.holds_lock(&t2, &page(0)));
    }

    #[test]
    fn test_exclusive_blocks_everyone() {
        let mut status = ConcurrentStatus::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(status.add_lock(&t1, &Lock::XLock, &page(0)));
        assert!(!status.add_lock(&t2, &Lock::SLock, &page(0)));
        assert!(!status.add_lock(&t2, &Lock::XLock, &page(0)));

        // re-acquire by the holder is idempotent
        assert!(status.add_lock(&t1, &Lock::XLock, &page(0)));
        assert!(status.add_lock(&t1, &Lock::SLock, &page(0)));
    }

    #[test]
    fn test_upgrade_when_alone() {
        let mut status = ConcurrentStatus::new();
        let t1 = Transaction::new();

        assert!(status.add_lock(&t1, &Lock::SLock, &page(0)));
        assert!(status.add_lock(&t1, &Lock::XLock, &page(0)));
        assert_eq!(status.get_lock_mode(&t1, &page(0)), Some(Lock::XLock));
    }

    #[test]
    fn test_upgrade_denied_with_other_readers() {
        let mut status = ConcurrentStatus::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(status.add_lock(&t1, &Lock::SLock, &page(0)));
        assert!(status.add_lock(&t2, &Lock::SLock, &page(0)));
        assert!(!status.add_lock(&t1, &Lock::XLock, &page(0)));
        assert_eq!(status.get_lock_mode(&t1, &page(0)), Some(Lock::SLock));
    }

    #[test]
    fn test_release_single_page() {
        let mut status = ConcurrentStatus::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(status.add_lock(&t1, &Lock::XLock, &page(0)));
        assert!(status.add_lock(&t1, &Lock::SLock, &page(1)));

        status.release_lock(&t1, &page(0));
        assert!(!status.holds_lock(&t1, &page(0)));
        assert!(status.holds_lock(&t1, &page(1)));

        // the freed page is immediately writable by someone else
        assert!(status.add_lock(&t2, &Lock::XLock, &page(0)));

        // releasing a page the transaction does not hold is a no-op
        status.release_lock(&t1, &page(2));
        assert!(status.holds_lock(&t1, &page(1)));
    }

    #[test]
    fn test_release_by_tx() {
        let mut status = ConcurrentStatus::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        assert!(status.add_lock(&t1, &Lock::SLock, &page(0)));
        assert!(status.add_lock(&t1, &Lock::XLock, &page(1)));
        assert!(status.add_lock(&t2, &Lock::SLock, &page(0)));

        status.release_lock_by_tx(&t1).unwrap();
        assert!(!status.holds_lock(&t1, &page(0)));
        assert!(!status.holds_lock(&t1, &page(1)));
        assert!(status.holds_lock(&t2, &page(0)));

        // page 1 has no holders left, a writer can move in
        assert!(status.add_lock(&t2, &Lock::XLock, &page(1)));
    }
}
