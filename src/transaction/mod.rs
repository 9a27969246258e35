use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{common::Database, types::DbResult};

mod concurrent_status;
mod log_manager;

pub use concurrent_status::{
    ConcurrentStatus, Lock, Permission, LOCK_RETRY_SLEEP_MS, MAX_LOCK_RETRIES,
};
pub use log_manager::LogManager;

static TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Eq, Hash, PartialEq, Clone, Copy)]
pub struct Transaction {
    // increase monotonically by 1
    uuid: u64,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            uuid: TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn new_specific_id(id: u64) -> Self {
        Self { uuid: id }
    }

    pub fn get_id(&self) -> u64 {
        self.uuid
    }

    pub fn start(&self) -> DbResult {
        Database::mut_log_manager().log_start(self)
    }

    pub fn commit(&self) -> DbResult {
        self.complete(true)
    }

    pub fn abort(&self) -> DbResult {
        self.complete(false)
    }

    /// Flush (commit) or discard (abort) this transaction's cached
    /// writes, append the matching log record, then release every lock
    /// it holds. Locks go last so two-phase locking covers the flush.
    fn complete(&self, commit: bool) -> DbResult {
        {
            let buffer_pool = Database::buffer_pool();
            buffer_pool.tx_complete(self, commit)?;
        }

        if commit {
            Database::mut_log_manager().log_commit(self)?;
        } else {
            Database::mut_log_manager().log_abort(self)?;
        }

        Database::mut_concurrent_status().release_lock_by_tx(self)?;

        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.uuid)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
