use std::{
    collections::HashMap,
    mem,
    path::PathBuf,
    sync::{Arc, Once, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use super::Catalog;
use crate::{
    optimizer::table_stats::TableStats,
    storage::buffer_pool::BufferPool,
    transaction::{ConcurrentStatus, LogManager},
    types::Pod,
    utils::HandyRwLock,
};

/// We collect all global variables here.
///
/// These variables cannot be initialized as static variables, because
/// their initialization functions all rely on non-const fn (e.g.
/// `HashMap::new()`).
pub struct Database {
    path: PathBuf,

    buffer_pool: Pod<BufferPool>,
    catalog: Pod<Catalog>,
    concurrent_status: Pod<ConcurrentStatus>,
    log_manager: Pod<LogManager>,
    table_stats: Pod<HashMap<String, Arc<TableStats>>>,
}

static mut SINGLETON: *mut Database = 0 as *mut Database;

impl Database {
    fn new() -> Self {
        let db_name = "default_db";
        let db_path = PathBuf::from("data").join(db_name);
        if !db_path.exists() {
            std::fs::create_dir_all(&db_path).unwrap();
        }

        let log_path = db_path.join("wal.log");

        Self {
            path: db_path,

            buffer_pool: Arc::new(RwLock::new(BufferPool::new())),
            catalog: Arc::new(RwLock::new(Catalog::new())),
            concurrent_status: Arc::new(RwLock::new(ConcurrentStatus::new())),
            log_manager: Arc::new(RwLock::new(
                LogManager::new(log_path).expect("cannot open the log file"),
            )),
            table_stats: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Reset the in-memory state of the database, used by tests to
    /// model a process restart.
    ///
    /// Actions:
    /// - Page cache is dropped.
    /// - Catalog is dropped; tables must be registered again.
    /// - Lock table and statistics registry are dropped.
    /// - The log manager is reopened; the log file itself keeps its
    ///   content.
    pub fn reset() {
        // Make sure the singleton exists before swapping it out.
        Self::global();

        let singleton = Self::new();

        unsafe {
            if !SINGLETON.is_null() {
                // Drop the previous db instance.
                mem::drop(Box::from_raw(SINGLETON));
            }

            // Put it in the heap so it can outlive this call.
            SINGLETON = mem::transmute(Box::new(singleton));
        }
    }

    // The buffer pool is a concurrent structure guarded by its own
    // mutex, so only read access to the pod is ever handed out.
    pub fn buffer_pool() -> RwLockReadGuard<'static, BufferPool> {
        Self::global().buffer_pool.rl()
    }

    pub fn catalog() -> RwLockReadGuard<'static, Catalog> {
        Self::global().catalog.rl()
    }

    pub fn mut_catalog() -> RwLockWriteGuard<'static, Catalog> {
        Self::global().catalog.wl()
    }

    pub fn concurrent_status() -> RwLockReadGuard<'static, ConcurrentStatus> {
        Self::global().concurrent_status.rl()
    }

    pub fn mut_concurrent_status() -> RwLockWriteGuard<'static, ConcurrentStatus> {
        Self::global().concurrent_status.wl()
    }

    pub fn log_manager() -> RwLockReadGuard<'static, LogManager> {
        Self::global().log_manager.rl()
    }

    pub fn mut_log_manager() -> RwLockWriteGuard<'static, LogManager> {
        Self::global().log_manager.wl()
    }

    pub fn table_stats(
    ) -> RwLockReadGuard<'static, HashMap<String, Arc<TableStats>>> {
        Self::global().table_stats.rl()
    }

    pub fn mut_table_stats(
    ) -> RwLockWriteGuard<'static, HashMap<String, Arc<TableStats>>> {
        Self::global().table_stats.wl()
    }

    pub fn global() -> &'static Self {
        static ONCE: Once = Once::new();

        ONCE.call_once(|| {
            let singleton = Self::new();

            unsafe {
                // Put it in the heap so it can outlive this call
                SINGLETON = mem::transmute(Box::new(singleton));
            }
        });

        unsafe {
            // Now we give out a copy of the data that is safe to use
            // concurrently.
            SINGLETON.as_ref().unwrap()
        }
    }

    pub fn get_path(&self) -> PathBuf {
        self.path.clone()
    }
}
