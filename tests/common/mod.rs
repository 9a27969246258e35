use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use rand::Rng;

use heap_db::{
    create_random_heap_table, small_int_schema, utils, BufferPool, Database,
    HeapTable,
};

use heap_db::types::Pod;

/// # Conduct the initialization
///
/// - Setting up log configurations.
/// - Reset the database singleton (page cache, catalog, lock table).
/// - Reset the page size.
///
/// Tests inside one binary share the database singleton, so the
/// returned guard serializes them.
pub fn setup() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());

    utils::init_log();

    let guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());

    BufferPool::set_page_size(heap_db::storage::buffer_pool::DEFAULT_PAGE_SIZE);
    Database::reset();

    guard
}

/// A file path under the system temp dir that no other test is using.
pub fn unique_db_path(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    std::env::temp_dir()
        .join(format!("{}_{}.db", prefix, suffix))
        .to_str()
        .unwrap()
        .to_string()
}

/// Create a table of random integer rows and register it with the
/// catalog. The generated rows are returned through `cells`.
#[allow(dead_code)]
pub fn new_random_heap_table(
    table_name: &str,
    columns: usize,
    rows: usize,
    cells: &mut Vec<Vec<i32>>,
) -> Pod<HeapTable> {
    let path = unique_db_path(table_name);
    let table =
        create_random_heap_table(&path, columns, rows, 10000, cells).unwrap();
    let table_rc = Arc::new(RwLock::new(table));
    Database::mut_catalog().add_table(table_rc.clone(), table_name);
    table_rc
}

/// Create an empty table and register it with the catalog.
#[allow(dead_code)]
pub fn new_empty_heap_table(table_name: &str, columns: usize) -> Pod<HeapTable> {
    let path = unique_db_path(table_name);
    let schema = small_int_schema(columns, "");
    let table = HeapTable::new(&path, &schema).unwrap();
    let table_rc = Arc::new(RwLock::new(table));
    Database::mut_catalog().add_table(table_rc.clone(), table_name);
    table_rc
}
