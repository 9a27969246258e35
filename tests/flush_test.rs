use heap_db::{
    transaction::{Permission, Transaction},
    utils::HandyRwLock,
    Cell, Database, HeapPageID, Tuple,
};

mod common;

use common::{new_empty_heap_table, setup};

// A targeted flush writes one dirty page through to the heap file and
// clears its dirty flag, ahead of the owning transaction's commit.
#[test]
fn test_flush_page_writes_through() {
    let _guard = setup();

    let table_rc = new_empty_heap_table("flush_page_table", 2);
    let table_id = table_rc.rl().get_id();
    let pid = HeapPageID::new(table_id, 0);

    let tx = Transaction::new();
    tx.start().unwrap();
    Database::buffer_pool()
        .insert_tuple(&tx, table_id, &Tuple::new_int_tuple(42, 2))
        .unwrap();

    // still cached only
    assert_eq!(table_rc.rl().read_page(0).unwrap().tuples_count(), 0);

    Database::buffer_pool().flush_page(&pid).unwrap();

    let on_disk = table_rc.rl().read_page(0).unwrap();
    assert_eq!(on_disk.tuples_count(), 1);

    let page_rc = Database::buffer_pool()
        .get_page(&tx, Permission::ReadWrite, &pid)
        .unwrap();
    assert!(page_rc.rl().get_dirtier().is_none());

    // flushing a page that is no longer dirty is a no-op
    Database::buffer_pool().flush_page(&pid).unwrap();

    tx.commit().unwrap();

    let t2 = Transaction::new();
    let scanned: Vec<_> = table_rc.rl().iterator(&t2).collect();
    assert_eq!(scanned.len(), 1);
    assert_eq!(scanned[0].get_cell(0), Cell::Int(42));
    t2.commit().unwrap();
}

// Checkpoint-style bulk flush: every dirty page in the pool reaches
// disk, whatever page it is and whichever transaction dirtied it.
#[test]
fn test_flush_all_pages() {
    let _guard = setup();

    let table_rc = new_empty_heap_table("flush_all_table", 2);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    tx.start().unwrap();
    for v in 0..505 {
        Database::buffer_pool()
            .insert_tuple(&tx, table_id, &Tuple::new_int_tuple(v, 2))
            .unwrap();
    }

    // 504 tuples fill page 0, the 505th grew the file by a page
    assert_eq!(table_rc.rl().get_num_pages(), 2);
    assert_eq!(table_rc.rl().read_page(0).unwrap().tuples_count(), 0);
    assert_eq!(table_rc.rl().read_page(1).unwrap().tuples_count(), 0);

    Database::buffer_pool().flush_all_pages().unwrap();

    assert_eq!(table_rc.rl().read_page(0).unwrap().tuples_count(), 504);
    assert_eq!(table_rc.rl().read_page(1).unwrap().tuples_count(), 1);

    tx.commit().unwrap();
}

// Discarding a cached page drops the in-memory version entirely; the
// next access re-reads the on-disk state. The abort path rolls back
// exactly this way.
#[test]
fn test_discard_page() {
    let _guard = setup();

    let table_rc = new_empty_heap_table("discard_table", 2);
    let table_id = table_rc.rl().get_id();
    let pid = HeapPageID::new(table_id, 0);

    let tx = Transaction::new();
    Database::buffer_pool()
        .insert_tuple(&tx, table_id, &Tuple::new_int_tuple(7, 2))
        .unwrap();
    assert!(Database::buffer_pool().contains(&pid));
    assert_eq!(table_rc.rl().tuples_count(&tx), 1);

    Database::buffer_pool().discard_page(&pid);
    assert!(!Database::buffer_pool().contains(&pid));

    // the cached write is gone, the pool serves the disk state again
    assert_eq!(table_rc.rl().tuples_count(&tx), 0);

    tx.abort().unwrap();
}
