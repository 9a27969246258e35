use std::thread;

use log::debug;

use heap_db::{
    transaction::{Lock, Permission, Transaction},
    types::Pod,
    utils::HandyRwLock,
    Cell, Database, DbError, HeapPageID, HeapTable, Tuple,
};

mod common;

use common::{new_random_heap_table, setup};

// A lone shared holder upgrades to exclusive in place.
#[test]
fn test_upgrade_when_alone() {
    let _guard = setup();

    let mut cells = Vec::new();
    let table_rc = new_random_heap_table("upgrade_table", 2, 10, &mut cells);
    let table_id = table_rc.rl().get_id();
    let pid = HeapPageID::new(table_id, 0);

    let t1 = Transaction::new();
    Database::buffer_pool()
        .get_page(&t1, Permission::ReadOnly, &pid)
        .unwrap();
    assert_eq!(
        Database::concurrent_status().get_lock_mode(&t1, &pid),
        Some(Lock::SLock)
    );

    Database::buffer_pool()
        .get_page(&t1, Permission::ReadWrite, &pid)
        .unwrap();
    assert_eq!(
        Database::concurrent_status().get_lock_mode(&t1, &pid),
        Some(Lock::XLock)
    );

    t1.commit().unwrap();
    assert!(Database::concurrent_status().get_lock_mode(&t1, &pid).is_none());
}

// With another reader on the page the upgrade cannot be granted; the
// request times out after its retries and the transaction aborts.
#[test]
fn test_upgrade_blocked_by_other_reader() {
    let _guard = setup();

    let mut cells = Vec::new();
    let table_rc = new_random_heap_table("blocked_table", 2, 10, &mut cells);
    let table_id = table_rc.rl().get_id();
    let pid = HeapPageID::new(table_id, 0);

    let t1 = Transaction::new();
    let t2 = Transaction::new();

    Database::buffer_pool()
        .get_page(&t1, Permission::ReadOnly, &pid)
        .unwrap();
    Database::buffer_pool()
        .get_page(&t2, Permission::ReadOnly, &pid)
        .unwrap();

    let result = Database::buffer_pool().get_page(&t1, Permission::ReadWrite, &pid);
    assert!(matches!(result, Err(DbError::LockTimeout(_))));

    t1.abort().unwrap();

    // with the rival gone the writer moves in immediately
    Database::buffer_pool()
        .get_page(&t2, Permission::ReadWrite, &pid)
        .unwrap();
    t2.commit().unwrap();
}

// Two writers contending for the same page: one of them times out,
// aborts and succeeds on retry once the winner committed.
#[test]
fn test_writer_aborts_and_retries() {
    let _guard = setup();

    let mut cells = Vec::new();
    let table_rc = new_random_heap_table("retry_table", 2, 10, &mut cells);
    let table_id = table_rc.rl().get_id();
    let pid = HeapPageID::new(table_id, 0);

    let t1 = Transaction::new();
    Database::buffer_pool()
        .get_page(&t1, Permission::ReadWrite, &pid)
        .unwrap();

    let t2 = Transaction::new();
    let result = Database::buffer_pool().get_page(&t2, Permission::ReadWrite, &pid);
    assert!(matches!(result, Err(DbError::LockTimeout(_))));
    t2.abort().unwrap();

    t1.commit().unwrap();

    let t3 = Transaction::new();
    Database::buffer_pool()
        .get_page(&t3, Permission::ReadWrite, &pid)
        .unwrap();
    t3.commit().unwrap();
}

// The free-slot walk of an insert hands back the lock on every full
// page it merely inspected; only the page that took the tuple stays
// locked.
#[test]
fn test_insert_releases_full_pages() {
    let _guard = setup();

    let mut cells = Vec::new();
    // exactly one completely full page
    let table_rc = new_random_heap_table("full_page_table", 2, 504, &mut cells);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    Database::buffer_pool()
        .insert_tuple(&tx, table_id, &Tuple::new_int_tuple(1, 2))
        .unwrap();

    assert!(!Database::concurrent_status()
        .holds_lock(&tx, &HeapPageID::new(table_id, 0)));
    assert_eq!(
        Database::concurrent_status()
            .get_lock_mode(&tx, &HeapPageID::new(table_id, 1)),
        Some(Lock::XLock)
    );

    // the released page is free for a concurrent reader right away
    let t2 = Transaction::new();
    Database::buffer_pool()
        .get_page(&t2, Permission::ReadOnly, &HeapPageID::new(table_id, 0))
        .unwrap();

    t2.commit().unwrap();
    tx.commit().unwrap();
}

// Insert one tuple, retrying the whole transaction when a lock
// request times out.
fn inserter(table_id: u32, value: i32, s: &crossbeam::channel::Sender<i32>) {
    loop {
        let tx = Transaction::new();
        let tuple = Tuple::new_from_cells(&[Cell::Int(value), Cell::Int(0)]);

        match Database::buffer_pool().insert_tuple(&tx, table_id, &tuple) {
            Ok(()) => {
                tx.commit().unwrap();
                s.send(value).unwrap();
                return;
            }
            Err(e) => {
                debug!("insert of {} aborted: {}", value, e);
                tx.abort().unwrap();
            }
        }
    }
}

// Delete one tuple by value, with the same retry discipline. The
// scan itself can hit a lock timeout too, which also aborts and
// retries the whole transaction.
fn deleter(table_rc: &Pod<HeapTable>, r: &crossbeam::channel::Receiver<i32>) {
    let value = r.recv().unwrap();

    loop {
        let tx = Transaction::new();
        match scan_and_delete(&tx, table_rc, value) {
            Ok(()) => {
                tx.commit().unwrap();
                return;
            }
            Err(e) => {
                debug!("delete of {} aborted: {}", value, e);
                tx.abort().unwrap();
            }
        }
    }
}

fn scan_and_delete(
    tx: &Transaction,
    table_rc: &Pod<HeapTable>,
    value: i32,
) -> Result<(), DbError> {
    let mut iter = table_rc.rl().iterator(tx);
    while let Some(tuple) = iter.try_next()? {
        if tuple.get_cell(0) == Cell::Int(value) {
            return Database::buffer_pool().delete_tuple(tx, &tuple);
        }
    }
    Err(DbError::TupleNotFound)
}

// Concurrent inserts and deletes against one table; every conflict is
// resolved by the timeout-abort-retry loop, and the tuple count comes
// out exact.
#[test]
fn test_concurrent_inserts_and_deletes() {
    let _guard = setup();

    let mut cells = Vec::new();
    let row_count = 100;
    let table_rc = new_random_heap_table("concurrent_table", 2, row_count, &mut cells);
    let table_id = table_rc.rl().get_id();

    let (sender, receiver) = crossbeam::channel::unbounded();

    let mut threads = vec![];
    for i in 0..20 {
        let local_sender = sender.clone();
        let handle = thread::spawn(move || inserter(table_id, 20000 + i, &local_sender));
        threads.push(handle);
    }
    for handle in threads {
        handle.join().unwrap();
    }

    let tx = Transaction::new();
    assert_eq!(table_rc.rl().tuples_count(&tx), row_count + 20);
    tx.commit().unwrap();

    let mut threads = vec![];
    for _ in 0..20 {
        let local_table = table_rc.clone();
        let local_receiver = receiver.clone();
        let handle = thread::spawn(move || deleter(&local_table, &local_receiver));
        threads.push(handle);
    }
    for handle in threads {
        handle.join().unwrap();
    }

    let tx = Transaction::new();
    assert_eq!(table_rc.rl().tuples_count(&tx), row_count);
    tx.commit().unwrap();
}
