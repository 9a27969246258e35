use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    io::SeekFrom,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use log::debug;

use crate::{
    common::Database,
    error::DbError,
    io::DbFile,
    storage::{
        buffer_pool::BufferPool,
        heap_page::HeapPage,
        page_id::HeapPageID,
        schema::Schema,
        tuple::{Tuple, WrappedTuple},
    },
    transaction::{Permission, Transaction},
    types::{DbResult, Pod, ResultPod},
    utils::HandyRwLock,
};

/// A table stored as a flat sequence of fixed-size pages, addressed by
/// their zero-based index. There is no file header; an empty page is
/// all-zero bytes.
pub struct HeapTable {
    file_path: PathBuf,

    file: Arc<Mutex<DbFile>>,

    pub schema: Schema,

    table_id: u32,
}

impl HeapTable {
    /// Open (or create) the backing file. A file whose length is not a
    /// multiple of the page size is corrupt and gets rejected.
    pub fn new<P: AsRef<Path>>(file_path: P, schema: &Schema) -> Result<Self, DbError> {
        let file = DbFile::new(&file_path)?;

        let len = file.get_size()?;
        let page_size = BufferPool::get_page_size() as u64;
        if len % page_size != 0 {
            return Err(DbError::InvalidPage(format!(
                "file length {} is not a multiple of the page size {}",
                len, page_size
            )));
        }

        let file_path = std::fs::canonicalize(&file_path)?;

        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Ok(Self {
            file_path,
            file: Arc::new(Mutex::new(file)),
            schema: schema.clone(),
            table_id,
        })
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> Schema {
        self.schema.clone()
    }

    pub fn get_file(&self) -> MutexGuard<'_, DbFile> {
        self.file.lock().unwrap()
    }

    pub fn get_num_pages(&self) -> usize {
        let len = self.get_file().get_size().unwrap_or(0);
        len as usize / BufferPool::get_page_size()
    }

    /// Read one page straight from disk, bypassing the buffer pool.
    pub fn read_page(&self, page_index: u32) -> Result<HeapPage, DbError> {
        let page_size = BufferPool::get_page_size();
        let start_pos = page_index as usize * page_size;

        let mut file = self.get_file();

        let len = file.get_size()?;
        if (start_pos + page_size) as u64 > len {
            return Err(DbError::InvalidPage(format!(
                "page {} is beyond the end of the file ({} bytes)",
                page_index, len
            )));
        }

        file.seek(SeekFrom::Start(start_pos as u64))?;
        let mut buf: Vec<u8> = vec![0; page_size];
        file.read_exact(&mut buf)?;

        debug!("read page {} of table {}", page_index, self.table_id);

        let pid = HeapPageID::new(self.table_id, page_index);
        Ok(HeapPage::new(&pid, &buf, &self.schema))
    }

    /// Write the page back to its slot in the file and clear its dirty
    /// flag.
    pub fn write_page(&self, page: &mut HeapPage) -> DbResult {
        let page_size = BufferPool::get_page_size();
        let start_pos = page.get_pid().page_index as usize * page_size;

        let data = page.get_page_data();

        let mut file = self.get_file();
        file.seek(SeekFrom::Start(start_pos as u64))?;
        file.write_all(&data)?;
        file.flush()?;

        page.set_dirty(None);

        debug!(
            "flushed page {} of table {}",
            page.get_pid().page_index,
            self.table_id
        );
        Ok(())
    }

    /// Grow the file by one empty page, returning the new page index.
    fn append_empty_page(&self) -> Result<u32, DbError> {
        let page_size = BufferPool::get_page_size();

        let mut file = self.get_file();
        let len = file.get_size()?;
        let page_index = (len / page_size as u64) as u32;

        file.seek(SeekFrom::End(0))?;
        file.write_all(&vec![0u8; page_size])?;
        file.flush()?;

        debug!(
            "appended page {} to table {}",
            page_index, self.table_id
        );
        Ok(page_index)
    }

    /// Place the tuple on the first page with a free slot, appending a
    /// page when the whole file is full. Every touched page is
    /// acquired read-write through the buffer pool; the mutated pages
    /// are returned for the caller to mark dirty.
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, DbError> {
        for i in 0..self.get_num_pages() {
            let pid = HeapPageID::new(self.table_id, i as u32);
            let page_rc =
                Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;

            let slot = {
                let mut page = page_rc.wl();
                if page.empty_slots_count() == 0 {
                    // a full page that is still clean was only
                    // inspected, its lock goes back right away; one
                    // this transaction dirtied stays locked until
                    // commit
                    let clean = !page.is_dirty();
                    drop(page);
                    if clean {
                        Database::mut_concurrent_status().release_lock(tx, &pid);
                    }
                    continue;
                }
                page.insert_tuple(tuple)?
            };

            debug!("inserted tuple into slot {} of {}", slot, pid);
            return Ok(vec![page_rc]);
        }

        let page_index = self.append_empty_page()?;
        let pid = HeapPageID::new(self.table_id, page_index);
        let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;
        page_rc.wl().insert_tuple(tuple)?;
        Ok(vec![page_rc])
    }

    /// Delete the tuple addressed by the wrapped tuple's record id.
    pub fn delete_tuple(
        &self,
        tx: &Transaction,
        tuple: &WrappedTuple,
    ) -> ResultPod<HeapPage> {
        let pid = tuple.get_pid();
        if pid.get_table_id() != self.table_id {
            return Err(DbError::TupleNotFound);
        }

        let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;
        page_rc
            .wl()
            .delete_tuple(tuple.get_slot_number(), tuple)?;
        Ok(page_rc)
    }

    /// Lazy, restartable scan over all pages in page-number order.
    /// Pages are acquired read-only through the buffer pool; the
    /// iterator releases no locks of its own.
    pub fn iterator(&self, tx: &Transaction) -> HeapTableIterator {
        HeapTableIterator::new(tx, self.table_id, self.get_num_pages())
    }

    pub fn tuples_count(&self, tx: &Transaction) -> usize {
        self.iterator(tx).count()
    }
}

impl fmt::Display for HeapTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "HeapTable {{ id: {}, path: {:?}, pages: {} }}",
            self.table_id,
            self.file_path,
            self.get_num_pages()
        )
    }
}

pub struct HeapTableIterator {
    tx: Transaction,
    table_id: u32,
    page_count: usize,

    next_page_index: usize,
    tuples: Vec<WrappedTuple>,
    cursor: usize,
}

impl HeapTableIterator {
    pub fn new(tx: &Transaction, table_id: u32, page_count: usize) -> Self {
        Self {
            tx: *tx,
            table_id,
            page_count,
            next_page_index: 0,
            tuples: Vec::new(),
            cursor: 0,
        }
    }

    pub fn try_next(&mut self) -> Result<Option<WrappedTuple>, DbError> {
        loop {
            if self.cursor < self.tuples.len() {
                let tuple = self.tuples[self.cursor].clone();
                self.cursor += 1;
                return Ok(Some(tuple));
            }

            if self.next_page_index >= self.page_count {
                return Ok(None);
            }

            self.load_page(self.next_page_index as u32)?;
            self.next_page_index += 1;
            self.cursor = 0;
        }
    }

    pub fn rewind(&mut self) {
        self.next_page_index = 0;
        self.tuples.clear();
        self.cursor = 0;
    }

    fn load_page(&mut self, page_index: u32) -> DbResult {
        let pid = HeapPageID::new(self.table_id, page_index);
        let page_rc =
            Database::buffer_pool().get_page(&self.tx, Permission::ReadOnly, &pid)?;
        let page = page_rc.rl();
        self.tuples = page.iterator().collect();
        Ok(())
    }
}

impl Iterator for HeapTableIterator {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().unwrap_or_else(|e| {
            e.show_backtrace();
            panic!("table scan failed: {}", e)
        })
    }
}

/// Build a heap file of random integer rows, bypassing the buffer
/// pool: pages are assembled in memory and written out back to back.
/// The generated rows are appended to `cells` so callers can validate
/// scans against them.
pub fn create_random_heap_table(
    file_path: &str,
    columns: usize,
    rows: usize,
    max_value: i32,
    cells: &mut Vec<Vec<i32>>,
) -> Result<HeapTable, DbError> {
    use rand::Rng;
    use std::io::Write;

    let mut rng = rand::thread_rng();
    for _ in 0..rows {
        let mut row_cells: Vec<i32> = Vec::new();
        for _ in 0..columns {
            row_cells.push(rng.gen_range(1, max_value));
        }
        cells.push(row_cells);
    }

    let schema = crate::storage::schema::small_int_schema(columns, "");
    let slots_per_page = HeapPage::calculate_slots_count(&schema);

    let mut file = std::fs::File::create(file_path)?;
    for (page_index, chunk) in cells.chunks(slots_per_page).enumerate() {
        let pid = HeapPageID::new(0, page_index as u32);
        let mut page = HeapPage::new(&pid, &HeapPage::empty_page_data(), &schema);

        for row_cells in chunk {
            let cells: Vec<crate::storage::tuple::Cell> = row_cells
                .iter()
                .map(|v| crate::storage::tuple::Cell::Int(*v))
                .collect();
            page.insert_tuple(&Tuple::new_from_cells(&cells))?;
        }

        file.write_all(&page.get_page_data())?;
    }
    file.flush()?;
    drop(file);

    HeapTable::new(file_path, &schema)
}
