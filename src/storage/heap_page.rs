use std::io::Cursor;

use bit_vec::BitVec;

use crate::{
    error::DbError,
    io::ByteWriter,
    storage::{
        buffer_pool::BufferPool, page_id::HeapPageID, schema::Schema, tuple::Tuple,
        tuple::WrappedTuple,
    },
    transaction::Transaction,
    types::DbResult,
};

/// A slotted heap page.
///
/// On disk the layout is `[header][slot 0]..[slot N-1][padding]` where
/// the header keeps one occupancy bit per slot, LSB-first within each
/// byte: bit `i % 8` of byte `i / 8` is set iff slot `i` holds a tuple.
pub struct HeapPage {
    pid: HeapPageID,

    schema: Schema,

    pub slot_count: usize,

    // indicate slots' status: true means occupied, false means empty
    header: BitVec,

    // all tuples (include placeholders for the empty slots)
    tuples: Vec<Tuple>,

    // the transaction that last modified the page, if any
    dirtier: Option<Transaction>,

    // byte snapshot captured at construction, refreshed at commit
    before_image: Vec<u8>,
}

impl HeapPage {
    pub fn new(pid: &HeapPageID, bytes: &[u8], schema: &Schema) -> Self {
        let page_size = BufferPool::get_page_size();
        assert_eq!(bytes.len(), page_size, "page buffer size mismatch");

        let slot_count = Self::calculate_slots_count(schema);
        let header_size = Self::calculate_header_size(slot_count);

        let mut header = BitVec::from_elem(slot_count, false);
        for i in 0..slot_count {
            let occupied = (bytes[i / 8] >> (i % 8)) & 1 == 1;
            header.set(i, occupied);
        }

        let tuple_size = schema.get_size();
        let mut tuples = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            let start = header_size + i * tuple_size;
            let end = start + tuple_size;
            let mut reader = Cursor::new(&bytes[start..end]);
            tuples.push(Tuple::read_from(&mut reader, schema));
        }

        Self {
            pid: *pid,
            schema: schema.clone(),
            slot_count,
            header,
            tuples,
            dirtier: None,
            before_image: bytes.to_vec(),
        }
    }

    /// Retrieve the maximum number of tuples this page can hold.
    pub fn calculate_slots_count(schema: &Schema) -> usize {
        let bits_per_tuple_including_header = schema.get_size() * 8 + 1;
        (BufferPool::get_page_size() * 8) / bits_per_tuple_including_header
    }

    /// Number of bytes the occupancy header takes for `slot_count`
    /// slots.
    pub fn calculate_header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_schema(&self) -> Schema {
        self.schema.clone()
    }

    /// Serialize the page back to its on-disk image. Empty slots are
    /// written as zero bytes, so `new(pid, get_page_data(), schema)`
    /// reproduces the page exactly.
    pub fn get_page_data(&self) -> Vec<u8> {
        let page_size = BufferPool::get_page_size();
        let header_size = Self::calculate_header_size(self.slot_count);
        let tuple_size = self.schema.get_size();

        let mut writer = ByteWriter::new();

        let mut header_bytes = vec![0u8; header_size];
        for i in 0..self.slot_count {
            if self.header[i] {
                header_bytes[i / 8] |= 1 << (i % 8);
            }
        }
        writer.write_bytes(&header_bytes);

        for i in 0..self.slot_count {
            if self.header[i] {
                self.tuples[i].write_to(&mut writer, &self.schema);
            } else {
                writer.write_bytes(&vec![0u8; tuple_size]);
            }
        }

        writer.to_padded_bytes(page_size)
    }

    /// Place `tuple` in the lowest free slot and return that slot.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> Result<usize, DbError> {
        if !tuple.matches_schema(&self.schema) {
            return Err(DbError::SchemaMismatch(format!(
                "tuple {} does not fit {}",
                tuple, self.schema
            )));
        }

        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                self.tuples[i] = tuple.clone();
                self.mark_slot_status(i, true);
                return Ok(i);
            }
        }

        Err(DbError::PageFull)
    }

    /// Remove the tuple at `slot`. The stored tuple must equal
    /// `tuple` field by field.
    pub fn delete_tuple(&mut self, slot: usize, tuple: &Tuple) -> DbResult {
        if slot >= self.slot_count {
            return Err(DbError::TupleNotFound);
        }
        if !self.is_slot_used(slot) {
            return Err(DbError::SlotEmpty);
        }
        if &self.tuples[slot] != tuple {
            return Err(DbError::TupleNotFound);
        }

        self.mark_slot_status(slot, false);
        Ok(())
    }

    /// Returns true if the associated slot on this page is filled.
    pub fn is_slot_used(&self, slot_index: usize) -> bool {
        self.header[slot_index]
    }

    // mark the slot as empty/filled
    pub fn mark_slot_status(&mut self, slot_index: usize, used: bool) {
        self.header.set(slot_index, used);
    }

    pub fn empty_slots_count(&self) -> usize {
        let mut count = 0;
        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                count += 1;
            }
        }
        count
    }

    /// Returns the number of tuples currently stored on this page.
    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }

    pub fn set_dirty(&mut self, dirtier: Option<Transaction>) {
        self.dirtier = dirtier;
    }

    pub fn get_dirtier(&self) -> Option<Transaction> {
        self.dirtier
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtier.is_some()
    }

    /// Refresh the before-image to the current page content. Called
    /// when the dirtying transaction commits.
    pub fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }

    pub fn get_before_image_data(&self) -> Vec<u8> {
        self.before_image.clone()
    }

    /// Reconstruct the page as it looked when the before-image was
    /// taken.
    pub fn get_before_image(&self) -> HeapPage {
        HeapPage::new(&self.pid, &self.before_image, &self.schema)
    }

    /// Occupied slots in slot-index order, over a snapshot of the
    /// slot array: concurrent modification after collection is not
    /// reflected.
    pub fn iterator(&self) -> HeapPageIterator<'_> {
        HeapPageIterator::new(self)
    }
}

pub struct HeapPageIterator<'page> {
    page: &'page HeapPage,
    cursor: i32,
}

impl<'page> HeapPageIterator<'page> {
    pub fn new(page: &'page HeapPage) -> Self {
        Self { page, cursor: -1 }
    }
}

impl Iterator for HeapPageIterator<'_> {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.cursor += 1;
            let cursor = self.cursor as usize;
            if cursor >= self.page.slot_count {
                return None;
            }

            if self.page.is_slot_used(cursor) {
                return Some(WrappedTuple::new(
                    self.page.tuples[cursor].clone(),
                    cursor,
                    self.page.get_pid(),
                ));
            }
        }
    }
}
