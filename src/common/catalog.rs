use std::collections::HashMap;

use crate::{
    storage::{heap_table::HeapTable, schema::Schema},
    types::Pod,
    utils::HandyRwLock,
};

type TableID = u32;
type TableRC = Pod<HeapTable>;

/// Registry of every table in the database, keyed by table id.
pub struct Catalog {
    tables: HashMap<TableID, TableRC>,

    table_names: HashMap<TableID, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            table_names: HashMap::new(),
        }
    }

    pub fn add_table(&mut self, table_rc: TableRC, table_name: &str) {
        let table_id = table_rc.rl().get_id();
        self.tables.insert(table_id, table_rc);
        self.table_names
            .insert(table_id, table_name.to_string());
    }

    pub fn get_table(&self, table_id: &TableID) -> Option<TableRC> {
        self.tables.get(table_id).cloned()
    }

    pub fn get_table_by_name(&self, table_name: &str) -> Option<TableRC> {
        self.table_names
            .iter()
            .find(|(_, name)| name.as_str() == table_name)
            .and_then(|(table_id, _)| self.get_table(table_id))
    }

    pub fn get_tuple_desc(&self, table_id: &TableID) -> Option<Schema> {
        self.tables
            .get(table_id)
            .map(|table_rc| table_rc.rl().get_schema())
    }

    pub fn get_table_name(&self, table_id: &TableID) -> Option<String> {
        self.table_names.get(table_id).cloned()
    }

    /// Snapshot of all registered table ids, in a stable order.
    pub fn table_id_iterator(&self) -> impl Iterator<Item = TableID> {
        let mut ids: Vec<TableID> = self.tables.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
    }

    pub fn tables_count(&self) -> usize {
        self.tables.len()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
        self.table_names.clear();
    }
}
