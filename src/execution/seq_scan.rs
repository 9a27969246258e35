use crate::{
    common::Database,
    error::DbError,
    execution::op_iterator::OpIterator,
    storage::{heap_table::HeapTableIterator, schema::Schema, tuple::WrappedTuple},
    transaction::Transaction,
    types::DbResult,
    utils::HandyRwLock,
};

/// Sequential scan over one table on behalf of a transaction, the
/// leaf of every iterator tree.
pub struct SeqScan {
    tx: Transaction,
    table_id: u32,
    pub table_alias: String,
    schema: Schema,

    iter: Option<HeapTableIterator>,
    next_tuple: Option<WrappedTuple>,
}

impl SeqScan {
    pub fn new(
        tx: &Transaction,
        table_id: u32,
        table_alias: &str,
    ) -> Result<Self, DbError> {
        let schema = Database::catalog()
            .get_tuple_desc(&table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", table_id)))?;

        Ok(Self {
            tx: *tx,
            table_id,
            table_alias: table_alias.to_string(),
            schema,
            iter: None,
            next_tuple: None,
        })
    }

    fn fetch_next(&mut self) -> Result<Option<WrappedTuple>, DbError> {
        match &mut self.iter {
            Some(iter) => iter.try_next(),
            None => Err(DbError::IllegalArgument(
                "scan is not open".to_string(),
            )),
        }
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> DbResult {
        let table_rc = Database::catalog()
            .get_table(&self.table_id)
            .ok_or_else(|| {
                DbError::NoSuchTable(format!("table id {}", self.table_id))
            })?;

        self.iter = Some(table_rc.rl().iterator(&self.tx));
        self.next_tuple = None;
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.iter = None;
        self.next_tuple = None;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if self.iter.is_none() {
            return Err(DbError::IllegalArgument(
                "scan is not open".to_string(),
            ));
        }

        if self.next_tuple.is_none() {
            self.next_tuple = self.fetch_next()?;
        }
        Ok(self.next_tuple.is_some())
    }

    fn next(&mut self) -> Result<WrappedTuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement);
        }
        Ok(self.next_tuple.take().unwrap())
    }

    fn rewind(&mut self) -> DbResult {
        self.close()?;
        self.open()
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}
