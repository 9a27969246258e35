use crate::{
    common::Database,
    error::DbError,
    execution::op_iterator::OpIterator,
    storage::{
        schema::{FieldItem, Schema, Type},
        tuple::{Cell, Tuple, WrappedTuple},
    },
    transaction::Transaction,
    types::DbResult,
};

/// Drains its child into the target table through the buffer pool and
/// emits exactly one single-field tuple holding the insert count.
pub struct Insert {
    tx: Transaction,
    child: Box<dyn OpIterator>,
    table_id: u32,
    schema: Schema,

    open: bool,
    done: bool,
    next_tuple: Option<WrappedTuple>,
}

impl Insert {
    pub fn new(
        tx: &Transaction,
        child: Box<dyn OpIterator>,
        table_id: u32,
    ) -> Result<Self, DbError> {
        let table_schema = Database::catalog()
            .get_tuple_desc(&table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", table_id)))?;

        if child.get_schema() != table_schema {
            return Err(DbError::SchemaMismatch(format!(
                "cannot insert {} into a table of {}",
                child.get_schema(),
                table_schema
            )));
        }

        Ok(Self {
            tx: *tx,
            child,
            table_id,
            schema: Schema::new(vec![FieldItem::new("count", Type::Int)]),
            open: false,
            done: false,
            next_tuple: None,
        })
    }

    fn fetch_next(&mut self) -> Result<Option<WrappedTuple>, DbError> {
        if self.done {
            return Ok(None);
        }

        let mut count = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            Database::buffer_pool().insert_tuple(&self.tx, self.table_id, &tuple)?;
            count += 1;
        }

        self.done = true;
        Ok(Some(WrappedTuple::new_unplaced(Tuple::new_from_cells(&[
            Cell::Int(count),
        ]))))
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> DbResult {
        self.child.open()?;
        self.open = true;
        self.done = false;
        self.next_tuple = None;
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.child.close()?;
        self.open = false;
        self.next_tuple = None;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.open {
            return Err(DbError::IllegalArgument(
                "insert is not open".to_string(),
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
        self.child.rewind()?;
        self.done = false;
        self.next_tuple = None;
        Ok(())
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}
