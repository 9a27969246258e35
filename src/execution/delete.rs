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

/// Deletes every tuple its child produces, addressed by record id, and
/// emits one single-field tuple holding the delete count. The child
/// must preserve record ids, i.e. be a scan or a filter over one.
pub struct Delete {
    tx: Transaction,
    child: Box<dyn OpIterator>,
    schema: Schema,

    open: bool,
    done: bool,
    next_tuple: Option<WrappedTuple>,
}

impl Delete {
    pub fn new(tx: &Transaction, child: Box<dyn OpIterator>) -> Self {
        Self {
            tx: *tx,
            child,
            schema: Schema::new(vec![FieldItem::new("count", Type::Int)]),
            open: false,
            done: false,
            next_tuple: None,
        }
    }

    fn fetch_next(&mut self) -> Result<Option<WrappedTuple>, DbError> {
        if self.done {
            return Ok(None);
        }

        let mut count = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            Database::buffer_pool().delete_tuple(&self.tx, &tuple)?;
            count += 1;
        }

        self.done = true;
        Ok(Some(WrappedTuple::new_unplaced(Tuple::new_from_cells(&[
            Cell::Int(count),
        ]))))
    }
}

impl OpIterator for Delete {
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
                "delete is not open".to_string(),
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
