use crate::{
    error::DbError,
    execution::{op_iterator::OpIterator, predicate::Predicate},
    storage::{schema::Schema, tuple::WrappedTuple},
    types::DbResult,
};

/// Emits the child tuples whose predicate field satisfies the
/// comparison against the constant.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,

    open: bool,
    next_tuple: Option<WrappedTuple>,
}

impl Filter {
    pub fn new(
        predicate: Predicate,
        child: Box<dyn OpIterator>,
    ) -> Result<Self, DbError> {
        if predicate.field_index >= child.get_schema().fields.len() {
            return Err(DbError::IllegalArgument(format!(
                "predicate field {} outside of schema {}",
                predicate.field_index,
                child.get_schema()
            )));
        }

        Ok(Self {
            predicate,
            child,
            open: false,
            next_tuple: None,
        })
    }

    fn fetch_next(&mut self) -> Result<Option<WrappedTuple>, DbError> {
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.matches(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> DbResult {
        self.child.open()?;
        self.open = true;
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
                "filter is not open".to_string(),
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
        self.next_tuple = None;
        Ok(())
    }

    fn get_schema(&self) -> Schema {
        self.child.get_schema()
    }
}
