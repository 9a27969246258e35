use crate::{
    error::DbError,
    execution::{op_iterator::OpIterator, predicate::JoinPredicate},
    storage::{
        schema::Schema,
        tuple::{Tuple, WrappedTuple},
    },
    types::DbResult,
};

/// Nested-loop join: for every outer tuple the inner child is drained
/// and rewound. The output schema is the concatenation of the
/// children's schemas.
pub struct Join {
    predicate: JoinPredicate,
    child1: Box<dyn OpIterator>,
    child2: Box<dyn OpIterator>,

    open: bool,
    outer: Option<WrappedTuple>,
    next_tuple: Option<WrappedTuple>,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        child1: Box<dyn OpIterator>,
        child2: Box<dyn OpIterator>,
    ) -> Result<Self, DbError> {
        if predicate.field1 >= child1.get_schema().fields.len()
            || predicate.field2 >= child2.get_schema().fields.len()
        {
            return Err(DbError::IllegalArgument(format!(
                "join fields ({}, {}) outside of schemas",
                predicate.field1, predicate.field2
            )));
        }

        Ok(Self {
            predicate,
            child1,
            child2,
            open: false,
            outer: None,
            next_tuple: None,
        })
    }

    fn fetch_next(&mut self) -> Result<Option<WrappedTuple>, DbError> {
        loop {
            if self.outer.is_none() {
                if !self.child1.has_next()? {
                    return Ok(None);
                }
                self.outer = Some(self.child1.next()?);
            }

            let outer = self.outer.as_ref().unwrap().clone();
            while self.child2.has_next()? {
                let inner = self.child2.next()?;
                if self.predicate.matches(&outer, &inner) {
                    let mut cells = outer.get_cells();
                    cells.extend(inner.get_cells());
                    let merged = Tuple::new_from_cells(&cells);
                    return Ok(Some(WrappedTuple::new_unplaced(merged)));
                }
            }

            // inner exhausted, move to the next outer tuple
            self.child2.rewind()?;
            self.outer = None;
        }
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> DbResult {
        self.child1.open()?;
        self.child2.open()?;
        self.open = true;
        self.outer = None;
        self.next_tuple = None;
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.child1.close()?;
        self.child2.close()?;
        self.open = false;
        self.outer = None;
        self.next_tuple = None;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.open {
            return Err(DbError::IllegalArgument(
                "join is not open".to_string(),
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
        self.child1.rewind()?;
        self.child2.rewind()?;
        self.outer = None;
        self.next_tuple = None;
        Ok(())
    }

    fn get_schema(&self) -> Schema {
        Schema::merge(self.child1.get_schema(), self.child2.get_schema())
    }
}
