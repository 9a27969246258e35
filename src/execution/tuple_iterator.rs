use crate::{
    error::DbError,
    execution::op_iterator::OpIterator,
    storage::{schema::Schema, tuple::WrappedTuple},
    types::DbResult,
};

/// Operator over an in-memory tuple list. The leaf of choice for
/// operator tests and for feeding pre-computed results downstream.
pub struct TupleIterator {
    schema: Schema,
    tuples: Vec<WrappedTuple>,

    open: bool,
    cursor: usize,
}

impl TupleIterator {
    pub fn new(schema: &Schema, tuples: Vec<WrappedTuple>) -> Self {
        Self {
            schema: schema.clone(),
            tuples,
            open: false,
            cursor: 0,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> DbResult {
        self.open = true;
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.open = false;
        self.cursor = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.open {
            return Err(DbError::IllegalArgument(
                "iterator is not open".to_string(),
            ));
        }
        Ok(self.cursor < self.tuples.len())
    }

    fn next(&mut self) -> Result<WrappedTuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement);
        }

        let tuple = self.tuples[self.cursor].clone();
        self.cursor += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> DbResult {
        self.close()?;
        self.open()
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::small_int_schema;
    use crate::storage::tuple::Tuple;

    #[test]
    fn test_protocol() {
        let schema = small_int_schema(1, "");
        let tuples = vec![
            WrappedTuple::new_unplaced(Tuple::new_int_tuple(1, 1)),
            WrappedTuple::new_unplaced(Tuple::new_int_tuple(2, 1)),
        ];

        let mut iter = TupleIterator::new(&schema, tuples);
        assert!(iter.has_next().is_err());

        iter.open().unwrap();
        // has_next is idempotent
        assert!(iter.has_next().unwrap());
        assert!(iter.has_next().unwrap());

        assert_eq!(iter.next().unwrap().get_cells()[0].get_int().unwrap(), 1);
        assert_eq!(iter.next().unwrap().get_cells()[0].get_int().unwrap(), 2);
        assert!(!iter.has_next().unwrap());
        assert_eq!(iter.next(), Err(DbError::NoSuchElement));

        iter.rewind().unwrap();
        assert_eq!(iter.next().unwrap().get_cells()[0].get_int().unwrap(), 1);
    }
}
