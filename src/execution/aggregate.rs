use std::{collections::HashMap, fmt};

use crate::{
    error::DbError,
    execution::op_iterator::OpIterator,
    storage::{
        schema::{FieldItem, Schema, Type},
        tuple::{Cell, Tuple, WrappedTuple},
    },
    types::DbResult,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
            AggregateOp::Count => "COUNT",
        };
        write!(f, "{}", repr)
    }
}

/// Eager aggregation over one column, optionally grouped by another.
///
/// The child is drained on `open`, one `(running, count)` accumulator
/// per group; groups come back out in hash-iteration order. Integer
/// columns support all five operators, string columns only COUNT,
/// which is enforced at construction. AVG divides with integer
/// division when the group is emitted.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    schema: Schema,

    open: bool,
    results: Vec<WrappedTuple>,
    cursor: usize,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self, DbError> {
        let child_schema = child.get_schema();

        if agg_field >= child_schema.fields.len() {
            return Err(DbError::IllegalArgument(format!(
                "aggregate field {} outside of schema {}",
                agg_field, child_schema
            )));
        }
        if let Some(group_field) = group_field {
            if group_field >= child_schema.fields.len() {
                return Err(DbError::IllegalArgument(format!(
                    "grouping field {} outside of schema {}",
                    group_field, child_schema
                )));
            }
        }

        if let Type::Str(_) = child_schema.get_type(agg_field) {
            if op != AggregateOp::Count {
                return Err(DbError::IllegalArgument(format!(
                    "{} is not defined on string columns",
                    op
                )));
            }
        }

        let agg_name = format!(
            "{}({})",
            op, child_schema.fields[agg_field].field_name
        );
        let mut fields = Vec::new();
        if let Some(group_field) = group_field {
            fields.push(child_schema.fields[group_field].clone());
        }
        fields.push(FieldItem::new(&agg_name, Type::Int));
        let schema = Schema::new(fields);

        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            schema,
            open: false,
            results: Vec::new(),
            cursor: 0,
        })
    }

    fn aggregate_child(&mut self) -> DbResult {
        // group key -> (running result, count)
        let mut groups: HashMap<Option<Cell>, (i64, i64)> = HashMap::new();

        while self.child.has_next()? {
            let tuple = self.child.next()?;

            let key = self.group_field.map(|i| tuple.get_cell(i));
            let initial = match self.op {
                AggregateOp::Min => i32::max_value() as i64,
                AggregateOp::Max => i32::min_value() as i64,
                _ => 0,
            };
            let entry = groups.entry(key).or_insert((initial, 0));

            match self.op {
                AggregateOp::Count => {}
                _ => {
                    let value = tuple.get_cell(self.agg_field).get_int()? as i64;
                    match self.op {
                        AggregateOp::Min => entry.0 = entry.0.min(value),
                        AggregateOp::Max => entry.0 = entry.0.max(value),
                        AggregateOp::Sum | AggregateOp::Avg => entry.0 += value,
                        AggregateOp::Count => unreachable!(),
                    }
                }
            }
            entry.1 += 1;
        }

        let op = self.op;
        self.results = groups
            .into_iter()
            .map(|(key, (running, count))| {
                let value = match op {
                    AggregateOp::Min | AggregateOp::Max | AggregateOp::Sum => running,
                    AggregateOp::Avg => running / count,
                    AggregateOp::Count => count,
                };

                let mut cells = Vec::new();
                if let Some(group_cell) = key {
                    cells.push(group_cell);
                }
                cells.push(Cell::Int(value as i32));
                WrappedTuple::new_unplaced(Tuple::new_from_cells(&cells))
            })
            .collect();
        Ok(())
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> DbResult {
        self.child.open()?;
        self.aggregate_child()?;
        self.open = true;
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.child.close()?;
        self.open = false;
        self.results.clear();
        self.cursor = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.open {
            return Err(DbError::IllegalArgument(
                "aggregate is not open".to_string(),
            ));
        }
        Ok(self.cursor < self.results.len())
    }

    fn next(&mut self) -> Result<WrappedTuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement);
        }

        let tuple = self.results[self.cursor].clone();
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
    use crate::execution::tuple_iterator::TupleIterator;
    use crate::storage::schema::{small_int_schema, STRING_FIELD_LEN};

    fn grouped_input() -> TupleIterator {
        let schema = small_int_schema(2, "");
        let rows = vec![(1, 10), (1, 30), (2, 5), (2, 7), (3, 100)];
        let tuples = rows
            .into_iter()
            .map(|(g, v)| {
                WrappedTuple::new_unplaced(Tuple::new_from_cells(&[
                    Cell::Int(g),
                    Cell::Int(v),
                ]))
            })
            .collect();
        TupleIterator::new(&schema, tuples)
    }

    fn drain(agg: &mut Aggregate) -> HashMap<i32, i32> {
        let mut out = HashMap::new();
        while agg.has_next().unwrap() {
            let t = agg.next().unwrap();
            out.insert(
                t.get_cell(0).get_int().unwrap(),
                t.get_cell(1).get_int().unwrap(),
            );
        }
        out
    }

    #[test]
    fn test_grouped_sum_and_avg() {
        let mut agg = Aggregate::new(
            Box::new(grouped_input()),
            1,
            Some(0),
            AggregateOp::Sum,
        )
        .unwrap();
        agg.open().unwrap();
        let sums = drain(&mut agg);
        assert_eq!(sums[&1], 40);
        assert_eq!(sums[&2], 12);
        assert_eq!(sums[&3], 100);

        let mut agg = Aggregate::new(
            Box::new(grouped_input()),
            1,
            Some(0),
            AggregateOp::Avg,
        )
        .unwrap();
        agg.open().unwrap();
        let avgs = drain(&mut agg);
        assert_eq!(avgs[&1], 20);
        // integer division
        assert_eq!(avgs[&2], 6);
    }

    #[test]
    fn test_min_max_count() {
        for (op, expected) in &[
            (AggregateOp::Min, 5),
            (AggregateOp::Max, 100),
            (AggregateOp::Count, 5),
        ] {
            let mut agg =
                Aggregate::new(Box::new(grouped_input()), 1, None, *op).unwrap();
            agg.open().unwrap();

            assert!(agg.has_next().unwrap());
            let t = agg.next().unwrap();
            assert_eq!(agg.get_schema().fields.len(), 1);
            assert_eq!(t.get_cell(0).get_int().unwrap(), *expected);
            assert!(!agg.has_next().unwrap());
        }
    }

    #[test]
    fn test_string_column_only_counts() {
        let schema = Schema::new(vec![
            FieldItem::new("name", Type::Str(STRING_FIELD_LEN)),
        ]);
        let tuples = vec![
            WrappedTuple::new_unplaced(Tuple::new_from_cells(&[Cell::String(
                "a".to_string(),
            )])),
            WrappedTuple::new_unplaced(Tuple::new_from_cells(&[Cell::String(
                "b".to_string(),
            )])),
        ];

        let child = TupleIterator::new(&schema, tuples.clone());
        assert!(Aggregate::new(Box::new(child), 0, None, AggregateOp::Sum).is_err());

        let child = TupleIterator::new(&schema, tuples);
        let mut agg =
            Aggregate::new(Box::new(child), 0, None, AggregateOp::Count).unwrap();
        agg.open().unwrap();
        assert_eq!(agg.next().unwrap().get_cell(0).get_int().unwrap(), 2);
    }
}
