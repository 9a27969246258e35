use std::fmt;

use crate::storage::tuple::{Cell, Tuple};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Equals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    Like,
    NotEquals,
}

impl Op {
    pub fn apply(&self, lhs: &Cell, rhs: &Cell) -> bool {
        match self {
            Op::Equals => lhs == rhs,
            Op::GreaterThan => lhs > rhs,
            Op::GreaterThanOrEq => lhs >= rhs,
            Op::LessThan => lhs < rhs,
            Op::LessThanOrEq => lhs <= rhs,
            // cells carry no patterns, LIKE collapses to equality
            Op::Like => lhs == rhs,
            Op::NotEquals => lhs != rhs,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Op::Equals => "=",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::Like => "LIKE",
            Op::NotEquals => "<>",
        };
        write!(f, "{}", repr)
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Clone)]
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub cell: Cell,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, cell: &Cell) -> Self {
        Self {
            field_index,
            op,
            cell: cell.clone(),
        }
    }

    pub fn matches(&self, tuple: &Tuple) -> bool {
        self.op.apply(&tuple.get_cell(self.field_index), &self.cell)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "field[{}] {} {:?}",
            self.field_index, self.op, self.cell
        )
    }
}

/// Compares a field of the left tuple against a field of the right
/// tuple.
#[derive(Clone, Copy)]
pub struct JoinPredicate {
    pub field1: usize,
    pub op: Op,
    pub field2: usize,
}

impl JoinPredicate {
    pub fn new(field1: usize, op: Op, field2: usize) -> Self {
        Self { field1, op, field2 }
    }

    pub fn matches(&self, left: &Tuple, right: &Tuple) -> bool {
        self.op
            .apply(&left.get_cell(self.field1), &right.get_cell(self.field2))
    }
}
