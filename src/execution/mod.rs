mod aggregate;
mod delete;
mod filter;
mod insert;
mod join;
mod op_iterator;
mod predicate;
mod seq_scan;
mod tuple_iterator;

pub use aggregate::{Aggregate, AggregateOp};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use op_iterator::OpIterator;
pub use predicate::{JoinPredicate, Op, Predicate};
pub use seq_scan::SeqScan;
pub use tuple_iterator::TupleIterator;
